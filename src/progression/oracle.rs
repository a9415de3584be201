// Stage oracle — external generative authority for new stage definitions
//
// When the ledger reaches the last known stage (the frontier), the engine
// asks the oracle for the next one. The gateway here is transport only:
// single-flight serialization is enforced by the engine's guard, and the
// content contract (thresholds strictly above the requesting state's vectors
// on the axes that carried the advancement) is on the external call itself.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::ledger::{ProgressionState, StageDefinition};

/// Context shipped with a next-stage request.
///
/// Carries a snapshot of the progression state plus caller-supplied context —
/// the oracle never reads live state.
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub snapshot: ProgressionState,
    /// Names of all known stages, in sequence order
    pub known_stages: Vec<String>,
    /// Workspace context: what the companion is researching
    pub topic: String,
    /// Trajectory context: where the ledger has been heading
    pub trajectory: String,
}

/// The `RequestNextStage` collaborator contract.
///
/// Implementations are expected to fail cleanly; this subsystem reports
/// failures as notifications and never retries transparently.
#[async_trait]
pub trait StageOracle: Send + Sync {
    async fn request_next_stage(&self, request: &StageRequest) -> Result<StageDefinition>;
}

/// Thin wrapper around the oracle that logs the request/response boundary.
#[derive(Clone)]
pub struct StageOracleGateway {
    oracle: Arc<dyn StageOracle>,
}

impl StageOracleGateway {
    pub fn new(oracle: Arc<dyn StageOracle>) -> Self {
        Self { oracle }
    }

    /// Forward one request to the oracle. At most one call is outstanding
    /// at any time — the caller's single-flight guard enforces that, not us.
    pub async fn request_next_stage(&self, request: &StageRequest) -> Result<StageDefinition> {
        info!(
            topic = %request.topic,
            known_stages = request.known_stages.len(),
            "Requesting next stage definition from oracle"
        );
        match self.oracle.request_next_stage(request).await {
            Ok(stage) => {
                info!(stage = %stage.name, "Oracle returned a new stage definition");
                Ok(stage)
            }
            Err(e) => {
                warn!("Oracle request failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::ledger::Vectors;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOracle {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StageOracle for CountingOracle {
        async fn request_next_stage(&self, _request: &StageRequest) -> Result<StageDefinition> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StageDefinition {
                name: "Enhanced Human".to_string(),
                description: "test".to_string(),
                criteria: vec![],
                thresholds: Vectors::default(),
            })
        }
    }

    fn request() -> StageRequest {
        StageRequest {
            snapshot: ProgressionState::default(),
            known_stages: vec!["Baseline Human".to_string()],
            topic: "longevity".to_string(),
            trajectory: String::new(),
        }
    }

    #[tokio::test]
    async fn test_gateway_forwards_to_oracle() {
        let oracle = Arc::new(CountingOracle {
            calls: AtomicUsize::new(0),
        });
        let gateway = StageOracleGateway::new(oracle.clone());

        let stage = gateway.request_next_stage(&request()).await.unwrap();
        assert_eq!(stage.name, "Enhanced Human");
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gateway_propagates_errors() {
        struct FailingOracle;

        #[async_trait]
        impl StageOracle for FailingOracle {
            async fn request_next_stage(
                &self,
                _request: &StageRequest,
            ) -> Result<StageDefinition> {
                anyhow::bail!("model overloaded")
            }
        }

        let gateway = StageOracleGateway::new(Arc::new(FailingOracle));
        let err = gateway.request_next_stage(&request()).await.unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }
}
