// Configuration module

pub mod constants;
pub mod loader;
pub mod settings;

pub use loader::{load_settings, resolve_data_dir, save_settings};
pub use settings::{AutonomyConfig, Settings};
