// Configuration loader
// Loads settings from <data_dir>/config.toml, falling back to defaults.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::DATA_DIR_NAME;
use super::settings::Settings;

/// Resolve the data directory: explicit override, else `~/.aeon`.
pub fn resolve_data_dir(override_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return Ok(dir);
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(DATA_DIR_NAME))
}

/// Load settings from `config.toml` in the data dir.
///
/// A missing file yields defaults (first-run behaviour); a present but
/// invalid file is an error — silently ignoring a broken config would hide
/// quota misconfiguration.
pub fn load_settings(data_dir: &Path) -> Result<Settings> {
    let path = data_dir.join("config.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let settings: Settings = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;

    settings
        .autonomy
        .validate()
        .context("Configuration validation failed")?;

    Ok(settings)
}

/// Write settings back out (used by first-run setup and tests).
pub fn save_settings(data_dir: &Path, settings: &Settings) -> Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data dir: {}", data_dir.display()))?;
    let path = data_dir.join("config.toml");
    let toml_string = toml::to_string_pretty(settings).context("Failed to serialize config")?;
    fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.autonomy.daily_budget, 10);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.autonomy.daily_budget = 3;
        settings.autonomy.topic = "NAD+ precursors".to_string();

        save_settings(dir.path(), &settings).unwrap();
        let loaded = load_settings(dir.path()).unwrap();
        assert_eq!(loaded.autonomy.daily_budget, 3);
        assert_eq!(loaded.autonomy.topic, "NAD+ precursors");
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[autonomy]\ndaily_budget = 0\n",
        )
        .unwrap();
        let err = load_settings(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("daily_budget"));
    }

    #[test]
    fn test_unparseable_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "not toml {{").unwrap();
        assert!(load_settings(dir.path()).is_err());
    }

    #[test]
    fn test_resolve_data_dir_override_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/aeon-test"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/aeon-test"));
    }
}
