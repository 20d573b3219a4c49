use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Store file to use instead of the project/global lookup
    pub store: Option<PathBuf>,

    /// Default log filter when COUNTCAL_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: None,
            log_level: "warn".to_string(),
        }
    }
}

/// Get the config file path (~/.config/countcal/config.toml on Linux)
pub fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "countcal").context("locating config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// A missing file is not an error; it means defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "store = \"/tmp/countcal.yml\"\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.store, Some(PathBuf::from("/tmp/countcal.yml")));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_bad_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = [").unwrap();
        assert!(load_config_from(&path).is_err());
    }
}
