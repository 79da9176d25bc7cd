use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use mealplanner_core::db::ConnectionSettings;

const SETTINGS_FILE: &str = "database.json";

pub struct Config {
    pub data_dir: PathBuf,
    pub database: ConnectionSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("", "", "mealplanner")
            .context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Self::load_from(&data_dir)
    }

    /// Read `database.json` from `data_dir` when present; otherwise use a
    /// database file inside `data_dir`.
    pub fn load_from(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        let mut database = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<ConnectionSettings>(&raw)
                .with_context(|| format!("Invalid database settings in {}", path.display()))?
        } else {
            ConnectionSettings::default()
        };
        if database.url.trim().is_empty() {
            database.url = data_dir.join("mealplanner.db").display().to_string();
        }

        Ok(Config {
            data_dir: data_dir.to_path_buf(),
            database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_database_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(
            config.database.path(),
            Some(dir.path().join("mealplanner.db"))
        );
        assert!(config.database.username.is_none());
    }

    #[test]
    fn test_reads_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"url": "sqlite:///srv/plans.db", "username": "planner", "password": "secret"}"#,
        )
        .unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.database.path(), Some(PathBuf::from("/srv/plans.db")));
        assert_eq!(config.database.username.as_deref(), Some("planner"));
        assert_eq!(config.database.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_blank_url_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{"url": ""}"#).unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(
            config.database.path(),
            Some(dir.path().join("mealplanner.db"))
        );
    }

    #[test]
    fn test_malformed_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "not json").unwrap();
        let err = Config::load_from(dir.path()).err().unwrap();
        assert!(err.to_string().contains("Invalid database settings"));
    }
}
