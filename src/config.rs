use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::OpenMode;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AssetDbConfig {
    pub database: Option<String>,
    pub read_only: Option<bool>,
}

impl AssetDbConfig {
    /// The configured database, relative paths resolved against `base`
    pub fn database_path(&self, base: &Path) -> PathBuf {
        match &self.database {
            Some(db) => {
                let path = PathBuf::from(db);
                if path.is_absolute() { path } else { base.join(path) }
            }
            None => default_database_path_in(base),
        }
    }

    pub fn open_mode(&self) -> OpenMode {
        match self.read_only {
            Some(false) => OpenMode::ReadWrite,
            _ => OpenMode::ReadOnly,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("assetdb.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join("Cache").join("assetdb.sqlite")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<AssetDbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AssetDbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &AssetDbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> crate::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assetdb.toml");
        let config = AssetDbConfig {
            database: Some("Cache/custom.sqlite".into()),
            read_only: Some(false),
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(path.as_path())).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.open_mode(), OpenMode::ReadWrite);
        assert_eq!(loaded.database_path(dir.path()), dir.path().join("Cache/custom.sqlite"));
    }

    #[test]
    fn test_missing_config_and_defaults() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(Some(dir.path().join("nope.toml").as_path())).unwrap().is_none());

        let config = AssetDbConfig::default();
        assert_eq!(config.open_mode(), OpenMode::ReadOnly);
        assert_eq!(config.database_path(dir.path()), dir.path().join("Cache").join("assetdb.sqlite"));
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("a").join("b").join("assetdb.sqlite");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
        ensure_db_dir(Path::new("assetdb.sqlite")).unwrap();
    }
}
