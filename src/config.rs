//! Profile configuration.
//!
//! ```toml
//! default_instance = "prod"
//!
//! [instances.prod]
//! default_database = "orders"
//!
//! [instances.prod.databases]
//! orders = ["invoices", "customers"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::session::{Catalog, Session};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "mongocell.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Instance used when none is given
    #[serde(default = "default_instance")]
    pub default_instance: String,

    #[serde(default)]
    pub instances: BTreeMap<String, InstanceConfig>,
}

/// One named connection profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceConfig {
    /// Database `db` refers to before any `use`
    pub default_database: Option<String>,

    /// Known databases and their collections
    #[serde(default)]
    pub databases: Catalog,
}

fn default_instance() -> String {
    "default".to_string()
}

impl Config {
    /// Parse configuration from toml text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read configuration from a file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from an explicit path, or the first of `./mongocell.toml` and
    /// the user config dir that exists. No file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                Self::from_path(&path)
            }
            None => Ok(Self {
                default_instance: default_instance(),
                ..Self::default()
            }),
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("mongocell").join("config.toml"));
        }
        paths
    }

    /// Build a session for an instance, falling back to `default_instance`.
    ///
    /// An instance with no profile entry is only accepted when no profiles
    /// are configured at all.
    pub fn session(&self, instance: Option<&str>) -> Result<Session, ConfigError> {
        let name = instance.unwrap_or(&self.default_instance);
        let profile = match self.instances.get(name) {
            Some(profile) => profile.clone(),
            None if self.instances.is_empty() => InstanceConfig::default(),
            None => return Err(ConfigError::UnknownInstance(name.to_string())),
        };

        Ok(Session::new(name)
            .with_catalog(profile.databases)
            .with_default_database(profile.default_database.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        default_instance = "prod"

        [instances.prod]
        default_database = "orders"

        [instances.prod.databases]
        orders = ["invoices", "customers"]
        local = []

        [instances.dev]
    "#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.default_instance, "prod");
        assert_eq!(config.instances.len(), 2);
        assert_eq!(
            config.instances["prod"].databases["orders"],
            vec!["invoices", "customers"]
        );
    }

    #[test]
    fn test_session_for_default_instance() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let session = config.session(None).unwrap();
        assert_eq!(session.instance(), "prod");
        assert_eq!(session.current_database(), Some("orders"));
    }

    #[test]
    fn test_session_without_catalog() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let session = config.session(Some("dev")).unwrap();
        assert_eq!(session.current_database(), None);
    }

    #[test]
    fn test_unknown_instance() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let err = config.session(Some("staging")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownInstance(name) if name == "staging"));
    }

    #[test]
    fn test_empty_config_accepts_any_instance() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.default_instance, "default");
        assert_eq!(config.session(Some("adhoc")).unwrap().instance(), "adhoc");
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.default_instance, "prod");
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("instances = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
