use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no home directory is configured.
pub const HOME_ENV: &str = "HEARTH_HOME";

pub const DEFAULT_HOME: &str = "solr";
pub const DEFAULT_SCHEMA_LOCATION: &str = "schema.xml";
pub const DEFAULT_CONFIG_LOCATION: &str = "solrconfig.xml";
pub const DEFAULT_LIBRARY: &str = "mock";

fn default_schema_location() -> String {
    DEFAULT_SCHEMA_LOCATION.to_owned()
}

fn default_config_location() -> String {
    DEFAULT_CONFIG_LOCATION.to_owned()
}

fn default_library() -> String {
    DEFAULT_LIBRARY.to_owned()
}

/// Startup settings for an embedded engine.
///
/// ```toml
/// schema_location = "https://config.example.org/schema.xml"
/// config_location = "/etc/hearth/solrconfig.xml"
/// home = "/var/lib/hearth/solr"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    #[serde(default = "default_schema_location")]
    pub schema_location: String,
    #[serde(default = "default_config_location")]
    pub config_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,
    #[serde(default = "default_library")]
    pub library: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            schema_location: default_schema_location(),
            config_location: default_config_location(),
            home: None,
            library: default_library(),
        }
    }
}

impl EngineSettings {
    pub fn parse(content: &str) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::Settings(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Settings(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| CoreError::Settings(format!("{}: {e}", path.display())))
    }

    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Configured home, else `$HEARTH_HOME`, else `./solr`.
    pub fn resolve_home(&self) -> PathBuf {
        self.resolve_home_from(std::env::var_os(HOME_ENV).map(PathBuf::from))
    }

    fn resolve_home_from(&self, env_home: Option<PathBuf>) -> PathBuf {
        self.home
            .clone()
            .or(env_home.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_use_defaults() {
        let settings = EngineSettings::parse("").unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.schema_location, "schema.xml");
        assert_eq!(settings.config_location, "solrconfig.xml");
        assert_eq!(settings.library, "mock");
        assert!(settings.home.is_none());
    }

    #[test]
    fn parses_all_fields() {
        let settings = EngineSettings::parse(
            r#"
schema_location = "http://config.local/schema.xml"
config_location = "/etc/hearth/solrconfig.xml"
home = "/var/lib/hearth/solr"
library = "mock"
"#,
        )
        .unwrap();
        assert_eq!(settings.schema_location, "http://config.local/schema.xml");
        assert_eq!(settings.config_location, "/etc/hearth/solrconfig.xml");
        assert_eq!(settings.home, Some(PathBuf::from("/var/lib/hearth/solr")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineSettings::parse("schema = \"x.xml\"").unwrap_err();
        assert!(matches!(err, CoreError::Settings(_)));
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.toml");
        std::fs::write(&path, "home = 42").unwrap();
        let err = EngineSettings::load(&path).unwrap_err();
        assert!(err.to_string().contains("hearth.toml"));
    }

    #[test]
    fn home_resolution_order() {
        let settings = EngineSettings::default();
        assert_eq!(settings.resolve_home_from(None), PathBuf::from("solr"));
        assert_eq!(
            settings.resolve_home_from(Some(PathBuf::from("/env/solr"))),
            PathBuf::from("/env/solr")
        );
        assert_eq!(
            settings.resolve_home_from(Some(PathBuf::new())),
            PathBuf::from("solr")
        );

        let explicit = settings.with_home("/explicit");
        assert_eq!(
            explicit.resolve_home_from(Some(PathBuf::from("/env/solr"))),
            PathBuf::from("/explicit")
        );
    }
}
