use crate::{ConfigRecord, ConfigStore, ConfigStoreError, Filter, Lookup, Properties};
use tracing::{debug, info};

/// Factory PID under which logging configurations are created.
pub const LOG_FACTORY_PID: &str = "org.apache.sling.commons.log.LogManager.factory.config";

/// Sentinel property identifying the engine's logging configuration.
pub const MARKER_KEY: &str = "hearth.logger";
pub const MARKER_VALUE: &str = "org.apache.solr";

pub const LEVEL_KEY: &str = "org.apache.sling.commons.log.level";
pub const FILE_KEY: &str = "org.apache.sling.commons.log.file";
pub const NAMES_KEY: &str = "org.apache.sling.commons.log.names";

pub const DEFAULT_LEVEL: &str = "INFO";
pub const DEFAULT_FILE: &str = "logs/solr.log";
/// Logger namespace of the embedded engine.
pub const ENGINE_LOG_NAMESPACE: &str = "org.apache.solr";

/// The engine's logging configuration record, and whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingConfig {
    Existing(ConfigRecord),
    Created(ConfigRecord),
}

impl LoggingConfig {
    pub fn record(&self) -> &ConfigRecord {
        match self {
            LoggingConfig::Existing(r) | LoggingConfig::Created(r) => r,
        }
    }

    pub fn into_record(self) -> ConfigRecord {
        match self {
            LoggingConfig::Existing(r) | LoggingConfig::Created(r) => r,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, LoggingConfig::Created(_))
    }

    pub fn level(&self) -> Option<&str> {
        self.record().property(LEVEL_KEY)
    }

    pub fn file(&self) -> Option<&str> {
        self.record().property(FILE_KEY)
    }
}

/// The property set written into a newly created logging configuration.
pub fn default_properties() -> Properties {
    [
        (LEVEL_KEY, DEFAULT_LEVEL),
        (FILE_KEY, DEFAULT_FILE),
        (NAMES_KEY, ENGINE_LOG_NAMESPACE),
        (MARKER_KEY, MARKER_VALUE),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

/// Ensures the engine's logging configuration exists in a config store.
///
/// The configuration is created once with fixed defaults. After that it
/// belongs to the operator: an existing record is returned unchanged, so edits
/// made to it persist across restarts.
pub struct LoggingConfigRegistrar<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> LoggingConfigRegistrar<'a> {
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self { store }
    }

    /// Returns the marked record, creating it if the store holds none.
    ///
    /// Lookup and creation are one [`ConfigStore::find_or_create`] call, so
    /// concurrent registrations against a locking store yield one record.
    pub fn ensure_logging_config(&self) -> Result<LoggingConfig, ConfigStoreError> {
        let filter = Filter::equal(MARKER_KEY, MARKER_VALUE).to_string();
        let lookup = match self
            .store
            .find_or_create(&filter, LOG_FACTORY_PID, default_properties())
        {
            Ok(lookup) => lookup,
            // A store that cannot evaluate the filter holds no match for it.
            Err(ConfigStoreError::MalformedFilter { filter, reason }) => {
                debug!("config store rejected filter {filter}: {reason}");
                Lookup::Created(
                    self.store
                        .create_factory(LOG_FACTORY_PID, default_properties())?,
                )
            }
            Err(e) => return Err(e),
        };

        match lookup {
            Lookup::Found(existing) => {
                debug!("using existing logging configuration {}", existing.pid);
                Ok(LoggingConfig::Existing(existing))
            }
            Lookup::Created(record) => {
                info!(
                    "created logging configuration {} ({DEFAULT_LEVEL} -> {DEFAULT_FILE})",
                    record.pid
                );
                Ok(LoggingConfig::Created(record))
            }
        }
    }
}
