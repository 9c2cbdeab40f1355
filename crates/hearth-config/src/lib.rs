//! Configuration store for Hearth.
//!
//! Records are flat string property maps identified by a PID, optionally
//! created from a factory PID. Stores are queried with LDAP-style filters
//! (`(&(log.level=INFO)(hearth.logger=*))`). `FileConfigStore` persists records
//! as checksummed JSON; `MemoryConfigStore` keeps them in process. The
//! `LoggingConfigRegistrar` uses a store to create the engine's logging
//! configuration exactly once.

pub mod file_store;
pub mod filter;
pub mod lock;
pub mod logging;
pub mod memory;
pub mod record;

pub use file_store::FileConfigStore;
pub use filter::Filter;
pub use lock::StoreLock;
pub use logging::{LoggingConfig, LoggingConfigRegistrar};
pub use memory::MemoryConfigStore;
pub use record::{validate_pid, ConfigRecord, Properties};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("config store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed filter '{filter}': {reason}")]
    MalformedFilter { filter: String, reason: String },
    #[error("configuration not found: {0}")]
    NotFound(String),
    #[error("invalid configuration PID: {0}")]
    InvalidPid(String),
    #[error("integrity check failed for configuration '{pid}': expected {expected}, got {actual}")]
    IntegrityFailure {
        pid: String,
        expected: String,
        actual: String,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("config store lock poisoned: {0}")]
    Poisoned(String),
}

/// Outcome of [`ConfigStore::find_or_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(ConfigRecord),
    Created(ConfigRecord),
}

/// A store of configuration records.
pub trait ConfigStore: Send + Sync {
    /// All records matching `filter`, oldest first.
    ///
    /// Returns [`ConfigStoreError::MalformedFilter`] if the filter does not parse.
    fn list(&self, filter: &str) -> Result<Vec<ConfigRecord>, ConfigStoreError>;

    /// Create a record with a fresh PID derived from `factory_pid`, written
    /// together with its properties.
    fn create_factory(
        &self,
        factory_pid: &str,
        properties: Properties,
    ) -> Result<ConfigRecord, ConfigStoreError>;

    /// The oldest record matching `filter`, or a new one created from
    /// `factory_pid` with `properties` if none matches.
    ///
    /// Implementations make the lookup and the creation atomic with respect to
    /// other `find_or_create` calls on the same store. The default does not.
    fn find_or_create(
        &self,
        filter: &str,
        factory_pid: &str,
        properties: Properties,
    ) -> Result<Lookup, ConfigStoreError> {
        if let Some(existing) = self.list(filter)?.into_iter().next() {
            return Ok(Lookup::Found(existing));
        }
        Ok(Lookup::Created(self.create_factory(factory_pid, properties)?))
    }

    /// Replace the properties of an existing record.
    fn update(&self, pid: &str, properties: Properties) -> Result<ConfigRecord, ConfigStoreError>;

    fn get(&self, pid: &str) -> Result<ConfigRecord, ConfigStoreError>;

    fn delete(&self, pid: &str) -> Result<(), ConfigStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_filter_display() {
        let e = ConfigStoreError::MalformedFilter {
            filter: "(a=b".to_owned(),
            reason: "expected ')'".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("(a=b"));
        assert!(msg.contains("expected ')'"));
    }

    #[test]
    fn integrity_failure_display() {
        let e = ConfigStoreError::IntegrityFailure {
            pid: "log.abc".to_owned(),
            expected: "exp".to_owned(),
            actual: "act".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("log.abc"));
        assert!(msg.contains("exp"));
        assert!(msg.contains("act"));
    }
}
