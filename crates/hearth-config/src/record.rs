use crate::ConfigStoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub type Properties = BTreeMap<String, String>;

/// Implicit property exposing a record's PID to filters.
pub const PID_PROPERTY: &str = "service.pid";
/// Implicit property exposing a record's factory PID to filters.
pub const FACTORY_PID_PROPERTY: &str = "service.factoryPid";

static PID_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigRecord {
    pub pid: String,
    #[serde(default)]
    pub factory_pid: Option<String>,
    #[serde(default)]
    pub properties: Properties,
    pub created_at: String,
    pub updated_at: String,
    /// blake3 checksum over the record without this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ConfigRecord {
    /// A new, property-less record with a generated PID under `factory_pid`.
    pub fn new_factory(factory_pid: &str) -> Self {
        let now = now_rfc3339();
        Self {
            pid: generate_pid(factory_pid),
            factory_pid: Some(factory_pid.to_owned()),
            properties: Properties::new(),
            created_at: now.clone(),
            updated_at: now,
            checksum: None,
        }
    }

    /// Property lookup, including the implicit `service.pid` and
    /// `service.factoryPid` keys.
    pub fn property(&self, key: &str) -> Option<&str> {
        match key {
            PID_PROPERTY => Some(&self.pid),
            FACTORY_PID_PROPERTY => self.factory_pid.as_deref(),
            _ => self.properties.get(key).map(String::as_str),
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }

    pub(crate) fn compute_checksum(&self) -> Result<String, ConfigStoreError> {
        let mut copy = self.clone();
        copy.checksum = None;
        let json = serde_json::to_string_pretty(&copy)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Oldest first; PID breaks ties so the order is total.
pub(crate) fn sort_records(records: &mut [ConfigRecord]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.pid.cmp(&b.pid))
    });
}

pub fn validate_pid(pid: &str) -> Result<(), ConfigStoreError> {
    if pid.is_empty() || pid.len() > 255 {
        return Err(ConfigStoreError::InvalidPid(
            "PID must be 1-255 characters".to_owned(),
        ));
    }
    if pid.starts_with('.') {
        return Err(ConfigStoreError::InvalidPid(format!(
            "PID must not start with '.': {pid}"
        )));
    }
    if !pid
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(ConfigStoreError::InvalidPid(format!(
            "PID must match [a-zA-Z0-9._-]: {pid}"
        )));
    }
    Ok(())
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

fn generate_pid(factory_pid: &str) -> String {
    let seq = PID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let seed = format!(
        "{factory_pid}:{}:{}:{seq}",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    let hash = blake3::hash(seed.as_bytes()).to_hex();
    format!("{factory_pid}.{}", &hash.as_str()[..16])
}
