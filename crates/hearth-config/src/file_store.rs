use crate::record::sort_records;
use crate::{
    validate_pid, ConfigRecord, ConfigStore, ConfigStoreError, Filter, Lookup, Properties,
    StoreLock,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

const RECORD_EXT: &str = "json";

/// Fsync a directory so a preceding rename into it is durable.
fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = fs::File::open(dir)?;
    f.sync_all()
}

/// Config store backed by one JSON file per record under `<root>/configs/`.
///
/// Writes go through a temp file and an atomic rename. Each record carries a
/// blake3 checksum that is verified on read. `find_or_create` runs under an
/// exclusive lock on `<root>/.lock`, shared by every handle on the same root.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    root: PathBuf,
}

impl FileConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn configs_dir(&self) -> PathBuf {
        self.root.join("configs")
    }

    #[inline]
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    fn record_path(&self, pid: &str) -> PathBuf {
        self.configs_dir().join(format!("{pid}.{RECORD_EXT}"))
    }

    fn put(&self, record: &ConfigRecord) -> Result<(), ConfigStoreError> {
        validate_pid(&record.pid)?;
        let dir = self.configs_dir();
        fs::create_dir_all(&dir)?;

        let mut with_checksum = record.clone();
        with_checksum.checksum = Some(record.compute_checksum()?);
        let content = serde_json::to_string_pretty(&with_checksum)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.record_path(&record.pid))
            .map_err(|e| ConfigStoreError::Io(e.error))?;
        fsync_dir(&dir)?;
        Ok(())
    }

    /// Reads a record. The returned record has no checksum set.
    ///
    /// With `strict`, a checksum mismatch is an error; otherwise it is logged
    /// and the on-disk content is returned as-is.
    fn read(&self, pid: &str, strict: bool) -> Result<ConfigRecord, ConfigStoreError> {
        validate_pid(pid)?;
        let path = self.record_path(pid);
        if !path.exists() {
            return Err(ConfigStoreError::NotFound(pid.to_owned()));
        }
        let content = fs::read_to_string(&path)?;
        let mut record: ConfigRecord = serde_json::from_str(&content)?;

        // Records written by hand may omit the checksum.
        if let Some(expected) = record.checksum.take() {
            let actual = record.compute_checksum()?;
            if actual != expected {
                if strict {
                    return Err(ConfigStoreError::IntegrityFailure {
                        pid: pid.to_owned(),
                        expected,
                        actual,
                    });
                }
                warn!("configuration '{pid}' was modified outside the store");
            }
        }
        Ok(record)
    }

    fn all(&self) -> Result<Vec<ConfigRecord>, ConfigStoreError> {
        let dir = self.configs_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(pid) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if pid.starts_with('.') {
                continue;
            }
            match self.read(pid, false) {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping unreadable configuration '{pid}': {e}"),
            }
        }
        Ok(records)
    }

    fn matching(&self, filter: &Filter) -> Result<Vec<ConfigRecord>, ConfigStoreError> {
        let mut matched: Vec<ConfigRecord> = self
            .all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        sort_records(&mut matched);
        Ok(matched)
    }
}

impl ConfigStore for FileConfigStore {
    fn list(&self, filter: &str) -> Result<Vec<ConfigRecord>, ConfigStoreError> {
        self.matching(&Filter::parse(filter)?)
    }

    fn create_factory(
        &self,
        factory_pid: &str,
        properties: Properties,
    ) -> Result<ConfigRecord, ConfigStoreError> {
        validate_pid(factory_pid)?;
        let mut record = ConfigRecord::new_factory(factory_pid);
        record.properties = properties;
        self.put(&record)?;
        Ok(record)
    }

    fn find_or_create(
        &self,
        filter: &str,
        factory_pid: &str,
        properties: Properties,
    ) -> Result<Lookup, ConfigStoreError> {
        let filter = Filter::parse(filter)?;
        let _lock = StoreLock::acquire(&self.lock_path())?;
        if let Some(existing) = self.matching(&filter)?.into_iter().next() {
            return Ok(Lookup::Found(existing));
        }
        Ok(Lookup::Created(self.create_factory(factory_pid, properties)?))
    }

    fn update(&self, pid: &str, properties: Properties) -> Result<ConfigRecord, ConfigStoreError> {
        let mut record = self.read(pid, false)?;
        record.properties = properties;
        record.touch();
        self.put(&record)?;
        Ok(record)
    }

    fn get(&self, pid: &str) -> Result<ConfigRecord, ConfigStoreError> {
        self.read(pid, true)
    }

    fn delete(&self, pid: &str) -> Result<(), ConfigStoreError> {
        validate_pid(pid)?;
        let path = self.record_path(pid);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let pid = {
            let store = FileConfigStore::new(dir.path());
            let record = store.create_factory("log.factory", Properties::new()).unwrap();
            store
                .update(&record.pid, props(&[("log.level", "DEBUG")]))
                .unwrap();
            record.pid
        };

        let reopened = FileConfigStore::new(dir.path());
        let record = reopened.get(&pid).unwrap();
        assert_eq!(record.property("log.level"), Some("DEBUG"));
        assert_eq!(record.factory_pid.as_deref(), Some("log.factory"));
    }

    #[test]
    fn list_filters_and_orders_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        let a = store.create_factory("log.factory", Properties::new()).unwrap();
        let b = store.create_factory("log.factory", Properties::new()).unwrap();
        store.update(&a.pid, props(&[("kind", "x")])).unwrap();
        store.update(&b.pid, props(&[("kind", "x")])).unwrap();
        store.create_factory("other.factory", Properties::new()).unwrap();

        let found = store.list("(kind=x)").unwrap();
        let pids: Vec<_> = found.iter().map(|r| r.pid.as_str()).collect();
        assert_eq!(pids, vec![a.pid.as_str(), b.pid.as_str()]);

        let by_factory = store.list("(service.factoryPid=log.factory)").unwrap();
        assert_eq!(by_factory.len(), 2);
    }

    #[test]
    fn hand_edited_record_fails_get_but_stays_listed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        let record = store.create_factory("log.factory", Properties::new()).unwrap();
        store
            .update(&record.pid, props(&[("log.level", "INFO")]))
            .unwrap();

        let path = store.configs_dir().join(format!("{}.json", record.pid));
        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("INFO", "TRACE")).unwrap();

        let err = store.get(&record.pid).unwrap_err();
        assert!(matches!(err, ConfigStoreError::IntegrityFailure { .. }));

        let listed = store.list("(log.level=*)").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].property("log.level"), Some("TRACE"));
    }

    #[test]
    fn hand_written_record_without_checksum_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        fs::create_dir_all(store.configs_dir()).unwrap();
        fs::write(
            store.configs_dir().join("manual.json"),
            r#"{
  "pid": "manual",
  "properties": { "log.level": "ERROR" },
  "created_at": "2024-01-01T00:00:00Z",
  "updated_at": "2024-01-01T00:00:00Z"
}"#,
        )
        .unwrap();

        let found = store.list("(log.level=ERROR)").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pid, "manual");
    }

    #[test]
    fn stray_and_unparsable_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        fs::create_dir_all(store.configs_dir()).unwrap();
        fs::write(store.configs_dir().join("README"), "notes").unwrap();
        fs::write(store.configs_dir().join(".tmpabc.json"), "{").unwrap();
        fs::write(store.configs_dir().join("broken.json"), "{ not json").unwrap();

        assert!(store.list("(service.pid=*)").unwrap().is_empty());
    }

    #[test]
    fn path_traversal_pid_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        assert!(matches!(
            store.get("../../etc/passwd").unwrap_err(),
            ConfigStoreError::InvalidPid(_)
        ));
        assert!(store.create_factory("bad/factory", Properties::new()).is_err());
    }

    #[test]
    fn create_is_a_single_complete_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        let record = store
            .create_factory("log.factory", props(&[("kind", "x")]))
            .unwrap();

        let on_disk = store.get(&record.pid).unwrap();
        assert_eq!(on_disk.property("kind"), Some("x"));
        assert_eq!(on_disk.created_at, on_disk.updated_at);
    }

    #[test]
    fn find_or_create_returns_existing_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        let first = store
            .find_or_create("(kind=x)", "log.factory", props(&[("kind", "x")]))
            .unwrap();
        let second = store
            .find_or_create("(kind=x)", "log.factory", props(&[("kind", "x")]))
            .unwrap();

        let Lookup::Created(created) = first else {
            panic!("expected a new record");
        };
        assert_eq!(second, Lookup::Found(created));
        assert!(store.lock_path().exists());
        assert!(matches!(
            store.find_or_create("(kind=x", "log.factory", Properties::new()),
            Err(ConfigStoreError::MalformedFilter { .. })
        ));
    }

    #[test]
    fn list_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("never-created"));
        assert!(store.list("(a=b)").unwrap().is_empty());
    }
}
