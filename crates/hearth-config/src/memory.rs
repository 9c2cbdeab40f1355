use crate::record::sort_records;
use crate::{
    validate_pid, ConfigRecord, ConfigStore, ConfigStoreError, Filter, Lookup, Properties,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-process config store. Contents are lost when the store is dropped.
#[derive(Default)]
pub struct MemoryConfigStore {
    records: Mutex<HashMap<String, ConfigRecord>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, ConfigRecord>>, ConfigStoreError> {
        self.records
            .lock()
            .map_err(|e| ConfigStoreError::Poisoned(e.to_string()))
    }
}

fn matching(records: &HashMap<String, ConfigRecord>, filter: &Filter) -> Vec<ConfigRecord> {
    let mut matched: Vec<ConfigRecord> = records
        .values()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();
    sort_records(&mut matched);
    matched
}

fn new_record(factory_pid: &str, properties: Properties) -> Result<ConfigRecord, ConfigStoreError> {
    validate_pid(factory_pid)?;
    let mut record = ConfigRecord::new_factory(factory_pid);
    record.properties = properties;
    Ok(record)
}

impl ConfigStore for MemoryConfigStore {
    fn list(&self, filter: &str) -> Result<Vec<ConfigRecord>, ConfigStoreError> {
        let filter = Filter::parse(filter)?;
        Ok(matching(&*self.lock()?, &filter))
    }

    fn create_factory(
        &self,
        factory_pid: &str,
        properties: Properties,
    ) -> Result<ConfigRecord, ConfigStoreError> {
        let record = new_record(factory_pid, properties)?;
        self.lock()?.insert(record.pid.clone(), record.clone());
        Ok(record)
    }

    fn find_or_create(
        &self,
        filter: &str,
        factory_pid: &str,
        properties: Properties,
    ) -> Result<Lookup, ConfigStoreError> {
        let filter = Filter::parse(filter)?;
        let mut records = self.lock()?;
        if let Some(existing) = matching(&records, &filter).into_iter().next() {
            return Ok(Lookup::Found(existing));
        }
        let record = new_record(factory_pid, properties)?;
        records.insert(record.pid.clone(), record.clone());
        Ok(Lookup::Created(record))
    }

    fn update(&self, pid: &str, properties: Properties) -> Result<ConfigRecord, ConfigStoreError> {
        let mut records = self.lock()?;
        let record = records
            .get_mut(pid)
            .ok_or_else(|| ConfigStoreError::NotFound(pid.to_owned()))?;
        record.properties = properties;
        record.touch();
        Ok(record.clone())
    }

    fn get(&self, pid: &str) -> Result<ConfigRecord, ConfigStoreError> {
        self.lock()?
            .get(pid)
            .cloned()
            .ok_or_else(|| ConfigStoreError::NotFound(pid.to_owned()))
    }

    fn delete(&self, pid: &str) -> Result<(), ConfigStoreError> {
        self.lock()?.remove(pid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_update_and_list() {
        let store = MemoryConfigStore::new();
        let record = store.create_factory("log.factory", Properties::new()).unwrap();
        assert!(record.properties.is_empty());

        let mut props = Properties::new();
        props.insert("log.level".to_owned(), "WARN".to_owned());
        let updated = store.update(&record.pid, props).unwrap();
        assert_eq!(updated.property("log.level"), Some("WARN"));

        let found = store.list("(log.level=WARN)").unwrap();
        assert_eq!(found, vec![updated]);
        assert!(store.list("(log.level=INFO)").unwrap().is_empty());
    }

    #[test]
    fn list_rejects_malformed_filter() {
        let store = MemoryConfigStore::new();
        let err = store.list("(log.level=WARN").unwrap_err();
        assert!(matches!(err, ConfigStoreError::MalformedFilter { .. }));
    }

    #[test]
    fn update_unknown_pid_fails() {
        let store = MemoryConfigStore::new();
        let err = store.update("nope", Properties::new()).unwrap_err();
        assert!(matches!(err, ConfigStoreError::NotFound(p) if p == "nope"));
    }

    #[test]
    fn delete_removes_record() {
        let store = MemoryConfigStore::new();
        let record = store.create_factory("log.factory", Properties::new()).unwrap();
        assert_eq!(store.len(), 1);
        store.delete(&record.pid).unwrap();
        assert!(store.is_empty());
        assert!(store.get(&record.pid).is_err());
    }

    #[test]
    fn create_writes_properties_in_one_step() {
        let store = MemoryConfigStore::new();
        let mut props = Properties::new();
        props.insert("kind".to_owned(), "x".to_owned());
        let record = store.create_factory("log.factory", props).unwrap();
        assert_eq!(store.get(&record.pid).unwrap().property("kind"), Some("x"));
    }

    #[test]
    fn concurrent_find_or_create_makes_one_record() {
        use std::sync::{Arc, Barrier};

        let store = Arc::new(MemoryConfigStore::new());
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let mut props = Properties::new();
                    props.insert("kind".to_owned(), "x".to_owned());
                    barrier.wait();
                    store
                        .find_or_create("(kind=x)", "log.factory", props)
                        .unwrap()
                })
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|l| matches!(l, Lookup::Created(_)))
            .count();
        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }
}
