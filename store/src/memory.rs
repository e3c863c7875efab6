use std::sync::Arc;

use dashmap::DashMap;
use splice_model::{Definition, DefinitionRecord};

use crate::{Error, ModelStore};

/// In-process store.
///
/// Cheap to clone; clones share the same records.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Vec<DefinitionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record next to any already stored for its identity.
    pub fn put(&self, record: DefinitionRecord) {
        self.inner
            .entry(record.identity.clone())
            .or_default()
            .push(record);
    }

    pub fn records(&self, identity: &str) -> Vec<DefinitionRecord> {
        self.inner
            .get(identity)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.inner.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ModelStore for MemoryStore {
    fn lookup(&self, identity: &str) -> Result<Vec<Definition>, Error> {
        self.records(identity)
            .into_iter()
            .map(|record| {
                Definition::from_record(record, format!("memory:{identity}")).map_err(Error::from)
            })
            .collect()
    }

    fn store(&self, definition: &Definition) -> Result<(), Error> {
        let record = definition.to_record();
        self.inner.insert(record.identity.clone(), vec![record]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use splice_model::Instance;

    use super::*;

    fn analyzed(identity: &str) -> Definition {
        let mut definition = Definition::new(identity, format!("{identity}.json5"), false);
        definition
            .add_instance(
                Instance::builder()
                    .name("x")
                    .declared_type("T")
                    .owner(identity)
                    .location(format!("{identity}.x"))
                    .live(true)
                    .build(),
            )
            .unwrap();
        definition.lock_analyzed();
        definition
    }

    #[test]
    fn lookup_returns_stored_definitions() {
        let store = MemoryStore::new();
        assert!(store.lookup("a").unwrap().is_empty());

        let definition = analyzed("a");
        store.store(&definition).unwrap();
        store.store(&definition).unwrap();

        let loaded = store.lookup("a").unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].is_analyzed());
        assert_eq!(loaded[0].location(), "memory:a");
        assert!(!loaded[0].instances()[0].live);
        assert_eq!(loaded[0].content_hash(), definition.content_hash());
    }

    #[test]
    fn put_keeps_every_record() {
        let store = MemoryStore::new();
        store.put(analyzed("a").to_record());
        store.put(analyzed("a").to_record());
        assert_eq!(store.lookup("a").unwrap().len(), 2);
        assert_eq!(store.len(), 1);
    }
}
