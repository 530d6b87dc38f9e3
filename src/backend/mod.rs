use crate::BulkString;
use dashmap::DashMap;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

// Shared, process-lifetime state behind every command.
// Cloning a Backend clones the Arc, all clones see the same tables.
#[derive(Debug, Clone)]
pub struct Backend(Arc<BackendInner>);

// DashMap shards each table behind reader-writer locks: readers of a shard run
// side by side, a writer holds it alone. A whole hash lives under one outer
// entry, so HSET and HGETALL on the same hash never interleave.
#[derive(Debug, Default)]
pub struct BackendInner {
    pub(crate) map: DashMap<String, BulkString>,
    pub(crate) hmap: DashMap<String, HashMap<String, BulkString>>,
}

impl Deref for Backend {
    type Target = BackendInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self(Arc::new(BackendInner::default()))
    }
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<BulkString> {
        self.map.get(key).map(|v| v.value().clone())
    }

    pub fn set(&self, key: String, value: BulkString) {
        self.map.insert(key, value);
    }

    pub fn hget(&self, key: &str, field: &str) -> Option<BulkString> {
        self.hmap.get(key).and_then(|v| v.get(field).cloned())
    }

    // The hash is created on first use; the outer entry stays write-locked
    // until the field is in place.
    pub fn hset(&self, key: String, field: String, value: BulkString) {
        let mut hmap_entry = self.hmap.entry(key).or_default();
        hmap_entry.insert(field, value);
    }

    // Snapshot of one hash, taken under its shard's read lock.
    pub fn hgetall(&self, key: &str) -> Option<Vec<(String, BulkString)>> {
        self.hmap.get(key).map(|v| {
            v.iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()
        })
    }
}
