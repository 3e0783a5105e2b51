use crate::StateStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.lock_values().insert(key.to_string(), value.to_string());
        store
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.lock_values().get(key).cloned()
    }

    /// Number of successful `put` calls.
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.lock_values().insert(key.to_string(), value.to_string());
        *self.writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        Ok(())
    }
}
