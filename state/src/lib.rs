//! Storage for the last notified reading of a station.
//!
//! A store is a tiny key-value slot: one text value per station key. Reading a
//! missing key is a normal first-run condition and returns `None`.

pub mod dynamodb;
pub mod file;
pub mod memory;
mod parse;

use anyhow::Result;

pub use dynamodb::DynamoDbStore;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use parse::{parse_optional_string_field, parse_string_field};

#[allow(async_fn_in_trait)]
pub trait StateStore {
    fn backend(&self) -> &'static str;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Backend chosen at startup from configuration.
pub enum StateBackend {
    File(FileStore),
    DynamoDb(DynamoDbStore),
}

impl StateStore for StateBackend {
    fn backend(&self) -> &'static str {
        match self {
            StateBackend::File(store) => store.backend(),
            StateBackend::DynamoDb(store) => store.backend(),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            StateBackend::File(store) => store.get(key).await,
            StateBackend::DynamoDb(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        match self {
            StateBackend::File(store) => store.put(key, value).await,
            StateBackend::DynamoDb(store) => store.put(key, value).await,
        }
    }
}
