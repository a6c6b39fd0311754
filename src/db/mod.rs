mod json_file;
mod memory;
mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::StoreBackend;
use crate::error::{Error, Result};
use crate::models::Session;
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything the store holds, keyed by session key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Every stored session. An empty store is not an error.
    async fn load(&self) -> Result<StoreData>;

    async fn get(&self, key: &str) -> Result<Option<Session>>;

    /// Writes `session` if the stored version still equals `session.version`
    /// (a missing session counts as version 0). Returns the new version.
    async fn put(&self, key: &str, session: &Session) -> Result<u64>;
}

/// Compare-and-swap shared by the map-backed stores.
pub(crate) fn swap_in(sessions: &mut BTreeMap<String, Session>, key: &str, session: &Session) -> Result<u64> {
    let current = sessions.get(key).map(|s| s.version).unwrap_or(0);
    if current != session.version {
        return Err(Error::Conflict(key.to_string()));
    }

    let mut stored = session.clone();
    stored.version = current + 1;
    sessions.insert(key.to_string(), stored);
    Ok(current + 1)
}

pub async fn open(backend: &StoreBackend) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match backend {
        StoreBackend::Json(path) => {
            info!("Using JSON session store at {}", path.display());
            Arc::new(JsonFileStore::new(path.clone()))
        }
        StoreBackend::Sqlite(url) => {
            info!("Using SQLite session store at {}", url);
            Arc::new(SqliteStore::connect(url).await?)
        }
        StoreBackend::Memory => {
            info!("Using in-memory session store");
            Arc::new(MemoryStore::default())
        }
    };
    Ok(store)
}
