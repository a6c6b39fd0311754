use super::{SessionStore, StoreData, swap_in};
use crate::error::Result;
use crate::models::Session;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<BTreeMap<String, Session>>,
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<StoreData> {
        let sessions = self.sessions.lock().await.clone();
        Ok(StoreData { sessions })
    }

    async fn get(&self, key: &str) -> Result<Option<Session>> {
        Ok(self.sessions.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, session: &Session) -> Result<u64> {
        let mut sessions = self.sessions.lock().await;
        swap_in(&mut sessions, key, session)
    }
}
