use super::{SessionStore, StoreData, swap_in};
use crate::error::Result;
use crate::models::Session;
use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// The whole store as one `{"sessions": {...}}` document on disk.
///
/// Every write rewrites the full file. Writes from this process are queued on
/// `write_lock`, so a read-modify-write cycle cannot interleave with another.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Overwrites the file with `data`.
    pub async fn save(&self, data: &StoreData) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_file(data).await
    }

    async fn read_file(&self) -> Result<StoreData> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No store file at {}, starting empty", self.path.display());
                Ok(StoreData::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, data: &StoreData) -> Result<()> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        data.serialize(&mut ser)?;

        // Write next to the target, then swap it in
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &buf).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            warn!("Failed to move {} into place: {}", tmp.display(), e);
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self) -> Result<StoreData> {
        self.read_file().await
    }

    async fn get(&self, key: &str) -> Result<Option<Session>> {
        let mut data = self.read_file().await?;
        Ok(data.sessions.remove(key))
    }

    async fn put(&self, key: &str, session: &Session) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.read_file().await?;
        let version = swap_in(&mut data.sessions, key, session)?;
        self.write_file(&data).await?;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;

    fn session(host: &str, participants: &[&str]) -> Session {
        let participants: Vec<String> = participants.iter().map(|s| s.to_string()).collect();
        Session::new(host.to_string(), &participants)
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));

        assert!(store.load().await.unwrap().sessions.is_empty());
        assert!(store.get("Alex_session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_keeps_sessions_wrapper_and_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::new(path.clone());
        store.put("Alex_session", &session("Alex", &["Alex", "Kassia"])).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \"sessions\": {\n        \"Alex_session\": {"));

        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw["sessions"]["Alex_session"]["stage"], "voting");
        assert_eq!(raw["sessions"]["Alex_session"]["voters"][0], "Kassia");
        assert_eq!(raw["sessions"]["Alex_session"]["version"], 1);
    }

    #[tokio::test]
    async fn ballot_order_survives_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        let mut host = session("Host", &["Host", "Zoe", "Amy", "Max"]);
        crate::voting::record_vote(&mut host, "Zoe", crate::models::Ballot::OptedOut).unwrap();
        crate::voting::record_vote(&mut host, "Amy", crate::models::Ballot::OptedOut).unwrap();
        store.put(&host.key(), &host).await.unwrap();

        let stored = store.get(&host.key()).await.unwrap().unwrap();
        let order: Vec<&str> = stored.votes["Host"].iter().map(|(voter, _)| voter).collect();
        assert_eq!(order, vec!["Zoe", "Amy"]);
    }

    #[tokio::test]
    async fn stale_put_is_rejected_and_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        let fresh = session("Alex", &["Alex", "Kassia", "Said"]);
        store.put("Alex_session", &fresh).await.unwrap();

        let err = store.put("Alex_session", &fresh).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.get("Alex_session").await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn concurrent_hosts_do_not_lose_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("data.json")));
        let hosts = ["Kassia", "Said", "Alex", "David", "Papé"];

        let mut handles = Vec::new();
        for host in hosts {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let s = session(host, &hosts);
                store.put(&s.key(), &s).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap().sessions.len(), hosts.len());
    }

    #[tokio::test]
    async fn save_overwrites_whole_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        store.put("Alex_session", &session("Alex", &["Alex", "Said"])).await.unwrap();

        let mut data = StoreData::default();
        let said = session("Said", &["Alex", "Said"]);
        data.sessions.insert(said.key(), said);
        store.save(&data).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, data);
        assert!(!dir.path().join("data.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
