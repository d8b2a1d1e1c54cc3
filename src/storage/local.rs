use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::model::{AppSettings, MatchSession, UserRole};

use super::{SessionStore, StoreError};

const SESSIONS_FILE: &str = "sessions.json";
const SETTINGS_FILE: &str = "settings.json";
const DEVICE_FILE: &str = "device.json";

/// Device-local convenience state: the active sync code and the last referee
/// name used on this installation.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceState {
    pub sync_code: Option<String>,
    pub referee_name: Option<String>
}

/// File-backed store: the entire session list lives in one JSON document and
/// every mutation is read-all, mutate, write-all. The mutex only serializes
/// writers inside this process; two processes sharing a data directory race
/// exactly like two browser tabs sharing a storage key.
pub struct LocalStore {
    dir: PathBuf,
    write_lock: Mutex<()>
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        LocalStore { dir: dir.as_ref().to_path_buf(), write_lock: Mutex::new(()) }
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.file_path(name);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(_) => return T::default()
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unparseable local blob {}: {}", path.display(), e);
                T::default()
            }
        }
    }

    async fn write_json<T: Serialize>(&self, name: &str, value: &T) -> bool {
        let raw = match serde_json::to_vec_pretty(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not serialize local blob {}: {}", name, e);
                return false;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Could not create data directory {}: {}", self.dir.display(), e);
            return false;
        };
        match tokio::fs::write(self.file_path(name), raw).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Could not write local blob {}: {}", name, e);
                false
            }
        }
    }

    pub async fn device_state(&self) -> DeviceState {
        self.read_json::<DeviceState>(DEVICE_FILE).await
    }

    pub async fn set_sync_code(&self, code: Option<&str>) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut state = self.device_state().await;
        state.sync_code = code.map(str::to_owned);
        self.write_json(DEVICE_FILE, &state).await
    }

    pub async fn set_referee_name(&self, name: Option<&str>) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut state = self.device_state().await;
        state.referee_name = name.map(str::to_owned);
        self.write_json(DEVICE_FILE, &state).await
    }

    /// Replaces the whole stored list. Used by the synchronizer when a remote
    /// snapshot should overwrite local state.
    pub async fn replace_sessions(&self, sessions: &[MatchSession]) -> bool {
        let _guard = self.write_lock.lock().await;
        self.write_json(SESSIONS_FILE, &sessions).await
    }
}

#[async_trait]
impl SessionStore for LocalStore {
    async fn list_sessions(&self) -> Vec<MatchSession> {
        self.read_json::<Vec<MatchSession>>(SESSIONS_FILE).await
    }

    async fn add_session(&self, session: &MatchSession) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.read_json::<Vec<MatchSession>>(SESSIONS_FILE).await;
        if sessions.iter().any(|s| s.id == session.id) {
            return Err(StoreError::DuplicateId(session.id.clone()));
        };
        sessions.push(session.clone());
        if self.write_json(SESSIONS_FILE, &sessions).await { Ok(()) } else { Err(StoreError::Unavailable) }
    }

    async fn update_session(&self, session: &MatchSession) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.read_json::<Vec<MatchSession>>(SESSIONS_FILE).await;
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            // upsert on absent id, matching the remote backends
            None => sessions.push(session.clone())
        };
        self.write_json(SESSIONS_FILE, &sessions).await
    }

    async fn delete_session(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.read_json::<Vec<MatchSession>>(SESSIONS_FILE).await;
        sessions.retain(|s| s.id != id);
        self.write_json(SESSIONS_FILE, &sessions).await
    }

    async fn get_settings(&self) -> AppSettings {
        let path = self.file_path(SETTINGS_FILE);
        if tokio::fs::metadata(&path).await.is_err() {
            let defaults = AppSettings::default();
            let _guard = self.write_lock.lock().await;
            self.write_json(SETTINGS_FILE, &defaults).await;
            return defaults;
        };
        self.read_json::<AppSettings>(SETTINGS_FILE).await
    }

    async fn update_password(&self, role: UserRole, new_value: &str) -> bool {
        // read under the same guard as the write, like the session mutations
        let _guard = self.write_lock.lock().await;
        let mut settings = self.read_json::<AppSettings>(SETTINGS_FILE).await;
        if !settings.set_password(role, new_value) {
            return false;
        };
        self.write_json(SETTINGS_FILE, &settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlayerInfo, ScoringConfig, TableMatch};

    fn sample_session(title: &str) -> MatchSession {
        MatchSession::new(
            title.to_owned(),
            vec![String::from("A")],
            vec![TableMatch::new(
                1,
                PlayerInfo { id: String::from("P1"), name: String::from("Alice") },
                PlayerInfo { id: String::from("P2"), name: String::from("Bob") }
            )],
            ScoringConfig::default()
        )
    }

    fn temp_store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn add_then_list_preserves_insertion_order() {
        let (_dir, store) = temp_store();
        let first = sample_session("first");
        let second = sample_session("second");
        store.add_session(&first).await.unwrap();
        store.add_session(&second).await.unwrap();
        let titles: Vec<String> = store.list_sessions().await.into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected_not_overwritten() {
        let (_dir, store) = temp_store();
        let session = sample_session("original");
        store.add_session(&session).await.unwrap();
        let mut imposter = session.clone();
        imposter.title = String::from("imposter");
        let err = store.add_session(&imposter).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateId(session.id.clone()));
        assert_eq!(store.list_sessions().await[0].title, "original");
    }

    #[tokio::test]
    async fn update_is_last_write_wins() {
        let (_dir, store) = temp_store();
        let session = sample_session("r1");
        store.add_session(&session).await.unwrap();

        let mut first_write = session.clone();
        first_write.tables[0].result = crate::model::GameResult::Win;
        let mut second_write = session.clone();
        second_write.tables[0].result = crate::model::GameResult::Draw;

        assert!(store.update_session(&first_write).await);
        assert!(store.update_session(&second_write).await);
        let stored = store.list_sessions().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tables[0].result, crate::model::GameResult::Draw);
    }

    #[tokio::test]
    async fn update_upserts_on_absent_id() {
        let (_dir, store) = temp_store();
        let session = sample_session("never added");
        assert!(store.update_session(&session).await);
        assert_eq!(store.list_sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = temp_store();
        let session = sample_session("doomed");
        store.add_session(&session).await.unwrap();
        assert!(store.delete_session(&session.id).await);
        assert!(store.delete_session(&session.id).await);
        assert!(store.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn settings_lazily_created_with_defaults() {
        let (_dir, store) = temp_store();
        let settings = store.get_settings().await;
        assert_eq!(settings, AppSettings::default());
        assert!(store.update_password(UserRole::Admin, "hunter2").await);
        assert_eq!(store.get_settings().await.admin_password, "hunter2");
    }

    #[tokio::test]
    async fn concurrent_password_updates_both_survive() {
        let (_dir, store) = temp_store();
        store.get_settings().await;
        let (admin_ok, referee_ok) = tokio::join!(
            store.update_password(UserRole::Admin, "newadmin"),
            store.update_password(UserRole::Referee, "newref")
        );
        assert!(admin_ok && referee_ok);
        let settings = store.get_settings().await;
        assert_eq!(settings.admin_password, "newadmin");
        assert_eq!(settings.referee_password, "newref");
    }

    #[tokio::test]
    async fn unparseable_blob_degrades_to_empty_list() {
        let (dir, store) = temp_store();
        tokio::fs::write(dir.path().join(SESSIONS_FILE), b"{not json").await.unwrap();
        assert!(store.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn device_state_round_trips() {
        let (_dir, store) = temp_store();
        assert!(store.device_state().await.sync_code.is_none());
        store.set_sync_code(Some("abc123")).await;
        store.set_referee_name(Some("A")).await;
        let state = store.device_state().await;
        assert_eq!(state.sync_code.as_deref(), Some("abc123"));
        assert_eq!(state.referee_name.as_deref(), Some("A"));
        store.set_sync_code(None).await;
        assert!(store.device_state().await.sync_code.is_none());
    }
}
