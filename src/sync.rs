use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;

use crate::model::{AppSettings, MatchSession, UserRole};
use crate::storage::{
    local::LocalStore,
    shared_bin::{BinDocument, SharedBinStore},
    document::DocumentStore,
    SessionStore, StoreError
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SyncMode {
    Local,
    SharedBin { code: String },
    Document
}

impl SyncMode {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::SharedBin { .. } => "SHARED_BIN",
            Self::Document => "DOCUMENT"
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::SharedBin { code } => Some(code),
            _ => None
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SyncTransitionError {
    NothingToPublish,
    ModeFixed,
    NotConfigured,
    Unavailable
}

impl std::fmt::Display for SyncTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingToPublish => write!(f, "Create at least one session before publishing"),
            Self::ModeFixed => write!(f, "The document store is authoritative and cannot be switched away from"),
            Self::NotConfigured => write!(f, "No shared-bin service is configured"),
            Self::Unavailable => write!(f, "The shared-bin service could not be reached")
        }
    }
}

impl std::error::Error for SyncTransitionError {}

/// Decides which backend is authoritative and keeps the in-memory session
/// cache eventually consistent with it.
///
/// Precedence: a configured document store always wins and never exits; a
/// sync code selects the shared bin, polled on a fixed interval; otherwise the
/// local store serves, also refreshed on the interval. A remote snapshot
/// replaces the whole cache, so the last write a poll observes wins.
pub struct SessionSynchronizer {
    local: Arc<LocalStore>,
    bin: Option<Arc<SharedBinStore>>,
    document: Option<Arc<DocumentStore>>,
    mode: RwLock<SyncMode>,
    cache: watch::Sender<Vec<MatchSession>>,
    poll_interval: Duration
}

impl SessionSynchronizer {
    pub fn new(
        local: Arc<LocalStore>,
        bin: Option<Arc<SharedBinStore>>,
        document: Option<Arc<DocumentStore>>,
        initial_code: Option<String>,
        poll_interval: Duration
    ) -> Self {
        let mode = if document.is_some() {
            SyncMode::Document
        } else {
            match (&bin, initial_code) {
                (Some(_), Some(code)) => SyncMode::SharedBin { code },
                (None, Some(_)) => {
                    warn!("A sync code is set but no bin service is configured; staying local");
                    SyncMode::Local
                }
                _ => SyncMode::Local
            }
        };
        info!("Synchronizer starting in {} mode", mode.kind());
        let (cache, _) = watch::channel(Vec::new());
        SessionSynchronizer { local, bin, document, mode: RwLock::new(mode), cache, poll_interval }
    }

    pub async fn mode(&self) -> SyncMode {
        self.mode.read().await.clone()
    }

    pub async fn active_store(&self) -> Arc<dyn SessionStore> {
        match &*self.mode.read().await {
            SyncMode::Document => match &self.document {
                Some(document) => Arc::clone(document) as Arc<dyn SessionStore>,
                None => Arc::clone(&self.local) as Arc<dyn SessionStore>
            },
            SyncMode::SharedBin { .. } => match &self.bin {
                Some(bin) => Arc::clone(bin) as Arc<dyn SessionStore>,
                None => Arc::clone(&self.local) as Arc<dyn SessionStore>
            },
            SyncMode::Local => Arc::clone(&self.local) as Arc<dyn SessionStore>
        }
    }

    /// Current cached snapshot. May trail the backend by up to one poll tick.
    pub fn sessions(&self) -> Vec<MatchSession> {
        self.cache.borrow().clone()
    }

    /// Pulls the authoritative list and replaces the cache with it. Remote
    /// snapshots are also mirrored into the local store, so dropping back to
    /// local mode serves the last list seen. A failed read changes nothing;
    /// the cache and the local fallback keep their last good snapshot.
    pub async fn refresh(&self) {
        let mode = self.mode().await;
        let listed = match self.active_store().await.try_list_sessions().await {
            Some(listed) => listed,
            None => {
                warn!("Refresh skipped, the {} backend did not answer", mode.kind());
                return;
            }
        };
        if mode != SyncMode::Local {
            self.local.replace_sessions(&listed).await;
        };
        self.cache.send_replace(listed);
    }

    /// Freshest read of one session, straight from the backend rather than
    /// the cache, so a read-then-write cycle starts from the newest snapshot
    /// this client can see. Serves the cached copy if the backend is down.
    pub async fn find_session(&self, id: &str) -> Option<MatchSession> {
        match self.active_store().await.try_list_sessions().await {
            Some(listed) => {
                self.cache.send_replace(listed.clone());
                listed.into_iter().find(|s| s.id == id)
            }
            None => self.sessions().into_iter().find(|s| s.id == id)
        }
    }

    pub async fn add_session(&self, session: &MatchSession) -> Result<(), StoreError> {
        let result = self.active_store().await.add_session(session).await;
        if result.is_ok() {
            self.refresh().await;
        };
        result
    }

    pub async fn update_session(&self, session: &MatchSession) -> bool {
        let ok = self.active_store().await.update_session(session).await;
        if ok {
            self.refresh().await;
        };
        ok
    }

    pub async fn delete_session(&self, id: &str) -> bool {
        let ok = self.active_store().await.delete_session(id).await;
        if ok {
            self.refresh().await;
        };
        ok
    }

    pub async fn settings(&self) -> AppSettings {
        self.active_store().await.get_settings().await
    }

    pub async fn update_password(&self, role: UserRole, new_value: &str) -> bool {
        self.active_store().await.update_password(role, new_value).await
    }

    pub fn local_store(&self) -> &LocalStore {
        &self.local
    }

    /// Publishes the current local list as a brand-new bin and adopts the
    /// returned code. Local state stays behind as the fallback copy.
    pub async fn publish(&self) -> Result<String, SyncTransitionError> {
        if self.document.is_some() {
            return Err(SyncTransitionError::ModeFixed);
        };
        let bin = self.bin.as_ref().ok_or(SyncTransitionError::NotConfigured)?;
        let sessions = self.local.list_sessions().await;
        if sessions.is_empty() {
            return Err(SyncTransitionError::NothingToPublish);
        };
        let settings = self.local.get_settings().await;
        let document = BinDocument { sessions, settings };
        let code = bin.create_bin(&document).await.ok_or(SyncTransitionError::Unavailable)?;
        bin.set_code(Some(code.clone())).await;
        self.local.set_sync_code(Some(&code)).await;
        *self.mode.write().await = SyncMode::SharedBin { code: code.clone() };
        self.refresh().await;
        info!("Published local sessions to bin {}", code);
        Ok(code)
    }

    /// Adopts an existing code after verifying the bin actually answers.
    pub async fn join(&self, code: &str) -> Result<(), SyncTransitionError> {
        if self.document.is_some() {
            return Err(SyncTransitionError::ModeFixed);
        };
        let bin = self.bin.as_ref().ok_or(SyncTransitionError::NotConfigured)?;
        if bin.fetch(code).await.is_none() {
            return Err(SyncTransitionError::Unavailable);
        };
        bin.set_code(Some(code.to_owned())).await;
        self.local.set_sync_code(Some(code)).await;
        *self.mode.write().await = SyncMode::SharedBin { code: code.to_owned() };
        self.refresh().await;
        info!("Joined bin {}", code);
        Ok(())
    }

    /// Drops the sync code and reverts to serving local state, which may be
    /// stale relative to whatever the bin last held.
    pub async fn clear_sync(&self) -> Result<(), SyncTransitionError> {
        if self.document.is_some() {
            return Err(SyncTransitionError::ModeFixed);
        };
        if let Some(bin) = &self.bin {
            bin.set_code(None).await;
        };
        self.local.set_sync_code(None).await;
        *self.mode.write().await = SyncMode::Local;
        self.refresh().await;
        info!("Sync code cleared, back to local mode");
        Ok(())
    }

    /// Background task keeping the cache fresh: the document store's push
    /// feed when available, a fixed-interval poll otherwise. Dropping the
    /// handle's owner and aborting it tears the loop down; an in-flight
    /// refresh that resolves afterwards lands in a dropped watch channel.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(document) = &sync.document {
                if let Some(mut feed) = document.watch() {
                    sync.refresh().await;
                    loop {
                        match feed.recv().await {
                            Ok(listed) => {
                                debug!("Push event with {} sessions", listed.len());
                                sync.cache.send_replace(listed);
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                debug!("Push feed lagged by {} events", skipped);
                                continue;
                            }
                            // feed went quiet (change streams unsupported);
                            // keep the document store authoritative via polling
                            Err(broadcast::error::RecvError::Closed) => break
                        }
                    }
                }
            };
            let mut ticker = tokio::time::interval(sync.poll_interval);
            loop {
                ticker.tick().await;
                sync.refresh().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlayerInfo, ScoringConfig, TableMatch};

    const TEST_POLL_INTERVAL: Duration = Duration::from_secs(3);

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

    fn local_only(dir: &tempfile::TempDir) -> SessionSynchronizer {
        SessionSynchronizer::new(
            Arc::new(LocalStore::new(dir.path())),
            None,
            None,
            None,
            TEST_POLL_INTERVAL
        )
    }

    #[tokio::test]
    async fn starts_local_without_code_or_document() {
        let dir = tempfile::tempdir().unwrap();
        let sync = local_only(&dir);
        assert_eq!(sync.mode().await, SyncMode::Local);
    }

    #[tokio::test]
    async fn code_with_configured_bin_selects_shared_bin() {
        let dir = tempfile::tempdir().unwrap();
        let bin = Arc::new(SharedBinStore::new(
            String::from("http://bin.invalid"),
            None,
            Some(String::from("abc123"))
        ));
        let sync = SessionSynchronizer::new(
            Arc::new(LocalStore::new(dir.path())),
            Some(bin),
            None,
            Some(String::from("abc123")),
            TEST_POLL_INTERVAL
        );
        let mode = sync.mode().await;
        assert_eq!(mode.kind(), "SHARED_BIN");
        assert_eq!(mode.code(), Some("abc123"));
    }

    #[tokio::test]
    async fn code_without_bin_stays_local() {
        let dir = tempfile::tempdir().unwrap();
        let sync = SessionSynchronizer::new(
            Arc::new(LocalStore::new(dir.path())),
            None,
            None,
            Some(String::from("orphan")),
            TEST_POLL_INTERVAL
        );
        assert_eq!(sync.mode().await, SyncMode::Local);
    }

    #[tokio::test]
    async fn mutations_refresh_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let sync = local_only(&dir);
        assert!(sync.sessions().is_empty());
        let session = sample_session("r1");
        sync.add_session(&session).await.unwrap();
        assert_eq!(sync.sessions().len(), 1);
        sync.delete_session(&session.id).await;
        assert!(sync.sessions().is_empty());
    }

    #[tokio::test]
    async fn publish_refuses_an_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let bin = Arc::new(SharedBinStore::new(String::from("http://bin.invalid"), None, None));
        let sync = SessionSynchronizer::new(
            Arc::new(LocalStore::new(dir.path())),
            Some(bin),
            None,
            None,
            TEST_POLL_INTERVAL
        );
        assert_eq!(sync.publish().await.unwrap_err(), SyncTransitionError::NothingToPublish);
    }

    #[tokio::test]
    async fn publish_requires_a_configured_bin() {
        let dir = tempfile::tempdir().unwrap();
        let sync = local_only(&dir);
        sync.add_session(&sample_session("r1")).await.unwrap();
        assert_eq!(sync.publish().await.unwrap_err(), SyncTransitionError::NotConfigured);
    }

    #[tokio::test]
    async fn failed_remote_poll_keeps_the_local_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalStore::new(dir.path()));
        local.add_session(&sample_session("kept")).await.unwrap();
        // nothing listens on port 1, so every bin read fails
        let bin = Arc::new(SharedBinStore::new(
            String::from("http://127.0.0.1:1"),
            None,
            Some(String::from("abc123"))
        ));
        let sync = SessionSynchronizer::new(
            Arc::clone(&local),
            Some(bin),
            None,
            Some(String::from("abc123")),
            TEST_POLL_INTERVAL
        );
        sync.refresh().await;
        assert_eq!(local.list_sessions().await.len(), 1);
        assert_eq!(local.list_sessions().await[0].title, "kept");
    }

    #[tokio::test]
    async fn failed_backend_read_serves_the_cached_session() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalStore::new(dir.path()));
        let session = sample_session("cached");
        local.add_session(&session).await.unwrap();
        let bin = Arc::new(SharedBinStore::new(
            String::from("http://127.0.0.1:1"),
            None,
            Some(String::from("abc123"))
        ));
        let sync = SessionSynchronizer::new(
            Arc::clone(&local),
            Some(bin),
            None,
            Some(String::from("abc123")),
            TEST_POLL_INTERVAL
        );
        // seed the cache directly, as a healthy earlier poll would have
        sync.cache.send_replace(vec![session.clone()]);
        let found = sync.find_session(&session.id).await;
        assert_eq!(found.map(|s| s.title), Some(String::from("cached")));
    }

    #[tokio::test]
    async fn clear_sync_reverts_to_local_and_forgets_the_code() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalStore::new(dir.path()));
        local.set_sync_code(Some("abc123")).await;
        let bin = Arc::new(SharedBinStore::new(
            String::from("http://bin.invalid"),
            None,
            Some(String::from("abc123"))
        ));
        let sync = SessionSynchronizer::new(
            Arc::clone(&local),
            Some(bin),
            None,
            Some(String::from("abc123")),
            TEST_POLL_INTERVAL
        );
        sync.clear_sync().await.unwrap();
        assert_eq!(sync.mode().await, SyncMode::Local);
        assert!(local.device_state().await.sync_code.is_none());
    }
}
