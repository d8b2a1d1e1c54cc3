use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::model::{AppSettings, MatchSession, UserRole};

pub mod document;
pub mod local;
pub mod shared_bin;

#[derive(Debug, PartialEq, Eq)]
pub enum StoreError {
    DuplicateId(String),
    Unavailable
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "A session with id '{}' already exists", id),
            Self::Unavailable => write!(f, "The backend is not reachable")
        }
    }
}

impl std::error::Error for StoreError {}

/// Uniform persistence contract shared by the three backends.
///
/// Reads never fail across this boundary: a backend that cannot be reached
/// reports an empty list or default settings and the caller serves stale or
/// empty state. Write failures come back as `false`, not errors, except for
/// `add_session` which must refuse to silently overwrite an existing id.
///
/// `update_session` replaces the stored session wholesale and upserts when the
/// id is absent. Whole-record replacement means two writers that read the same
/// snapshot can lose one another's table updates; that race is a property of
/// the design, not something a backend may paper over.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn list_sessions(&self) -> Vec<MatchSession>;

    /// Like [`list_sessions`](Self::list_sessions) but an unreachable backend
    /// reads as `None` instead of an empty list. Callers that only render can
    /// keep the infallible form; the synchronizer needs the distinction so a
    /// failed poll does not overwrite the last good snapshot.
    async fn try_list_sessions(&self) -> Option<Vec<MatchSession>> {
        Some(self.list_sessions().await)
    }
    async fn add_session(&self, session: &MatchSession) -> Result<(), StoreError>;
    async fn update_session(&self, session: &MatchSession) -> bool;
    async fn delete_session(&self, id: &str) -> bool;
    async fn get_settings(&self) -> AppSettings;
    async fn update_password(&self, role: UserRole, new_value: &str) -> bool;

    /// Push-based change feed carrying the full session list. Only the
    /// document store supports one; the others are polled.
    fn watch(&self) -> Option<broadcast::Receiver<Vec<MatchSession>>> {
        None
    }
}
