use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::model::{AppSettings, MatchSession, UserRole};

use super::{SessionStore, StoreError};

/// The entire remote blob: the full session list plus the shared settings
/// record, replaced wholesale on every mutation.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct BinDocument {
    pub sessions: Vec<MatchSession>,
    pub settings: AppSettings
}

#[derive(Deserialize)]
struct ReadBinResponse {
    record: BinDocument
}

#[derive(Deserialize)]
struct CreateBinResponse {
    metadata: BinMetadata
}

#[derive(Deserialize)]
struct BinMetadata {
    id: String
}

/// Remote JSON-bin backend addressed by an opaque sync code. Every operation
/// fails soft: network trouble reads as an empty list or a `false`/`None`
/// sentinel, and the caller owns the user-facing messaging.
pub struct SharedBinStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    code: RwLock<Option<String>>
}

impl SharedBinStore {
    pub fn new(base_url: String, api_key: Option<String>, code: Option<String>) -> Self {
        SharedBinStore {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            code: RwLock::new(code)
        }
    }

    pub async fn current_code(&self) -> Option<String> {
        self.code.read().await.clone()
    }

    pub async fn set_code(&self, code: Option<String>) {
        *self.code.write().await = code;
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("X-Master-Key", key),
            None => builder
        }
    }

    /// Publishes an initial blob and returns the code the service assigned.
    pub async fn create_bin(&self, document: &BinDocument) -> Option<String> {
        let url = format!("{}/b", self.base_url);
        let response = match self.with_key(self.client.post(&url).json(document)).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Bin create failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("Bin create rejected with status {}", response.status());
            return None;
        };
        match response.json::<CreateBinResponse>().await {
            Ok(created) => Some(created.metadata.id),
            Err(e) => {
                warn!("Bin create returned an unreadable payload: {}", e);
                None
            }
        }
    }

    /// Latest remote snapshot for an explicit code, `None` on any failure.
    pub async fn fetch(&self, code: &str) -> Option<BinDocument> {
        let url = format!("{}/b/{}/latest", self.base_url, code);
        let response = match self.with_key(self.client.get(&url)).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Bin fetch failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            return None;
        };
        match response.json::<ReadBinResponse>().await {
            Ok(read) => Some(read.record),
            Err(e) => {
                warn!("Bin {} holds an unreadable payload: {}", code, e);
                None
            }
        }
    }

    pub async fn push(&self, code: &str, document: &BinDocument) -> bool {
        let url = format!("{}/b/{}", self.base_url, code);
        match self.with_key(self.client.put(&url).json(document)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Bin push failed: {}", e);
                false
            }
        }
    }

    async fn fetch_current(&self) -> Option<BinDocument> {
        let code = self.current_code().await?;
        self.fetch(&code).await
    }

    /// Read-modify-push of the whole blob. The remote copy is re-fetched
    /// first, so the post-mutation push carries the newest snapshot this
    /// writer has seen; concurrent writers still race at blob granularity.
    async fn mutate<F: FnOnce(&mut BinDocument)>(&self, mutation: F) -> bool {
        let code = match self.current_code().await {
            Some(code) => code,
            None => return false
        };
        let mut document = match self.fetch(&code).await {
            Some(document) => document,
            None => return false
        };
        mutation(&mut document);
        self.push(&code, &document).await
    }
}

#[async_trait]
impl SessionStore for SharedBinStore {
    async fn list_sessions(&self) -> Vec<MatchSession> {
        self.try_list_sessions().await.unwrap_or_default()
    }

    async fn try_list_sessions(&self) -> Option<Vec<MatchSession>> {
        self.fetch_current().await.map(|d| d.sessions)
    }

    async fn add_session(&self, session: &MatchSession) -> Result<(), StoreError> {
        let code = match self.current_code().await {
            Some(code) => code,
            None => return Err(StoreError::Unavailable)
        };
        let mut document = match self.fetch(&code).await {
            Some(document) => document,
            None => return Err(StoreError::Unavailable)
        };
        if document.sessions.iter().any(|s| s.id == session.id) {
            return Err(StoreError::DuplicateId(session.id.clone()));
        };
        document.sessions.push(session.clone());
        if self.push(&code, &document).await { Ok(()) } else { Err(StoreError::Unavailable) }
    }

    async fn update_session(&self, session: &MatchSession) -> bool {
        self.mutate(|document| {
            match document.sessions.iter_mut().find(|s| s.id == session.id) {
                Some(existing) => *existing = session.clone(),
                None => document.sessions.push(session.clone())
            };
        }).await
    }

    async fn delete_session(&self, id: &str) -> bool {
        self.mutate(|document| document.sessions.retain(|s| s.id != id)).await
    }

    async fn get_settings(&self) -> AppSettings {
        self.fetch_current().await.map(|d| d.settings).unwrap_or_default()
    }

    async fn update_password(&self, role: UserRole, new_value: &str) -> bool {
        let mut applied = false;
        let pushed = self.mutate(|document| {
            applied = document.settings.set_password(role, new_value);
        }).await;
        pushed && applied
    }
}
