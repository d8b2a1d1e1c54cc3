use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use log::{info, warn};
use mongodb::{
    bson::doc,
    options::{ClientOptions, FindOptions, UpdateOptions},
    Client, Collection, Cursor
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{AppSettings, MatchSession, UserRole};

use super::{SessionStore, StoreError};

const DB_NAME: &str = "matchboard";
const SETTINGS_DOC_ID: &str = "app-settings";
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsDocument {
    #[serde(rename = "_id")]
    id: String,
    admin_password: String,
    referee_password: String
}

impl SettingsDocument {
    fn from_settings(settings: &AppSettings) -> Self {
        SettingsDocument {
            id: String::from(SETTINGS_DOC_ID),
            admin_password: settings.admin_password.clone(),
            referee_password: settings.referee_password.clone()
        }
    }

    fn into_settings(self) -> AppSettings {
        AppSettings { admin_password: self.admin_password, referee_password: self.referee_password }
    }
}

/// Cloud document backend: one document per session keyed by its id, plus a
/// push feed driven by a change stream so observers see writes from other
/// clients without polling.
pub struct DocumentStore {
    sessions: Collection<MatchSession>,
    settings: Collection<SettingsDocument>,
    events: broadcast::Sender<Vec<MatchSession>>
}

async fn ping(db: &mongodb::Database) -> bool {
    db.run_command(doc! { "ping": 1 }, None).await.is_ok()
}

async fn consume_cursor<T: serde::de::DeserializeOwned + Unpin + Send + Sync>(cursor: Cursor<T>) -> Vec<T> {
    cursor.collect::<Vec<_>>().await.into_iter().filter_map(Result::ok).collect()
}

impl DocumentStore {
    pub async fn connect(db_url: &str) -> anyhow::Result<DocumentStore> {
        let mut client_options = ClientOptions::parse(db_url).await?;
        client_options.min_pool_size = Some(2);
        client_options.max_pool_size = Some(8);
        client_options.connect_timeout = Some(Duration::new(5, 0));
        client_options.server_selection_timeout = Some(Duration::new(5, 0));

        let client = Client::with_options(client_options)?;
        let db = client.database(DB_NAME);
        if !ping(&db).await {
            return Err(anyhow::anyhow!("Could not reach the document store. Is it running?"));
        };

        let sessions = db.collection::<MatchSession>("sessions");
        let settings = db.collection::<SettingsDocument>("settings");
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let store = DocumentStore { sessions, settings, events };
        store.spawn_change_feed();
        info!("Connected to the document store.");
        Ok(store)
    }

    /// Tails the collection's change stream and re-broadcasts the full list on
    /// every remote write. If change streams are unsupported (standalone
    /// deployment) the feed just goes quiet; local mutations still refresh
    /// through the synchronizer.
    fn spawn_change_feed(&self) {
        let sessions = self.sessions.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut stream = match sessions.watch(None, None).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Change stream unavailable, remote writes will not push: {}", e);
                    return;
                }
            };
            while let Some(event) = stream.next().await {
                if let Err(e) = event {
                    warn!("Change stream interrupted: {}", e);
                    break;
                };
                let listed = match sessions.find(None, Self::newest_first()).await {
                    Ok(cursor) => consume_cursor(cursor).await,
                    Err(e) => {
                        warn!("Could not list sessions after a change event: {}", e);
                        continue;
                    }
                };
                // send fails only when nobody subscribes, which is fine
                let _ = events.send(listed);
            }
        });
    }

    fn newest_first() -> Option<FindOptions> {
        Some(FindOptions::builder().sort(doc! { "createdAt": -1 }).build())
    }
}

#[async_trait]
impl SessionStore for DocumentStore {
    async fn list_sessions(&self) -> Vec<MatchSession> {
        self.try_list_sessions().await.unwrap_or_default()
    }

    async fn try_list_sessions(&self) -> Option<Vec<MatchSession>> {
        match self.sessions.find(None, Self::newest_first()).await {
            Ok(cursor) => Some(consume_cursor(cursor).await),
            Err(e) => {
                warn!("Session list failed: {}", e);
                None
            }
        }
    }

    async fn add_session(&self, session: &MatchSession) -> Result<(), StoreError> {
        let existing = self.sessions.find_one(doc! { "_id": &session.id }, None).await;
        match existing {
            Ok(Some(_)) => return Err(StoreError::DuplicateId(session.id.clone())),
            Ok(None) => {},
            Err(_) => return Err(StoreError::Unavailable)
        };
        self.sessions.insert_one(session, None).await.map(|_| ()).map_err(|e| {
            warn!("Session insert failed: {}", e);
            StoreError::Unavailable
        })
    }

    async fn update_session(&self, session: &MatchSession) -> bool {
        let bson = match mongodb::bson::to_bson(session) {
            Ok(bson) => bson,
            Err(e) => {
                warn!("Session {} did not serialize: {}", session.id, e);
                return false;
            }
        };
        let serialized = match bson.as_document() {
            Some(serialized) => serialized.clone(),
            None => return false
        };
        let update_opts = UpdateOptions::builder().upsert(Some(true)).build();
        self.sessions
            .update_one(doc! { "_id": &session.id }, doc! { "$set": serialized }, Some(update_opts))
            .await
            .is_ok()
    }

    async fn delete_session(&self, id: &str) -> bool {
        // absent id deletes zero documents, which still counts as done
        self.sessions.delete_one(doc! { "_id": id }, None).await.is_ok()
    }

    async fn get_settings(&self) -> AppSettings {
        match self.settings.find_one(doc! { "_id": SETTINGS_DOC_ID }, None).await {
            Ok(Some(document)) => document.into_settings(),
            Ok(None) => {
                let defaults = AppSettings::default();
                let _ = self.settings.insert_one(SettingsDocument::from_settings(&defaults), None).await;
                defaults
            }
            Err(e) => {
                warn!("Settings read failed, serving defaults: {}", e);
                AppSettings::default()
            }
        }
    }

    async fn update_password(&self, role: UserRole, new_value: &str) -> bool {
        let mut settings = self.get_settings().await;
        if !settings.set_password(role, new_value) {
            return false;
        };
        let update_opts = UpdateOptions::builder().upsert(Some(true)).build();
        let document = SettingsDocument::from_settings(&settings);
        let bson = match mongodb::bson::to_bson(&document) {
            Ok(bson) => bson,
            Err(_) => return false
        };
        let serialized = match bson.as_document() {
            Some(serialized) => serialized.clone(),
            None => return false
        };
        self.settings
            .update_one(doc! { "_id": SETTINGS_DOC_ID }, doc! { "$set": serialized }, Some(update_opts))
            .await
            .is_ok()
    }

    fn watch(&self) -> Option<broadcast::Receiver<Vec<MatchSession>>> {
        Some(self.events.subscribe())
    }
}
