use rocket::{Build, Rocket, State};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};

use crate::util::{auth::AdminToken, error::ApiErrorResponder};
use crate::MatchboardState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateResponse {
    pub mode: &'static str,
    pub code: Option<String>
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub code: String
}

async fn current_state(state: &MatchboardState) -> SyncStateResponse {
    let mode = state.synchronizer.mode().await;
    SyncStateResponse { mode: mode.kind(), code: mode.code().map(str::to_owned) }
}

#[get("/")]
async fn get_sync_state(state: &State<MatchboardState>) -> Json<SyncStateResponse> {
    Json(current_state(state).await)
}

/// Uploads the current local session list as a brand-new bin and switches to
/// shared-bin mode. The returned code is what other devices join with.
#[post("/publish")]
async fn publish(
    state: &State<MatchboardState>,
    _auth_guard: AdminToken
) -> Result<Json<SyncStateResponse>, ApiErrorResponder> {
    state.synchronizer.publish().await?;
    Ok(Json(current_state(state).await))
}

#[post("/join", format = "json", data = "<join_req>")]
async fn join(
    state: &State<MatchboardState>,
    join_req: Json<JoinRequest>,
    _auth_guard: AdminToken
) -> Result<Json<SyncStateResponse>, ApiErrorResponder> {
    let code = join_req.0.code.trim().to_owned();
    if code.is_empty() {
        return Err(ApiErrorResponder::validation_error_with_message("A sync code is required"));
    };
    state.synchronizer.join(&code).await?;
    Ok(Json(current_state(state).await))
}

/// Reverts to local-only mode. Local state may be stale relative to what the
/// bin last held; that staleness is the documented cost of leaving.
#[delete("/")]
async fn clear(
    state: &State<MatchboardState>,
    _auth_guard: AdminToken
) -> Result<Json<SyncStateResponse>, ApiErrorResponder> {
    state.synchronizer.clear_sync().await?;
    Ok(Json(current_state(state).await))
}

pub fn mount(rocket_build: Rocket<Build>) -> Rocket<Build> {
    rocket_build.mount("/sync", routes![get_sync_state, publish, join, clear])
}
