use rocket::{Build, Rocket, State};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};

use crate::model::{AppSettings, UserRole};
use crate::util::{auth::AdminToken, error::ApiErrorResponder, responder::EmptyResponse};
use crate::MatchboardState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest {
    pub role: UserRole,
    pub new_value: String
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefereeNamePayload {
    pub name: Option<String>
}

#[get("/")]
async fn get_settings(state: &State<MatchboardState>, _auth_guard: AdminToken) -> Json<AppSettings> {
    Json(state.synchronizer.settings().await)
}

#[put("/password", format = "json", data = "<update_req>")]
async fn update_password(
    state: &State<MatchboardState>,
    update_req: Json<PasswordUpdateRequest>,
    _auth_guard: AdminToken
) -> Result<Json<EmptyResponse>, ApiErrorResponder> {
    let data = update_req.0;
    if data.new_value.trim().is_empty() {
        return Err(ApiErrorResponder::validation_error_with_message("The password may not be empty"));
    };
    if data.role == UserRole::Guest {
        return Err(ApiErrorResponder::validation_error_with_message("Guests have no password"));
    };
    if !state.synchronizer.update_password(data.role, &data.new_value).await {
        return Err(ApiErrorResponder::backend_write_failed());
    };
    Ok(Json(EmptyResponse {}))
}

// Device-local convenience value so a referee does not retype their name.
#[get("/referee-name")]
async fn get_referee_name(state: &State<MatchboardState>) -> Json<RefereeNamePayload> {
    let device_state = state.synchronizer.local_store().device_state().await;
    Json(RefereeNamePayload { name: device_state.referee_name })
}

#[put("/referee-name", format = "json", data = "<name_req>")]
async fn set_referee_name(
    state: &State<MatchboardState>,
    name_req: Json<RefereeNamePayload>
) -> Json<EmptyResponse> {
    state
        .synchronizer
        .local_store()
        .set_referee_name(name_req.0.name.as_deref())
        .await;
    Json(EmptyResponse {})
}

pub fn mount(rocket_build: Rocket<Build>) -> Rocket<Build> {
    rocket_build.mount(
        "/settings",
        routes![get_settings, update_password, get_referee_name, set_referee_name]
    )
}
