use rocket::{Build, Rocket, State};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};

use crate::model::UserRole;
use crate::util::error::ApiErrorResponder;
use crate::MatchboardState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub role: UserRole,
    pub password: String
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub role: UserRole
}

/// Plaintext comparison against the shared settings record. A successful
/// match is the caller's cue to keep sending the password on privileged
/// requests; nothing is issued or stored server-side.
#[post("/login", format = "json", data = "<login_req>")]
async fn login(
    state: &State<MatchboardState>,
    login_req: Json<LoginRequest>
) -> Result<Json<LoginResponse>, ApiErrorResponder> {
    let data = login_req.0;
    if data.role == UserRole::Guest {
        return Err(ApiErrorResponder::validation_error_with_message("Guests do not log in"));
    };
    let settings = state.synchronizer.settings().await;
    match settings.password_for(data.role) {
        Some(expected) if expected == data.password => Ok(Json(LoginResponse { role: data.role })),
        _ => Err(ApiErrorResponder::unauthorized())
    }
}

pub fn mount(rocket_build: Rocket<Build>) -> Rocket<Build> {
    rocket_build.mount("/auth", routes![login])
}
