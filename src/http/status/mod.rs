use rocket::{Build, Rocket, State};
use rocket::serde::json::Json;
use serde::Serialize;

use crate::MatchboardState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    status: &'static str,
    sync_mode: &'static str
}

#[get("/")]
pub async fn status(state: &State<MatchboardState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK",
        sync_mode: state.synchronizer.mode().await.kind()
    })
}

pub fn mount(rocket_build: Rocket<Build>) -> Rocket<Build> {
    rocket_build.mount("/status", routes![status])
}
