use log::info;
use rocket::{Build, Rocket, State};
use rocket::serde::json::Json;

use crate::model::{MatchSession, ScoringConfig};
use crate::scoring::{self, PlayerScore};
use crate::sheet;
use crate::util::{
    auth::{AdminToken, RoleToken},
    error::ApiErrorResponder,
    r#macro::unwrap_helper,
    responder::{CsvResponder, EmptyResponse, JsonResponder}
};
use crate::MatchboardState;

use self::payloads::{ResultSubmitRequest, SessionCreateRequest, SessionUpdateRequest, StatusUpdateRequest};

mod payloads;

fn dedup_referees(referees: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for referee in referees {
        let trimmed = referee.trim().to_owned();
        if !trimmed.is_empty() && !seen.contains(&trimmed) {
            seen.push(trimmed);
        };
    }
    seen
}

fn validate_roster(title: &str, referees: &[String]) -> Result<(), ApiErrorResponder> {
    if title.trim().is_empty() || referees.is_empty() {
        return Err(ApiErrorResponder::validation_error_with_message(
            "A title and at least one referee are required"
        ));
    };
    Ok(())
}

#[get("/")]
async fn list_sessions(state: &State<MatchboardState>) -> Json<Vec<MatchSession>> {
    Json(state.synchronizer.sessions())
}

#[post("/", format = "json", data = "<create_req>")]
async fn create_session(
    state: &State<MatchboardState>,
    create_req: Json<SessionCreateRequest>,
    _auth_guard: AdminToken
) -> Result<JsonResponder<MatchSession>, ApiErrorResponder> {
    let data = create_req.0;
    let referees = dedup_referees(data.referees);
    validate_roster(&data.title, &referees)?;

    let session = MatchSession::new(
        data.title,
        referees,
        data.tables.into_iter().map(|t| t.into_table()).collect(),
        data.scoring_config.unwrap_or_else(ScoringConfig::default)
    );
    state.synchronizer.add_session(&session).await?;
    info!("Session '{}' created with {} tables", session.title, session.tables.len());
    Ok(JsonResponder::created(session))
}

#[get("/<session_id>")]
async fn get_session(
    state: &State<MatchboardState>,
    session_id: &str
) -> Result<Json<MatchSession>, ApiErrorResponder> {
    let session = unwrap_helper::return_default!(
        state.synchronizer.find_session(session_id).await,
        Err(ApiErrorResponder::missing_session())
    );
    Ok(Json(session))
}

#[put("/<session_id>", format = "json", data = "<update_req>")]
async fn update_session(
    state: &State<MatchboardState>,
    session_id: &str,
    update_req: Json<SessionUpdateRequest>,
    _auth_guard: AdminToken
) -> Result<Json<MatchSession>, ApiErrorResponder> {
    let data = update_req.0;
    let referees = dedup_referees(data.referees);
    validate_roster(&data.title, &referees)?;

    let mut session = unwrap_helper::return_default!(
        state.synchronizer.find_session(session_id).await,
        Err(ApiErrorResponder::missing_session())
    );
    session.title = data.title;
    session.referees = referees;
    session.tables = data.tables.into_iter().map(|t| t.into_table()).collect();
    if let Some(scoring_config) = data.scoring_config {
        session.scoring_config = scoring_config;
    };
    if !state.synchronizer.update_session(&session).await {
        return Err(ApiErrorResponder::backend_write_failed());
    };
    Ok(Json(session))
}

#[delete("/<session_id>")]
async fn delete_session(
    state: &State<MatchboardState>,
    session_id: &str,
    _auth_guard: AdminToken
) -> Result<Json<EmptyResponse>, ApiErrorResponder> {
    if !state.synchronizer.delete_session(session_id).await {
        return Err(ApiErrorResponder::backend_write_failed());
    };
    info!("Session {} deleted", session_id);
    Ok(Json(EmptyResponse {}))
}

#[put("/<session_id>/status", format = "json", data = "<status_req>")]
async fn update_status(
    state: &State<MatchboardState>,
    session_id: &str,
    status_req: Json<StatusUpdateRequest>,
    _auth_guard: AdminToken
) -> Result<Json<MatchSession>, ApiErrorResponder> {
    let mut session = unwrap_helper::return_default!(
        state.synchronizer.find_session(session_id).await,
        Err(ApiErrorResponder::missing_session())
    );
    session.status = status_req.0.status;
    if !state.synchronizer.update_session(&session).await {
        return Err(ApiErrorResponder::backend_write_failed());
    };
    info!("Session {} is now {}", session.id, session.status);
    Ok(Json(session))
}

#[post("/<session_id>/results", format = "json", data = "<submit_req>")]
async fn submit_result(
    state: &State<MatchboardState>,
    session_id: &str,
    submit_req: Json<ResultSubmitRequest>,
    auth_guard: RoleToken
) -> Result<Json<MatchSession>, ApiErrorResponder> {
    let data = submit_req.0;
    if data.submitted_by.trim().is_empty() {
        return Err(ApiErrorResponder::validation_error_with_message("A reporter name is required"));
    };
    let mut session = unwrap_helper::return_default!(
        state.synchronizer.find_session(session_id).await,
        Err(ApiErrorResponder::missing_session())
    );
    session.submit_result(data.table_number, data.result, &data.submitted_by, auth_guard.role)?;
    if !state.synchronizer.update_session(&session).await {
        return Err(ApiErrorResponder::backend_write_failed());
    };
    info!(
        "Table {} of session {} recorded as {} by {}",
        data.table_number, session.id, data.result, data.submitted_by
    );
    Ok(Json(session))
}

#[get("/<session_id>/standings")]
async fn get_standings(
    state: &State<MatchboardState>,
    session_id: &str
) -> Result<Json<Vec<PlayerScore>>, ApiErrorResponder> {
    let session = unwrap_helper::return_default!(
        state.synchronizer.find_session(session_id).await,
        Err(ApiErrorResponder::missing_session())
    );
    Ok(Json(scoring::aggregate(&session)))
}

#[get("/<session_id>/export/tables")]
async fn export_tables(
    state: &State<MatchboardState>,
    session_id: &str,
    _auth_guard: AdminToken
) -> Result<CsvResponder, ApiErrorResponder> {
    let session = unwrap_helper::return_default!(
        state.synchronizer.find_session(session_id).await,
        Err(ApiErrorResponder::missing_session())
    );
    let body = sheet::export_tables(&session);
    Ok(CsvResponder::attachment(&format!("tables-{}.csv", session.id), body))
}

#[get("/<session_id>/export/standings")]
async fn export_standings(
    state: &State<MatchboardState>,
    session_id: &str,
    _auth_guard: AdminToken
) -> Result<CsvResponder, ApiErrorResponder> {
    let session = unwrap_helper::return_default!(
        state.synchronizer.find_session(session_id).await,
        Err(ApiErrorResponder::missing_session())
    );
    let body = sheet::export_standings(&session);
    Ok(CsvResponder::attachment(&format!("standings-{}.csv", session.id), body))
}

/// Replaces the session's table configuration from an uploaded sheet. A parse
/// failure leaves the existing tables exactly as they were.
#[post("/<session_id>/import", data = "<body>")]
async fn import_tables(
    state: &State<MatchboardState>,
    session_id: &str,
    body: String,
    _auth_guard: AdminToken
) -> Result<Json<MatchSession>, ApiErrorResponder> {
    let mut session = unwrap_helper::return_default!(
        state.synchronizer.find_session(session_id).await,
        Err(ApiErrorResponder::missing_session())
    );
    let tables = match sheet::import_tables(body.as_bytes()) {
        Ok(tables) => tables,
        Err(e) => return Err(ApiErrorResponder::import_error(&e.to_string()))
    };
    session.tables = tables;
    if !state.synchronizer.update_session(&session).await {
        return Err(ApiErrorResponder::backend_write_failed());
    };
    info!("Session {} tables replaced by import ({} rows)", session.id, session.tables.len());
    Ok(Json(session))
}

pub fn mount(rocket_build: Rocket<Build>) -> Rocket<Build> {
    rocket_build.mount(
        "/sessions",
        routes![
            list_sessions,
            create_session,
            get_session,
            update_session,
            delete_session,
            update_status,
            submit_result,
            get_standings,
            export_tables,
            export_standings,
            import_tables
        ]
    )
}
