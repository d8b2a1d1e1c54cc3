use rocket::{http::{ContentType, Status}, response::{self, Responder, Response}, serde::json::Json, Request};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::model::SubmitError;
use crate::storage::StoreError;
use crate::sync::SyncTransitionError;

pub struct ApiErrorResponder {
    pub status: Status,
    pub error: ApiError
}

impl ApiErrorResponder {
    fn create(status: Status, code: &ApiExceptionType, message: &str) -> Self {
        ApiErrorResponder {
            status,
            error: ApiError { code: code.to_owned(), message: String::from(message), error: true }
        }
    }

    pub fn unauthorized() -> Self {
        Self::create(
            Status::Unauthorized,
            &ApiExceptionType::UnauthorizedException,
            "Credentials are missing or invalid"
        )
    }

    pub fn validation_error_with_message(message: &str) -> Self {
        Self::create(Status::BadRequest, &ApiExceptionType::ValidationError, message)
    }

    pub fn missing_session() -> Self {
        Self::create(Status::NotFound, &ApiExceptionType::SessionMissing, "The session does not exist")
    }

    pub fn duplicate_session(id: &str) -> Self {
        Self::create(
            Status::Conflict,
            &ApiExceptionType::SessionConflict,
            &format!("A session with id '{}' already exists", id)
        )
    }

    pub fn session_closed() -> Self {
        Self::create(
            Status::Conflict,
            &ApiExceptionType::SessionClosed,
            "The session is closed to submissions"
        )
    }

    pub fn missing_table(table_number: u32) -> Self {
        Self::create(
            Status::NotFound,
            &ApiExceptionType::TableMissing,
            &format!("Table {} does not exist in this session", table_number)
        )
    }

    pub fn referee_not_in_roster(name: &str) -> Self {
        Self::create(
            Status::Forbidden,
            &ApiExceptionType::RefereeNotInRoster,
            &format!("'{}' is not in the referee roster", name)
        )
    }

    pub fn import_error(detail: &str) -> Self {
        Self::create(Status::UnprocessableEntity, &ApiExceptionType::ImportError, detail)
    }

    pub fn backend_write_failed() -> Self {
        Self::create(
            Status::BadGateway,
            &ApiExceptionType::BackendUnavailable,
            "The operation did not complete; the backend could not be reached"
        )
    }

    pub fn sync_unavailable(detail: &str) -> Self {
        Self::create(Status::Conflict, &ApiExceptionType::SyncUnavailable, detail)
    }
}

impl From<SubmitError> for ApiErrorResponder {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::SessionClosed => Self::session_closed(),
            SubmitError::NoResultChosen => {
                Self::validation_error_with_message("A terminal result must be chosen before submitting")
            }
            SubmitError::UnknownTable(n) => Self::missing_table(n),
            SubmitError::RefereeNotInRoster(name) => Self::referee_not_in_roster(&name)
        }
    }
}

impl From<StoreError> for ApiErrorResponder {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateId(id) => Self::duplicate_session(&id),
            StoreError::Unavailable => Self::backend_write_failed()
        }
    }
}

impl From<SyncTransitionError> for ApiErrorResponder {
    fn from(e: SyncTransitionError) -> Self {
        match e {
            SyncTransitionError::NothingToPublish => {
                Self::validation_error_with_message("Create at least one session before publishing")
            }
            other => Self::sync_unavailable(&other.to_string())
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiErrorResponder {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let data = Json(self.error);
        Response::build_from(data.respond_to(req)?)
            .header(ContentType::JSON)
            .status(self.status)
            .ok()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    code: ApiExceptionType,
    message: String,
    error: bool
}

#[derive(Serialize, Deserialize, Display, Clone)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
enum ApiExceptionType {
    UnauthorizedException,
    ValidationError,
    SessionMissing,
    SessionConflict,
    SessionClosed,
    TableMissing,
    RefereeNotInRoster,
    ImportError,
    BackendUnavailable,
    SyncUnavailable
}
