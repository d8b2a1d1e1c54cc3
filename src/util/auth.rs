use rocket::{http::Status, request::{self, FromRequest, Outcome}, Request};

use crate::model::UserRole;
use crate::MatchboardState;

struct AuthHeader;
impl AuthHeader {
    pub const ROLE: &'static str = "X-Auth-Role";
    pub const PASSWORD: &'static str = "X-Auth-Password";
}

/// Validated role for one request, checked against the shared settings record
/// of whichever backend is authoritative. There is no token or expiry; every
/// request re-presents the plaintext password.
pub struct RoleToken {
    pub role: UserRole
}

/// Narrowing of [`RoleToken`] to organizer-only routes.
pub struct AdminToken;

pub struct AuthorizationError {
    problem: String
}

impl std::fmt::Debug for AuthorizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Authorization Error: {}", self.problem)
    }
}

fn create_failure_outcome<T>(status: Status, error: String) -> request::Outcome<T, AuthorizationError> {
    Outcome::Error((status, AuthorizationError { problem: error }))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RoleToken {
    type Error = AuthorizationError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, AuthorizationError> {
        let state = match req.rocket().state::<MatchboardState>() {
            Some(state) => state,
            None => return create_failure_outcome(Status::InternalServerError, String::from("Internal error"))
        };
        let header_map = req.headers();
        let role = match header_map.get_one(AuthHeader::ROLE) {
            Some("ADMIN") => UserRole::Admin,
            Some("REFEREE") => UserRole::Referee,
            Some(other) => {
                return create_failure_outcome(Status::Unauthorized, format!("Unknown role '{}'", other))
            }
            None => return create_failure_outcome(Status::Unauthorized, String::from("Missing role header"))
        };
        let provided = match header_map.get_one(AuthHeader::PASSWORD) {
            Some(provided) => provided,
            None => return create_failure_outcome(Status::Unauthorized, String::from("Missing password header"))
        };
        let settings = state.synchronizer.settings().await;
        match settings.password_for(role) {
            Some(expected) if expected == provided => Outcome::Success(RoleToken { role }),
            _ => create_failure_outcome(Status::Unauthorized, String::from("Wrong password"))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = AuthorizationError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, AuthorizationError> {
        match req.guard::<RoleToken>().await {
            Outcome::Success(token) if token.role == UserRole::Admin => Outcome::Success(AdminToken),
            Outcome::Success(_) => {
                create_failure_outcome(Status::Forbidden, String::from("Organizer access required"))
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f)
        }
    }
}
