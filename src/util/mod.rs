pub mod auth;
pub mod error;
pub mod r#macro;
pub mod responder;
pub mod time;
