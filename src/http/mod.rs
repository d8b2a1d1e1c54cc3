pub mod auth;
pub mod session;
pub mod settings;
pub mod status;
pub mod sync;
