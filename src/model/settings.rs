use serde::{Deserialize, Serialize};

use super::session::UserRole;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_REFEREE_PASSWORD: &str = "ref123";

/// Single shared configuration record backing the login gate. Lazily created
/// with the hardcoded defaults the first time a backend is asked for it.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub admin_password: String,
    pub referee_password: String
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            admin_password: String::from(DEFAULT_ADMIN_PASSWORD),
            referee_password: String::from(DEFAULT_REFEREE_PASSWORD)
        }
    }
}

impl AppSettings {
    pub fn password_for(&self, role: UserRole) -> Option<&str> {
        match role {
            UserRole::Admin => Some(&self.admin_password),
            UserRole::Referee => Some(&self.referee_password),
            UserRole::Guest => None
        }
    }

    pub fn set_password(&mut self, role: UserRole, new_value: &str) -> bool {
        match role {
            UserRole::Admin => { self.admin_password = new_value.to_owned(); true },
            UserRole::Referee => { self.referee_password = new_value.to_owned(); true },
            UserRole::Guest => false
        }
    }
}
