pub mod guard;
pub mod password;
pub mod policy;
pub mod token;

use crate::db::models::Role;

/// The authenticated caller, attached to the request by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
