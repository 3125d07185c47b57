use serde::{Deserialize, Serialize};

use crate::database::{error::Error, schema::User};
use crate::schema::UserRole;

use super::permissions::ActionType;

/// Identity of the authenticated caller, as handed over by the host application.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn new(user_id: i32, username: String, role: UserRole) -> Self {
        Self {
            user_id,
            username,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden);
        }
        Ok(())
    }
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.username.to_owned(), user.role.to_owned())
    }
}

/// Unwraps an optional session or rejects the caller as anonymous.
pub fn require_session(session: Option<&SessionData>) -> Result<&SessionData, Error> {
    session.ok_or(Error::Unauthenticated)
}
