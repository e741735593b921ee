//! Caller identity.
//!
//! Authentication happens upstream. By the time a request reaches the
//! pipeline the caller has been validated and is described by a
//! [`RequestContext`].

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub user: UserIdentity,
}

impl RequestContext {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user: UserIdentity {
                user_id: user_id.into(),
                is_admin: false,
            },
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user: UserIdentity {
                user_id: user_id.into(),
                is_admin: true,
            },
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }
}
