//! The acting principal of a request.
//!
//! Token mechanics live outside this workspace; callers resolve a request to a
//! [`Principal`] and pass it explicitly to every operation.

use common::{SessionId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartOwner;

/// Role attached to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular shopper.
    #[default]
    Customer,
    /// User allowed to list products.
    Seller,
    /// Back-office operator; may drive any order transition.
    Admin,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "user",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a role name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "customer" => Ok(Role::Customer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Who is acting: a registered user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    User(UserId),
    Guest(SessionId),
}

/// The acting principal together with its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    identity: Identity,
    role: Role,
}

impl Principal {
    /// An authenticated user with the given role.
    pub fn user(user_id: UserId, role: Role) -> Self {
        Self {
            identity: Identity::User(user_id),
            role,
        }
    }

    /// An authenticated admin.
    pub fn admin(user_id: UserId) -> Self {
        Self::user(user_id, Role::Admin)
    }

    /// An anonymous shopper identified only by session.
    pub fn guest(session_id: impl Into<SessionId>) -> Self {
        Self {
            identity: Identity::Guest(session_id.into()),
            role: Role::Customer,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the user id when the principal is authenticated.
    pub fn user_id(&self) -> Option<UserId> {
        match self.identity {
            Identity::User(id) => Some(id),
            Identity::Guest(_) => None,
        }
    }

    /// Returns true for authenticated admins.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin && self.user_id().is_some()
    }

    /// The key under which this principal's cart is stored.
    pub fn cart_owner(&self) -> CartOwner {
        match &self.identity {
            Identity::User(id) => CartOwner::User(*id),
            Identity::Guest(session) => CartOwner::Session(session.clone()),
        }
    }
}
