//! Identity contract and a static, token-based authenticator

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The acting user, as vouched for by the authenticator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
}

/// Public profile used to enrich ticket reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&UserSummary> for Identity {
    fn from(user: &UserSummary) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
        }
    }
}

/// Resolves request credentials into identities
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Turn a bearer token into an identity
    async fn authenticate(&self, token: &str) -> Result<Identity>;

    /// Look up a user's public profile by id
    async fn lookup(&self, id: &str) -> Option<UserSummary>;
}

/// Authenticator over a fixed token table
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, String>,
    users: HashMap<String, UserSummary>,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserSummary, token: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user.id.clone());
        self.users.insert(user.id.clone(), user);
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity> {
        if token.is_empty() {
            return Err(Error::Unauthorized("no token supplied".to_string()));
        }
        self.tokens
            .get(token)
            .and_then(|id| self.users.get(id))
            .map(Identity::from)
            .ok_or_else(|| Error::Unauthorized("token is not valid".to_string()))
    }

    async fn lookup(&self, id: &str) -> Option<UserSummary> {
        self.users.get(id).cloned()
    }
}
