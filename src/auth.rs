use crate::error::{Result, TerritorialError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A signed-in session; `access_token` is forwarded to the store for row-level security
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub identity: Identity,
}

/// Who is loading a file. Stamped as `usuario_creador` on every record of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter(String);

impl Submitter {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&Identity> for Submitter {
    type Error = TerritorialError;

    fn try_from(identity: &Identity) -> Result<Self> {
        identity
            .email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
            .map(Submitter::new)
            .ok_or_else(|| TerritorialError::Auth(format!("user {} has no email", identity.id)))
    }
}

/// Credential exchange with an external identity provider. Failures are `Auth` errors and
/// are never retried here.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn identify(&self, access_token: &str) -> Result<Identity>;
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}
