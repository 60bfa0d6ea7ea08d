use crate::auth::{Identity, IdentityProvider, Session};
use crate::config::Config;
use crate::error::{Result, TerritorialError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Email/password sign-in against Supabase GoTrue (`/auth/v1`)
#[derive(Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: Identity,
}

impl SupabaseAuth {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (url, key) = config.supabase_credentials()?;
        Ok(Self::new(url, key))
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

/// GoTrue has used `msg`, `error_description` and `message` over time
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

fn transport(e: reqwest::Error) -> TerritorialError {
    TerritorialError::Auth(e.to_string())
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let resp = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;
        if !status.is_success() {
            warn!("Sign-in rejected for {}: {}", email, status);
            return Err(TerritorialError::Auth(error_message(&body)));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TerritorialError::Auth(format!("unexpected token response: {e}")))?;
        info!("Signed in as {}", token.user.email.as_deref().unwrap_or(&token.user.id));
        Ok(Session {
            access_token: token.access_token,
            identity: token.user,
        })
    }

    async fn identify(&self, access_token: &str) -> Result<Identity> {
        let resp = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(TerritorialError::Auth(error_message(&body)));
        }
        serde_json::from_str(&body)
            .map_err(|e| TerritorialError::Auth(format!("unexpected user response: {e}")))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.auth_url("logout"))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TerritorialError::Auth(error_message(&body)));
        }
        Ok(())
    }
}
