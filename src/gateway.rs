//! Messaging platform boundary — outbound pushes and profile lookups.
//!
//! Inbound traffic arrives through the webhook (`http` module); this side
//! covers fire-and-forget push notifications and the display-name lookup
//! used by the share flows and reminder text.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::chat::reply::Reply;
use crate::error::GatewayError;

/// Fire-and-forget push delivery to a user.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn push(&self, user_id: &str, reply: &Reply) -> Result<(), GatewayError>;
}

/// Resolve a platform user id to a display name.
///
/// Not authoritative for business logic; callers fall back to the raw id
/// when the lookup fails.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn display_name(&self, user_id: &str) -> Result<String, GatewayError>;
}

/// HTTP client for the messaging platform API.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl HttpGateway {
    pub fn new(base_url: String, access_token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.api_url(path))
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("{path} returned {status}: {detail}");
        }
        Ok(())
    }
}

#[async_trait]
impl PushGateway for HttpGateway {
    async fn push(&self, user_id: &str, reply: &Reply) -> Result<(), GatewayError> {
        let body = serde_json::json!({
            "to": user_id,
            "messages": [reply],
        });
        self.post_json("/push", &body)
            .await
            .map_err(|e| GatewayError::PushFailed {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ProfileLookup for HttpGateway {
    async fn display_name(&self, user_id: &str) -> Result<String, GatewayError> {
        let resp = self
            .client
            .get(self.api_url(&format!("/profile/{user_id}")))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| GatewayError::ProfileFailed {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(GatewayError::ProfileFailed {
                user_id: user_id.to_string(),
                reason: format!("status {}", resp.status()),
            });
        }
        let profile: serde_json::Value =
            resp.json().await.map_err(|e| GatewayError::ProfileFailed {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;
        profile["display_name"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::ProfileFailed {
                user_id: user_id.to_string(),
                reason: "response missing display_name".to_string(),
            })
    }
}

/// TTL cache in front of a [`ProfileLookup`].
pub struct CachedProfiles {
    inner: Arc<dyn ProfileLookup>,
    ttl: Duration,
    cache: RwLock<HashMap<String, (Instant, String)>>,
}

impl CachedProfiles {
    /// Default cache lifetime for resolved display names.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

    pub fn new(inner: Arc<dyn ProfileLookup>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ProfileLookup for CachedProfiles {
    async fn display_name(&self, user_id: &str) -> Result<String, GatewayError> {
        if let Some((cached_at, name)) = self.cache.read().await.get(user_id) {
            if cached_at.elapsed() < self.ttl {
                return Ok(name.clone());
            }
        }
        let name = self.inner.display_name(user_id).await?;
        self.cache
            .write()
            .await
            .insert(user_id.to_string(), (Instant::now(), name.clone()));
        Ok(name)
    }
}
