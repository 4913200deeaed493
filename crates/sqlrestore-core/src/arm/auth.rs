//! Bearer tokens via the client-credentials grant
//!
//! Tokens are cached and reused until shortly before they expire.

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::config::Credentials;
use crate::error::{CoreError, Result};

/// Refresh this long before the reported expiry
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Assumed lifetime when the token response does not say
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    // v1 endpoints send this as a string
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

pub(crate) struct TokenSource {
    token_url: Url,
    form: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub(crate) fn new(authority: &str, endpoint: &str, credentials: &Credentials) -> Result<Self> {
        let token_url = Url::parse(&format!(
            "{}/{}/oauth2/v2.0/token",
            authority.trim_end_matches('/'),
            credentials.tenant_id
        ))?;
        let scope = format!("{}/.default", endpoint.trim_end_matches('/'));
        let pairs = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];
        let form = serde_urlencoded::to_string(&pairs[..])
            .map_err(|e| CoreError::Auth(format!("could not encode token request: {e}")))?;

        Ok(Self {
            token_url,
            form,
            cached: Mutex::new(None),
        })
    }

    /// A valid access token, fetching a new one if the cached one is stale
    pub(crate) async fn token(&self, http: &reqwest::Client) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.access_token.clone());
        }

        tracing::debug!(url = %self.token_url, "Requesting access token");
        let response = http
            .post(self.token_url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(self.form.clone())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let reason = serde_json::from_str::<TokenError>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                })
                .unwrap_or_else(|_| format!("token endpoint returned {status}"));
            return Err(CoreError::Auth(reason));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        let lifetime = parsed
            .expires_in
            .as_ref()
            .and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME);

        let token = parsed.access_token;
        *cached = Some(CachedToken {
            access_token: token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_SKEW),
        });
        Ok(token)
    }
}
