use chrono::{DateTime, Duration, Utc};
use log::debug;
use reqwest::RequestBuilder;
use serde::Deserialize;

use crate::error::AuthError;

/// JSON body returned by an OAuth2 token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn into_access_token(self, received_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            // an out-of-range lifetime leaves the expiry unknown
            expires_at: self.expires_in.and_then(|secs| {
                Duration::try_seconds(secs).and_then(|d| received_at.checked_add_signed(d))
            }),
            value: self.access_token,
            token_type: self.token_type,
        }
    }
}

/// A short-lived bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of an authorization-code grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: String,
}

/// Sends a prepared token request and decodes the response. Any failure,
/// including a non-2xx status, is returned as is.
pub(crate) async fn exchange(
    req: RequestBuilder,
    grant_type: &str,
) -> Result<TokenResponse, AuthError> {
    let (c, req) = req.build_split();
    let req = req?;
    debug!("requesting {} grant from {}", grant_type, req.url());

    let rsp = c.execute(req).await?;
    let status = rsp.status();
    if !status.is_success() {
        let body = rsp.text().await.unwrap_or_default();
        return Err(AuthError::BadStatus { status, body });
    }
    Ok(rsp.json::<TokenResponse>().await?)
}
