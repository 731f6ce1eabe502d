//! Spotify token client, using the client credentials flow: the app's id and
//! secret alone buy a short-lived access token. No user is involved and
//! nothing is stored.

use chrono::Utc;
use reqwest::Client as HttpClient;

use crate::error::AuthError;
use crate::secrets::{ClientCredentials, SpotifySecrets};
use crate::token::{self, AccessToken};

pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

pub const CLIENT_CREDENTIALS_INSTRUCTIONS: &str = r"1. open https://developer.spotify.com/dashboard and log in
2. create an app, or select an existing one
3. copy its Client ID and Client secret into CLIENT_ID and CLIENT_SECRET in the secrets file";

pub struct Client {
    http: HttpClient,
    token_url: String,
}

impl Client {
    pub fn new(http: HttpClient) -> Self {
        Client {
            http,
            token_url: TOKEN_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub async fn client_credentials_grant(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<AccessToken, AuthError> {
        const GRANT_TYPE: &str = "client_credentials";

        let req = self
            .http
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", GRANT_TYPE)]);
        let rsp = token::exchange(req, GRANT_TYPE).await?;
        Ok(rsp.into_access_token(Utc::now()))
    }

    /// Fails without touching the network if the client id or secret is
    /// missing.
    pub async fn obtain_access_token(
        &self,
        secrets: &SpotifySecrets,
    ) -> Result<AccessToken, AuthError> {
        let credentials =
            ClientCredentials::from_fields(&secrets.client_id, &secrets.client_secret)?;
        self.client_credentials_grant(&credentials).await
    }
}
