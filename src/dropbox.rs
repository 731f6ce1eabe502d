//! Dropbox token client.
//!
//! The first run trades the one-time access code for a refresh token, which
//! is written back to the secrets file. Every later run trades the stored
//! refresh token for a short-lived access token.

use chrono::Utc;
use log::debug;
use reqwest::Client as HttpClient;

use crate::error::AuthError;
use crate::secrets::{self, ClientCredentials, DropboxSecrets, SecretsStore, ACCESS_CODE};
use crate::token::{self, AccessToken, TokenPair};

pub const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

const AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";

pub const ACCESS_CODE_INSTRUCTIONS: &str = r"1. open the authorize URL in a browser
2. approve the requested permissions for the app
3. copy the access code shown at the end and store it in ACCESS_CODE in the secrets file
4. set CLIENT_ID and CLIENT_SECRET to the App key and App secret from the Dropbox app console
the access code can be used only once; if authorization fails, get a new code before retrying";

/// URL an operator visits to approve the app and obtain an access code.
/// `token_access_type=offline` makes Dropbox issue a refresh token with
/// the first access token.
pub fn authorize_url(client_id: &str) -> String {
    format!(
        "{}?client_id={}&response_type=code&token_access_type=offline",
        AUTHORIZE_URL, client_id
    )
}

/// Where the app stands with Dropbox, as recorded in the secrets file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No refresh token yet; the access code must be exchanged.
    Unauthorized {
        credentials: ClientCredentials,
        code: String,
    },
    Authorized {
        credentials: ClientCredentials,
        refresh_token: String,
    },
}

impl AuthState {
    pub fn from_secrets(s: &DropboxSecrets) -> Result<Self, AuthError> {
        let credentials = ClientCredentials::from_fields(&s.client_id, &s.client_secret)?;

        match s.refresh_token.as_deref() {
            Some(rt) if !rt.is_empty() => Ok(AuthState::Authorized {
                credentials,
                refresh_token: rt.to_string(),
            }),
            _ => Ok(AuthState::Unauthorized {
                credentials,
                code: secrets::required(&s.access_code, ACCESS_CODE)?,
            }),
        }
    }
}

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

    /// Exchanges a one-time access code for an access token and a refresh
    /// token.
    pub async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<TokenPair, AuthError> {
        const GRANT_TYPE: &str = "authorization_code";

        let req = self.http.post(&self.token_url).form(&[
            ("code", code),
            ("grant_type", GRANT_TYPE),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ]);
        let mut rsp = token::exchange(req, GRANT_TYPE).await?;

        let refresh_token = rsp
            .refresh_token
            .take()
            .filter(|rt| !rt.is_empty())
            .ok_or(AuthError::MissingRefreshToken)?;
        Ok(TokenPair {
            access_token: rsp.into_access_token(Utc::now()),
            refresh_token,
        })
    }

    /// Exchanges a refresh token for a new access token. Dropbox does not
    /// rotate the refresh token.
    pub async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<AccessToken, AuthError> {
        const GRANT_TYPE: &str = "refresh_token";

        let req = self.http.post(&self.token_url).form(&[
            ("refresh_token", refresh_token),
            ("grant_type", GRANT_TYPE),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ]);
        let rsp = token::exchange(req, GRANT_TYPE).await?;
        Ok(rsp.into_access_token(Utc::now()))
    }

    /// Resolves an access token from the secrets, performing exactly one
    /// exchange. On the first run the new refresh token is handed to
    /// `store`; otherwise `store` is not used. If `store` fails, the issued
    /// tokens travel back in `AuthError::RefreshTokenNotSaved`.
    pub async fn obtain_access_token<S: SecretsStore + ?Sized>(
        &self,
        secrets: &DropboxSecrets,
        store: &S,
    ) -> Result<AccessToken, AuthError> {
        match AuthState::from_secrets(secrets)? {
            AuthState::Unauthorized { credentials, code } => {
                debug!("no refresh token stored, exchanging access code");
                let pair = self.exchange_code(&credentials, &code).await?;
                let updated = secrets.clone().with_refresh_token(pair.refresh_token.clone());
                match store.save(&updated) {
                    Ok(()) => Ok(pair.access_token),
                    Err(e) => Err(AuthError::RefreshTokenNotSaved {
                        pair,
                        source: Box::new(e),
                    }),
                }
            }
            AuthState::Authorized {
                credentials,
                refresh_token,
            } => self.refresh(&credentials, &refresh_token).await,
        }
    }
}
