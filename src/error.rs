use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::token::TokenPair;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required key in the secrets file is absent or empty.
    #[error("missing {0} in secrets file")]
    MissingCredential(&'static str),

    #[error("read secrets file {}", .path.display())]
    ReadSecrets {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse secrets file {}", .path.display())]
    ParseSecrets {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("write secrets file {}", .path.display())]
    WriteSecrets {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encode secrets")]
    EncodeSecrets(#[source] serde_json::Error),

    #[error("token request")]
    Transport(#[from] reqwest::Error),

    #[error("bad response status: {status}: {body}")]
    BadStatus { status: StatusCode, body: String },

    #[error("token response has no refresh_token")]
    MissingRefreshToken,

    /// The access code was exchanged but the new refresh token could not be
    /// persisted. The code is spent, so `pair` is the only copy of it.
    #[error("save refresh token")]
    RefreshTokenNotSaved {
        pair: TokenPair,
        #[source]
        source: Box<AuthError>,
    },
}

impl AuthError {
    /// Reports whether the error was raised before any network I/O because
    /// the secrets file is missing, malformed or incomplete.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredential(_)
                | AuthError::ReadSecrets { .. }
                | AuthError::ParseSecrets { .. }
        )
    }
}
