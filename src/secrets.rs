//! Secrets files: the JSON records holding each provider's static
//! credentials, and the adapter that reads and rewrites them on disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

pub const CLIENT_ID: &str = "CLIENT_ID";
pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const ACCESS_CODE: &str = "ACCESS_CODE";
pub const REFRESH_TOKEN: &str = "REFRESH_TOKEN";

/// Contents of the Dropbox secrets file.
///
/// Keys this crate does not know about are kept in `extra` so that rewriting
/// the file after authorization does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DropboxSecrets {
    #[serde(rename = "CLIENT_ID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(rename = "CLIENT_SECRET", default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// One-time code copied from the browser after approving the app.
    #[serde(rename = "ACCESS_CODE", default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(rename = "REFRESH_TOKEN", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DropboxSecrets {
    /// Returns the record to persist after a successful authorization: the
    /// refresh token replaces the access code, which cannot be used twice.
    pub fn with_refresh_token(self, refresh_token: impl Into<String>) -> Self {
        DropboxSecrets {
            access_code: None,
            refresh_token: Some(refresh_token.into()),
            ..self
        }
    }
}

/// Contents of the Spotify secrets file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifySecrets {
    #[serde(rename = "CLIENT_ID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(rename = "CLIENT_SECRET", default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An app's client id and secret, both known to be non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn from_fields(
        client_id: &Option<String>,
        client_secret: &Option<String>,
    ) -> Result<Self, AuthError> {
        Ok(ClientCredentials {
            client_id: required(client_id, CLIENT_ID)?,
            client_secret: required(client_secret, CLIENT_SECRET)?,
        })
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Returns the value of a secrets field, treating an empty string the same
/// as an absent key.
pub(crate) fn required(value: &Option<String>, key: &'static str) -> Result<String, AuthError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AuthError::MissingCredential(key)),
    }
}

/// Persists Dropbox secrets after the first authorization.
pub trait SecretsStore {
    fn save(&self, secrets: &DropboxSecrets) -> Result<(), AuthError>;
}

/// A secrets file on disk.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load<T: DeserializeOwned>(&self) -> Result<T, AuthError> {
        let content = fs::read_to_string(&self.path).map_err(|source| AuthError::ReadSecrets {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| AuthError::ParseSecrets {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the whole file with `value`.
    pub fn write<T: Serialize>(&self, value: &T) -> Result<(), AuthError> {
        let mut content = serde_json::to_string_pretty(value).map_err(AuthError::EncodeSecrets)?;
        content.push('\n');
        fs::write(&self.path, content).map_err(|source| self.write_error(source))?;

        // the file holds a long-lived refresh token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|source| self.write_error(source))?;
        }

        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> AuthError {
        AuthError::WriteSecrets {
            path: self.path.clone(),
            source,
        }
    }
}

impl SecretsStore for JsonFile {
    fn save(&self, secrets: &DropboxSecrets) -> Result<(), AuthError> {
        self.write(secrets)?;
        info!("saved refresh token to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_dropbox_secrets() {
        let s: DropboxSecrets = serde_json::from_value(json!({
            "CLIENT_ID": "app-key",
            "CLIENT_SECRET": "app-secret",
            "ACCESS_CODE": "code",
            "NOTE": "personal app",
        }))
        .unwrap();

        assert_eq!(s.client_id.as_deref(), Some("app-key"));
        assert_eq!(s.client_secret.as_deref(), Some("app-secret"));
        assert_eq!(s.access_code.as_deref(), Some("code"));
        assert_eq!(s.refresh_token, None);
        assert_eq!(s.extra.get("NOTE"), Some(&json!("personal app")));
    }

    #[test]
    fn null_fields_are_absent() {
        let s: SpotifySecrets =
            serde_json::from_value(json!({"CLIENT_ID": null, "CLIENT_SECRET": "x"})).unwrap();
        assert_eq!(s.client_id, None);
    }

    #[test]
    fn with_refresh_token_drops_access_code() {
        let s = DropboxSecrets {
            client_id: Some("app-key".into()),
            client_secret: Some("app-secret".into()),
            access_code: Some("code".into()),
            ..Default::default()
        };

        let s = s.with_refresh_token("refresh");
        assert_eq!(s.access_code, None);
        assert_eq!(s.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(s.client_id.as_deref(), Some("app-key"));

        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(
            v,
            json!({
                "CLIENT_ID": "app-key",
                "CLIENT_SECRET": "app-secret",
                "REFRESH_TOKEN": "refresh",
            })
        );
    }

    #[test]
    fn empty_field_is_missing() {
        let e = ClientCredentials::from_fields(&Some("id".into()), &Some(String::new()))
            .unwrap_err();
        assert!(matches!(e, AuthError::MissingCredential(CLIENT_SECRET)));

        let e = ClientCredentials::from_fields(&None, &None).unwrap_err();
        assert!(matches!(e, AuthError::MissingCredential(CLIENT_ID)));
    }

    #[test]
    fn debug_hides_client_secret() {
        let c = ClientCredentials::from_fields(&Some("id".into()), &Some("hunter2".into()))
            .unwrap();
        let s = format!("{:?}", c);
        assert!(s.contains("id"));
        assert!(!s.contains("hunter2"));
    }

    #[test]
    fn json_file_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("secrets.json"));

        let mut s = DropboxSecrets::default().with_refresh_token("refresh");
        s.extra.insert("NOTE".into(), json!(1));
        file.save(&s).unwrap();

        let loaded: DropboxSecrets = file.load().unwrap();
        assert_eq!(loaded, s);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(file.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn load_errors_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = JsonFile::new(dir.path().join("nope.json"));
        let e = missing.load::<SpotifySecrets>().unwrap_err();
        assert!(matches!(e, AuthError::ReadSecrets { .. }));
        assert!(e.is_config());

        let path = dir.path().join("bad.json");
        fs::write(&path, "{ CLIENT_ID: ").unwrap();
        let e = JsonFile::new(path).load::<SpotifySecrets>().unwrap_err();
        assert!(matches!(e, AuthError::ParseSecrets { .. }));
        assert!(e.is_config());
    }
}
