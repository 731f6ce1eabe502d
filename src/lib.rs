//! OAuth2 token clients for Dropbox and Spotify.
//!
//! Each provider module is self-contained; they share only the error type,
//! the secrets-file plumbing and the token endpoint response model.

pub mod dropbox;
pub mod error;
pub mod secrets;
pub mod spotify;
pub mod token;

pub use error::AuthError;
pub use token::AccessToken;
