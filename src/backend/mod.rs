//! Account-authentication backends.
//!
//! The conversation controller is backend-agnostic: it talks to the two
//! supported client-library flavours through the [`AuthBackend`] /
//! [`PendingLogin`] capability interface, so tests can drive the whole flow
//! with a mock implementation.

/// Pyrogram-style login adapter
pub mod pyrogram;
/// Portable session-string envelopes
pub mod sessionstr;
/// Telethon-style login adapter
pub mod telethon;

use crate::config::Settings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Which client-library flavour performs the login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Telethon-style: the code-request artifact stays inside the handle
    Telethon,
    /// Pyrogram-style: sign-in echoes the code-request identity back
    Pyrogram,
}

impl BackendKind {
    /// Both flavours, in picker order
    pub const ALL: [Self; 2] = [Self::Telethon, Self::Pyrogram];

    /// User-facing keyboard label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Telethon => "⚡ Telethon",
            Self::Pyrogram => "🔥 Pyrogram",
        }
    }

    /// Plain name for logs and reply text
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Telethon => "Telethon",
            Self::Pyrogram => "Pyrogram",
        }
    }

    /// Map a picker button press back to a flavour
    #[must_use]
    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == text.trim())
    }
}

/// Closed set of login failure categories
///
/// `CodeRequest` covers everything that can go wrong while opening the
/// connection and requesting a verification code (bad phone, network, rate
/// limit); `SignIn` covers completing the login (wrong code, expired code,
/// mismatched code-request identity).
#[derive(Debug, Error)]
pub enum AuthError {
    /// Requesting the verification code failed
    #[error("code request failed: {0}")]
    CodeRequest(String),
    /// Completing the sign-in failed
    #[error("sign-in failed: {0}")]
    SignIn(String),
}

impl AuthError {
    /// The backend's error detail, without the category prefix
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::CodeRequest(detail) | Self::SignIn(detail) => detail,
        }
    }
}

/// Unified interface over the two account-authentication libraries
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Open a fresh connection and request a verification code for `phone`.
    ///
    /// On success the returned handle owns the open connection and the
    /// code-request artifact. On failure any partially-opened connection has
    /// already been closed.
    async fn request_code(&self, phone: &str) -> Result<Box<dyn PendingLogin>, AuthError>;
}

/// A live login attempt: an open connection plus the code-request artifact.
///
/// The controller invokes [`PendingLogin::teardown`] exactly once per handle,
/// on every exit path; implementations must also tolerate repeated calls.
#[async_trait]
pub trait PendingLogin: Send {
    /// Complete the login with the verification code the user received
    async fn sign_in(&mut self, phone: &str, code: &str) -> Result<(), AuthError>;

    /// Serialize the authenticated session as a portable string
    fn export_session(&self) -> Result<String, AuthError>;

    /// Close the underlying connection
    async fn teardown(&mut self);
}

/// The two configured backends, selectable per conversation
#[derive(Clone)]
pub struct Backends {
    telethon: Arc<dyn AuthBackend>,
    pyrogram: Arc<dyn AuthBackend>,
}

impl Backends {
    /// Assemble a registry from explicit backend instances
    #[must_use]
    pub fn new(telethon: Arc<dyn AuthBackend>, pyrogram: Arc<dyn AuthBackend>) -> Self {
        Self { telethon, pyrogram }
    }

    /// The production registry: both flavours over `grammers-client`
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(telethon::TelethonBackend::new(
                settings.api_id,
                settings.api_hash.clone(),
            )),
            Arc::new(pyrogram::PyrogramBackend::new(
                settings.api_id,
                settings.api_hash.clone(),
            )),
        )
    }

    /// Backend for the given flavour
    #[must_use]
    pub fn get(&self, kind: BackendKind) -> Arc<dyn AuthBackend> {
        match kind {
            BackendKind::Telethon => self.telethon.clone(),
            BackendKind::Pyrogram => self.pyrogram.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for kind in BackendKind::ALL {
            assert_eq!(BackendKind::from_label(kind.label()), Some(kind));
        }
    }

    #[test]
    fn test_label_trims_whitespace() {
        assert_eq!(
            BackendKind::from_label("  ⚡ Telethon \n"),
            Some(BackendKind::Telethon)
        );
    }

    #[test]
    fn test_unknown_label_rejected() {
        assert_eq!(BackendKind::from_label("telethon"), None);
        assert_eq!(BackendKind::from_label(""), None);
    }

    #[test]
    fn test_error_detail_strips_category() {
        let err = AuthError::SignIn("PHONE_CODE_INVALID".into());
        assert_eq!(err.detail(), "PHONE_CODE_INVALID");
        assert!(err.to_string().starts_with("sign-in failed"));
    }
}
