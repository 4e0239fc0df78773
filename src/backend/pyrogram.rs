//! Pyrogram-style login backend over `grammers-client`.
//!
//! Pyrogram's `sign_in(phone_number, phone_code_hash, phone_code)` echoes the
//! code-request identity back when completing the login. The transport client
//! keeps the `phone_code_hash` inside its login token, so the echo collapses
//! to verifying the phone against the pending code request; a mismatch is a
//! sign-in failure, as it would be upstream.

use super::{sessionstr, AuthBackend, AuthError, PendingLogin};
use async_trait::async_trait;
use grammers_client::session::Session;
use grammers_client::types::LoginToken;
use grammers_client::{Client, Config};
use tracing::{debug, info};

/// Pyrogram-style backend configuration
pub struct PyrogramBackend {
    api_id: i32,
    api_hash: String,
}

impl PyrogramBackend {
    /// New backend with the application credentials
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self { api_id, api_hash }
    }
}

#[async_trait]
impl AuthBackend for PyrogramBackend {
    fn name(&self) -> &'static str {
        "pyrogram"
    }

    async fn request_code(&self, phone: &str) -> Result<Box<dyn PendingLogin>, AuthError> {
        let client = Client::connect(Config {
            session: Session::new(),
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: Default::default(),
        })
        .await
        .map_err(|e| AuthError::CodeRequest(e.to_string()))?;
        debug!("pyrogram backend connected");

        let token = client
            .request_login_code(phone)
            .await
            .map_err(|e| AuthError::CodeRequest(e.to_string()))?;

        Ok(Box::new(PyrogramLogin {
            client: Some(client),
            token: Some(token),
            phone: phone.trim().to_string(),
        }))
    }
}

/// A pending Pyrogram-style login attempt
struct PyrogramLogin {
    client: Option<Client>,
    token: Option<LoginToken>,
    /// Phone the code was requested for; sign-in must echo it back
    phone: String,
}

#[async_trait]
impl PendingLogin for PyrogramLogin {
    async fn sign_in(&mut self, phone: &str, code: &str) -> Result<(), AuthError> {
        if phone.trim() != self.phone {
            return Err(AuthError::SignIn(
                "phone number does not match the pending code request".into(),
            ));
        }
        let client = self.client.as_ref().ok_or_else(handle_closed)?;
        let token = self.token.as_ref().ok_or_else(handle_closed)?;
        client
            .sign_in(token, code)
            .await
            .map_err(|e| AuthError::SignIn(e.to_string()))?;
        info!("pyrogram sign-in complete");
        Ok(())
    }

    fn export_session(&self) -> Result<String, AuthError> {
        let client = self.client.as_ref().ok_or_else(handle_closed)?;
        Ok(sessionstr::encode_pyrogram(&client.session().save()))
    }

    async fn teardown(&mut self) {
        self.token = None;
        if self.client.take().is_some() {
            debug!("pyrogram login handle closed");
        }
    }
}

fn handle_closed() -> AuthError {
    AuthError::SignIn("login handle already closed".into())
}
