//! Telethon-style login backend over `grammers-client`.
//!
//! The code-request artifact (the login token carrying the code hash) stays
//! inside the handle; sign-in only needs the code itself.

use super::{sessionstr, AuthBackend, AuthError, PendingLogin};
use async_trait::async_trait;
use grammers_client::session::Session;
use grammers_client::types::LoginToken;
use grammers_client::{Client, Config};
use tracing::{debug, info};

/// Telethon-style backend configuration
pub struct TelethonBackend {
    api_id: i32,
    api_hash: String,
}

impl TelethonBackend {
    /// New backend with the application credentials
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self { api_id, api_hash }
    }
}

#[async_trait]
impl AuthBackend for TelethonBackend {
    fn name(&self) -> &'static str {
        "telethon"
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
        debug!("telethon backend connected");

        // On failure the connection closes with the dropped client
        let token = client
            .request_login_code(phone)
            .await
            .map_err(|e| AuthError::CodeRequest(e.to_string()))?;

        Ok(Box::new(TelethonLogin {
            client: Some(client),
            token: Some(token),
        }))
    }
}

/// A pending Telethon-style login attempt
struct TelethonLogin {
    client: Option<Client>,
    token: Option<LoginToken>,
}

#[async_trait]
impl PendingLogin for TelethonLogin {
    async fn sign_in(&mut self, _phone: &str, code: &str) -> Result<(), AuthError> {
        let client = self.client.as_ref().ok_or_else(handle_closed)?;
        let token = self.token.as_ref().ok_or_else(handle_closed)?;
        client
            .sign_in(token, code)
            .await
            .map_err(|e| AuthError::SignIn(e.to_string()))?;
        info!("telethon sign-in complete");
        Ok(())
    }

    fn export_session(&self) -> Result<String, AuthError> {
        let client = self.client.as_ref().ok_or_else(handle_closed)?;
        Ok(sessionstr::encode_telethon(&client.session().save()))
    }

    async fn teardown(&mut self) {
        self.token = None;
        // grammers closes the connection when the last client clone drops
        if self.client.take().is_some() {
            debug!("telethon login handle closed");
        }
    }
}

fn handle_closed() -> AuthError {
    AuthError::SignIn("login handle already closed".into())
}
