//! The conversation controller.
//!
//! A per-chat finite-state machine, transport-agnostic by design: inbound
//! events arrive as [`ControlInput`] values and replies leave as [`Reply`]
//! values with an abstract keyboard choice, so the whole flow is testable
//! against a mock backend without a Telegram connection.

use crate::backend::{BackendKind, Backends};
use crate::bot::views;
use crate::flow::session::{FlowState, SessionStore};
use std::time::Duration;
use tracing::{error, info, warn};

/// Inbound event, already stripped of transport details
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlInput {
    /// `/start`
    Start,
    /// `/generate`
    Generate,
    /// `/cancel`
    Cancel,
    /// `/again`
    Again,
    /// `/help`
    Help,
    /// Plain conversational text
    Text(String),
}

/// Reply keyboard to attach to an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Two-option backend picker
    BackendPicker,
    /// Single cancel button, shown during data entry
    Cancel,
    /// Single retry button, shown after a completed attempt
    Again,
    /// Remove the custom keyboard
    Remove,
    /// Leave whatever keyboard is currently shown
    Inherit,
}

/// Outbound reply produced by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTML-formatted message text
    pub text: String,
    /// Keyboard to attach
    pub keyboard: Keyboard,
}

impl Reply {
    fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }
}

/// Per-chat finite-state machine driving the login backends
pub struct ConversationController {
    backends: Backends,
    sessions: SessionStore,
}

impl ConversationController {
    /// New controller over the given backend registry
    #[must_use]
    pub fn new(backends: Backends) -> Self {
        Self {
            backends,
            sessions: SessionStore::new(),
        }
    }

    /// Current conversation state for a chat
    pub async fn state_of(&self, chat_id: i64) -> FlowState {
        self.sessions.state_of(chat_id).await
    }

    /// Process one inbound event for a chat.
    ///
    /// `None` means the event needs no reply (plain text while idle, or a
    /// conversation that was cancelled while a backend call was in flight).
    pub async fn handle(&self, chat_id: i64, input: ControlInput) -> Option<Reply> {
        match input {
            ControlInput::Help => Some(Reply::new(views::HELP_MESSAGE, Keyboard::Inherit)),
            ControlInput::Start => Some(self.enter_selection(chat_id, views::WELCOME).await),
            ControlInput::Generate => {
                Some(self.enter_selection(chat_id, views::GENERATE_PROMPT).await)
            }
            ControlInput::Again => Some(self.enter_selection(chat_id, views::AGAIN_PROMPT).await),
            ControlInput::Cancel => Some(self.cancel(chat_id).await),
            ControlInput::Text(text) => self.handle_text(chat_id, text).await,
        }
    }

    /// Tear down and clear every conversation idle for at least `max_idle`,
    /// returning how many were expired
    pub async fn expire_idle(&self, max_idle: Duration) -> usize {
        let expired = self.sessions.drain_idle(max_idle).await;
        let count = expired.len();
        for (chat_id, pending) in expired {
            if let Some(mut pending) = pending {
                pending.teardown().await;
            }
            info!(chat_id, "conversation expired after inactivity");
        }
        count
    }

    async fn handle_text(&self, chat_id: i64, text: String) -> Option<Reply> {
        let text = text.trim().to_string();

        // The keyboard button labels double as cancel/retry triggers and are
        // intercepted before any state can read them as phone or code
        if text == views::CANCEL_LABEL {
            return Some(self.cancel(chat_id).await);
        }
        if text == views::AGAIN_LABEL {
            return Some(self.enter_selection(chat_id, views::AGAIN_PROMPT).await);
        }

        match self.sessions.state_of(chat_id).await {
            FlowState::Idle => None,
            FlowState::SelectingBackend => Some(self.choose_backend(chat_id, &text).await),
            FlowState::AwaitingPhone => self.submit_phone(chat_id, text).await,
            FlowState::AwaitingCode => self.submit_code(chat_id, &text).await,
        }
    }

    /// Enter (or re-enter) the backend-selection step with the given prompt
    async fn enter_selection(&self, chat_id: i64, prompt: &str) -> Reply {
        if let Some(mut pending) = self.sessions.begin(chat_id).await {
            pending.teardown().await;
            info!(chat_id, "tore down pending login on conversation restart");
        }
        Reply::new(prompt, Keyboard::BackendPicker)
    }

    async fn cancel(&self, chat_id: i64) -> Reply {
        if let Some(mut pending) = self.sessions.clear(chat_id).await {
            pending.teardown().await;
        }
        info!(chat_id, "conversation cancelled");
        Reply::new(views::CANCELLED, Keyboard::Remove)
    }

    async fn choose_backend(&self, chat_id: i64, text: &str) -> Reply {
        let Some(kind) = BackendKind::from_label(text) else {
            // Invalid option: re-prompt, state unchanged
            self.sessions
                .with_record(chat_id, |record| record.touch())
                .await;
            return Reply::new(views::INVALID_CHOICE, Keyboard::Cancel);
        };
        self.sessions
            .with_record(chat_id, |record| {
                record.backend = Some(kind);
                record.state = FlowState::AwaitingPhone;
                record.touch();
            })
            .await;
        info!(chat_id, backend = kind.name(), "backend selected");
        Reply::new(views::PHONE_PROMPT, Keyboard::Cancel)
    }

    async fn submit_phone(&self, chat_id: i64, phone: String) -> Option<Reply> {
        let kind = self
            .sessions
            .with_record(chat_id, |record| {
                record.phone = Some(phone.clone());
                record.touch();
                record.backend
            })
            .await
            .flatten()?;

        info!(chat_id, backend = kind.name(), "requesting verification code");
        match self.backends.get(kind).request_code(&phone).await {
            Ok(pending) => match self.sessions.attach_pending(chat_id, pending).await {
                Ok(stale) => {
                    if let Some(mut stale) = stale {
                        warn!(chat_id, "replaced a stale pending login");
                        stale.teardown().await;
                    }
                    Some(Reply::new(views::CODE_PROMPT, Keyboard::Cancel))
                }
                Err(mut pending) => {
                    // Cancelled while the code request was on the wire; the
                    // cancel already answered the user
                    pending.teardown().await;
                    info!(chat_id, "discarded login requested for a cancelled conversation");
                    None
                }
            },
            Err(err) => {
                if let Some(mut pending) = self.sessions.clear(chat_id).await {
                    pending.teardown().await;
                }
                error!(chat_id, backend = kind.name(), error = %err, "code request failed");
                Some(Reply::new(views::UNEXPECTED_ERROR, Keyboard::Remove))
            }
        }
    }

    async fn submit_code(&self, chat_id: i64, code: &str) -> Option<Reply> {
        let taken = self
            .sessions
            .with_record(chat_id, |record| {
                record.touch();
                (record.pending.take(), record.backend, record.phone.take())
            })
            .await?;

        let (pending, kind, phone) = taken;
        let (Some(mut pending), Some(kind), Some(phone)) = (pending, kind, phone) else {
            // A half-populated record cannot complete a login
            if let Some(mut leftover) = self.sessions.clear(chat_id).await {
                leftover.teardown().await;
            }
            error!(chat_id, "code submitted without a pending login");
            return Some(Reply::new(
                views::signin_error("no pending login for this chat"),
                Keyboard::Remove,
            ));
        };

        match pending.sign_in(&phone, code).await {
            Ok(()) => {
                let exported = pending.export_session();
                pending.teardown().await;
                self.sessions.clear(chat_id).await;
                match exported {
                    Ok(session) => {
                        info!(chat_id, backend = kind.name(), "session string exported");
                        Some(Reply::new(
                            views::session_string(kind, &session),
                            Keyboard::Again,
                        ))
                    }
                    Err(err) => {
                        error!(chat_id, backend = kind.name(), error = %err, "session export failed");
                        Some(Reply::new(
                            views::signin_error(err.detail()),
                            Keyboard::Remove,
                        ))
                    }
                }
            }
            Err(err) => {
                pending.teardown().await;
                self.sessions.clear(chat_id).await;
                warn!(chat_id, backend = kind.name(), error = %err, "sign-in failed");
                Some(Reply::new(
                    views::signin_error(err.detail()),
                    Keyboard::Remove,
                ))
            }
        }
    }
}
