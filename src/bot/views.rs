//! Conversation UI components
//!
//! Contains keyboards and all user-facing message texts. Replies use HTML
//! formatting; anything that can carry backend-provided or secret content is
//! escaped here.

use crate::backend::BackendKind;
use teloxide::types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};

/// Cancel button label; also recognized as a cancel trigger in any state
pub const CANCEL_LABEL: &str = "❌ Cancel";
/// Retry button label; also recognized as a restart trigger in any state
pub const AGAIN_LABEL: &str = "🔁 Again";

/// Prompt shown on `/start`
pub const WELCOME: &str = "Welcome! Please select a library:";
/// Prompt shown on `/generate`
pub const GENERATE_PROMPT: &str = "Let's generate a string!\nPlease select a library:";
/// Prompt shown on `/again` or the retry button
pub const AGAIN_PROMPT: &str = "Let's try again!\nPlease select a library:";
/// Asked after a backend has been picked
pub const PHONE_PROMPT: &str = "Enter your phone number (e.g., +911234567890):";
/// Asked after the verification code was sent
pub const CODE_PROMPT: &str = "Code sent! Now enter the code you received:";
/// Re-prompt for an unrecognized picker option
pub const INVALID_CHOICE: &str = "Please choose a valid option.";
/// Confirmation after cancelling
pub const CANCELLED: &str = "❌ Cancelled.";
/// Generic code-request failure; the detail goes to the logs, not the user
pub const UNEXPECTED_ERROR: &str = "❌ Unexpected Error. Try again";

/// Static help text: commands plus the 4-step flow
pub const HELP_MESSAGE: &str = "🤖 <b>Telegram Session Generator Help</b>\n\n\
This bot helps you generate session strings for <b>Telethon</b> and <b>Pyrogram</b> scripts.\n\n\
📋 <b>Available Commands:</b>\n\
/start – Start the bot and choose between Telethon or Pyrogram\n\
/generate – Begin the session string generation process\n\
/cancel – Cancel the current operation at any time\n\
/again – Restart from the library choice\n\
/help – Show this help message\n\n\
💡 <b>How It Works:</b>\n\
1. Choose the library: ⚡ Telethon or 🔥 Pyrogram\n\
2. Enter your phone number (e.g., <code>+911234567890</code>)\n\
3. Enter the verification code sent to your Telegram app\n\
4. You'll receive your session string to use in your scripts\n\n\
⚠️ <b>Note:</b> Keep your session string private. It grants full access to your Telegram account.\n\n\
Built with ❤️ for developers.";

/// Sign-in failure with the backend's error detail inline
#[must_use]
pub fn signin_error(detail: &str) -> String {
    format!("❌ Error: {}", html_escape::encode_text(detail))
}

/// The exported session string in a copyable code block
#[must_use]
pub fn session_string(kind: BackendKind, session: &str) -> String {
    format!(
        "✅ <b>{} session string:</b>\n<code>{}</code>",
        kind.name(),
        html_escape::encode_text(session)
    )
}

/// Two-option backend picker keyboard
#[must_use]
pub fn backend_keyboard() -> ReplyMarkup {
    let rows: Vec<Vec<KeyboardButton>> = BackendKind::ALL
        .into_iter()
        .map(|kind| vec![KeyboardButton::new(kind.label())])
        .collect();
    ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
}

/// Single cancel button, shown during data entry
#[must_use]
pub fn cancel_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(
        KeyboardMarkup::new([[KeyboardButton::new(CANCEL_LABEL)]]).resize_keyboard(),
    )
}

/// Single retry button, shown after a completed attempt
#[must_use]
pub fn again_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(
        KeyboardMarkup::new([[KeyboardButton::new(AGAIN_LABEL)]]).resize_keyboard(),
    )
}

/// Remove the custom keyboard
#[must_use]
pub fn remove_keyboard() -> ReplyMarkup {
    ReplyMarkup::KeyboardRemove(KeyboardRemove::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_string_is_escaped_code_block() {
        let text = session_string(BackendKind::Telethon, "abc<def>");
        assert!(text.contains("<code>abc&lt;def&gt;</code>"));
        assert!(text.contains("Telethon"));
    }

    #[test]
    fn test_signin_error_escapes_detail() {
        let text = signin_error("<b>boom</b>");
        assert!(!text.contains("<b>boom</b>"));
        assert!(text.starts_with("❌ Error: "));
    }
}
