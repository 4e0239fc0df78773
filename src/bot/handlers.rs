//! Telegram command surface and reply delivery.
//!
//! Thin layer between teloxide and the transport-agnostic
//! [`ConversationController`]: commands and text become [`ControlInput`]
//! values, and the controller's abstract keyboard choice is rendered into a
//! concrete reply markup here.

use crate::bot::views;
use crate::flow::controller::{ControlInput, ConversationController, Keyboard, Reply};
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode, ReplyMarkup};
use teloxide::utils::command::BotCommands;

/// Commands understood by the bot
#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Start the bot and choose a library
    Start,
    /// Begin the session string generation process
    Generate,
    /// Cancel the current operation
    Cancel,
    /// Restart from the library choice
    Again,
    /// Show the help message
    Help,
}

impl From<Command> for ControlInput {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Start => Self::Start,
            Command::Generate => Self::Generate,
            Command::Cancel => Self::Cancel,
            Command::Again => Self::Again,
            Command::Help => Self::Help,
        }
    }
}

/// Whether a message should be fed to the conversation as data.
///
/// Command-shaped text never reaches the state machine as a phone number or
/// code.
#[must_use]
pub fn is_conversational_text(msg: &Message) -> bool {
    msg.text()
        .is_some_and(|text| !text.trim_start().starts_with('/'))
}

/// Handle a recognized command
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    controller: Arc<ConversationController>,
) -> Result<()> {
    let reply = controller.handle(msg.chat.id.0, cmd.into()).await;
    deliver(&bot, msg.chat.id, reply).await
}

/// Handle plain conversational text
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let reply = controller
        .handle(msg.chat.id.0, ControlInput::Text(text.to_string()))
        .await;
    deliver(&bot, msg.chat.id, reply).await
}

async fn deliver(bot: &Bot, chat_id: ChatId, reply: Option<Reply>) -> Result<()> {
    let Some(reply) = reply else {
        return Ok(());
    };
    let request = bot
        .send_message(chat_id, reply.text)
        .parse_mode(ParseMode::Html);
    match markup_for(reply.keyboard) {
        Some(markup) => request.reply_markup(markup).await?,
        None => request.await?,
    };
    Ok(())
}

fn markup_for(keyboard: Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::BackendPicker => Some(views::backend_keyboard()),
        Keyboard::Cancel => Some(views::cancel_keyboard()),
        Keyboard::Again => Some(views::again_keyboard()),
        Keyboard::Remove => Some(views::remove_keyboard()),
        Keyboard::Inherit => None,
    }
}
