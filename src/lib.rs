//! Telegram session-string generator bot.
//!
//! Drives two account-authentication backends (Telethon-style and
//! Pyrogram-style) through a small per-chat conversation to produce an
//! authenticated session string that the user can paste into their own
//! scripts. The conversation logic lives in [`flow::controller`]; the
//! backends are adapters over `grammers-client` in [`backend`].

/// Account-authentication backends and the capability interface they share
pub mod backend;
/// Telegram command surface, keyboards, and message delivery
pub mod bot;
/// Configuration and settings management
pub mod config;
/// Conversation state machine and per-chat session records
pub mod flow;
