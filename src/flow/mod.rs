/// The conversation state machine
pub mod controller;
/// Per-chat session records and their store
pub mod session;
