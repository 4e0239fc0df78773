/// Command surface and reply delivery
pub mod handlers;
/// Reply keyboards and user-facing message texts
pub mod views;
