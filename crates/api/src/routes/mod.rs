//! HTTP route handlers.

pub mod health;
pub mod notifications;
pub mod settings;
pub mod templates;
pub mod versions;
