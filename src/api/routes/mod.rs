//! API route modules.

pub mod subscriptions;
pub mod webhook;
