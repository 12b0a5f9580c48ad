//! Stay Beautifully Positive client shell library exports.

pub mod config;
pub mod error;
pub mod notifications;
pub mod state;
pub mod telemetry;
