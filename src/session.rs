//! Session keys shared across handlers.

pub const USERNAME: &str = "username";
