//! Wire events, JSON text frames tagged by `type`.

use serde::{Deserialize, Serialize};

/// Events a client may send once its connection is registered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    PrivateMessage {
        receiver: String,
        body: String,
    },
    /// `stop` distinguishes "started typing" from "stopped typing".
    Typing {
        receiver: String,
        #[serde(default)]
        stop: bool,
    },
}

/// Events pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full snapshot of who is online, sent on every presence change.
    UserList { users: Vec<String> },
    /// A delivered (or echoed) private message. `created_at` is RFC 3339.
    PrivateMessage {
        sender: String,
        body: String,
        created_at: String,
    },
    Typing { sender: String, stop: bool },
    /// Reported to the offending sender only.
    Error { message: String },
}
