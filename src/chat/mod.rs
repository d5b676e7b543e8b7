pub mod event;
pub mod relay;
pub mod store;

mod history;
mod ws;

use axum::{Router, routing::{get, post}};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::chat_ws))
        .route("/history/{user}", get(history::history))
        .route("/mark-read/{user}", post(history::mark_read))
}
