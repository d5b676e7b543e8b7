use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower_sessions::Session;

use crate::AppResult;

#[axum::debug_handler(state = crate::AppState)]
pub(crate) async fn logout(session: Session) -> AppResult<Response> {
    session.clear().await;
    Ok(StatusCode::NO_CONTENT.into_response())
}
