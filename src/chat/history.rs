use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower_sessions::Session;

use crate::session::USERNAME;
use crate::AppResult;

use super::relay::Relay;
use super::store::HistoryEntry;

/// Full conversation between the session user and `{user}`, oldest first.
/// An unauthenticated caller gets an empty list, not an error.
#[axum::debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    State(relay): State<Relay>,
    session: Session,
    Path(user): Path<String>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    let Some(current) = session.get::<String>(USERNAME).await? else {
        return Ok(Json(Vec::new()));
    };

    let user = user.to_lowercase();
    Ok(Json(relay.store().history(&current, &user).await?))
}

/// Mark everything `{user}` sent to the session user as read.
#[axum::debug_handler(state = crate::AppState)]
pub(crate) async fn mark_read(
    State(relay): State<Relay>,
    session: Session,
    Path(user): Path<String>,
) -> AppResult<Response> {
    let Some(current) = session.get::<String>(USERNAME).await? else {
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    };

    relay.on_mark_read(&current, &user.to_lowercase()).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
