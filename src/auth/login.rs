use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bcrypt::verify;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::session::USERNAME;

use super::{AuthError, Credentials};

#[axum::debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(Credentials { username, password }): Form<Credentials>,
) -> Result<Response, AuthError> {
    let username = username.to_lowercase();

    let row: Option<(String,)> = sqlx::query_as("SELECT password FROM users WHERE username = ?")
        .bind(&username)
        .fetch_optional(&db_pool)
        .await?;
    let Some((hashed,)) = row else {
        return Err(AuthError::InvalidCredentials);
    };
    if !verify(&password, &hashed)? {
        return Err(AuthError::InvalidCredentials);
    }

    session.insert(USERNAME, &username).await?;
    info!(%username, "logged in");
    Ok(StatusCode::NO_CONTENT.into_response())
}
