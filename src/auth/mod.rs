//! Account gateway: signup, login, logout. The relay never sees
//! credentials; identity reaches it only through the session.

mod login;
mod logout;
mod signup;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::post};
use serde::Deserialize;

use crate::AppState;

pub use signup::create_user;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup::signup))
        .route("/login", post(login::login))
        .route("/logout", post(logout::logout))
}

#[derive(Debug, Deserialize)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

/// Duplicate identity is a routine collision and gets its own variant
/// instead of riding an error escape hatch; login failure is one uniform
/// rejection regardless of which check failed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username already exists")]
    DuplicateIdentity,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::DuplicateIdentity => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Db(_) | Self::Hash(_) | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
