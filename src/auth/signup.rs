use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bcrypt::{DEFAULT_COST, hash};
use sqlx::SqlitePool;
use tracing::info;

use super::{AuthError, Credentials};

#[axum::debug_handler(state = crate::AppState)]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    Form(Credentials { username, password }): Form<Credentials>,
) -> Result<Response, AuthError> {
    let username = username.to_lowercase();
    create_user(&db_pool, &username, &password).await?;
    info!(%username, "account created");
    Ok(StatusCode::CREATED.into_response())
}

pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<(), AuthError> {
    let hashed = hash(password, DEFAULT_COST)?;
    let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
        .bind(username)
        .bind(&hashed)
        .execute(pool)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) if err.as_database_error().is_some_and(|e| e.is_unique_violation()) => {
            Err(AuthError::DuplicateIdentity)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::migrate(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn duplicate_username_is_a_typed_rejection() {
        let pool = pool().await;
        create_user(&pool, "alice", "hunter2").await.unwrap();
        let err = create_user(&pool, "alice", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn stored_password_verifies() {
        let pool = pool().await;
        create_user(&pool, "alice", "hunter2").await.unwrap();

        let (hashed,): (String,) =
            sqlx::query_as("SELECT password FROM users WHERE username = ?")
                .bind("alice")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(bcrypt::verify("hunter2", &hashed).unwrap());
        assert!(!bcrypt::verify("wrong", &hashed).unwrap());
    }
}
