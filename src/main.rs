use hushline::chat::relay::Relay;
use hushline::chat::store::MessageStore;
use hushline::presence::Presence;
use hushline::{AppState, auth, chat, db};

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hushline=debug,tower_http=info")),
        )
        .init();

    let database_url =
        dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:hushline.db?mode=rwc".to_owned());
    let db_pool = db::connect(&database_url).await?;
    info!(%database_url, "database ready");

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(12)));

    let relay = Relay::new(Presence::new(), MessageStore::new(db_pool.clone()));
    let app_state = AppState { db_pool, relay };

    let app = Router::new()
        .merge(auth::router())
        .merge(chat::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let bind_addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
