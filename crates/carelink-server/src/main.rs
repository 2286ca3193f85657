use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use carelink_api::auth::{self, AppState, AppStateInner};
use carelink_api::blobs::{self, MAX_BLOB_SIZE};
use carelink_api::middleware::require_auth;
use carelink_api::session::SessionAuthority;
use carelink_api::{connections, media, messages, profile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carelink=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CARELINK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let token_ttl_days: i64 = std::env::var("CARELINK_TOKEN_TTL_DAYS")
        .unwrap_or_else(|_| "7".into())
        .parse()?;
    let db_path = std::env::var("CARELINK_DB_PATH").unwrap_or_else(|_| "carelink.db".into());
    let media_dir =
        PathBuf::from(std::env::var("CARELINK_MEDIA_DIR").unwrap_or_else(|_| "./uploads".into()));
    let host = std::env::var("CARELINK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CARELINK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = carelink_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state; the signing secret is injected here and nowhere else
    let sessions = SessionAuthority::new(&jwt_secret, token_ttl_days);
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        sessions,
        media_dir: media_dir.clone(),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/connections", post(connections::connect))
        .route("/contacts", get(connections::contacts))
        .route("/accounts/search", get(profile::search))
        .route("/accounts/{account_id}", get(profile::get_profile))
        .route("/accounts/{account_id}", put(profile::update_profile))
        .route("/messages", post(messages::send_message))
        .route("/messages/unread", get(messages::list_unread))
        .route("/messages/{contact_id}", get(messages::list_messages))
        .route("/messages/{message_id}/read", post(messages::mark_read))
        .route("/media", post(media::upload_media))
        .route(
            "/media/blob",
            post(blobs::upload_blob).layer(DefaultBodyLimit::max(MAX_BLOB_SIZE)),
        )
        .route("/media/recent", get(media::list_recent))
        .route("/media/{contact_id}", get(media::list_media))
        .route("/media/{media_id}/read", post(media::mark_read))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&media_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Carelink server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
