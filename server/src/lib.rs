//! Backend for a link-in-bio page service.
//!
//! Accounts curate an ordered list of outbound links, customize their
//! public profile, and get a vanity path serving the active links. The
//! interesting part is the ordering protocol: the collection keeps a
//! race-tolerant display order under concurrent create, delete, toggle,
//! reorder and image-attach requests, with the bulk reorder applied
//! atomically so no reader sees a half-updated sequence.
//!
//!
//!
//! # Routes
//!
//! Authenticated (owner id from the `x-owner-id` header, installed by the
//! identity layer in front of this service):
//! - `POST /api/links` — append a link (`order` = current count)
//! - `GET /api/links` — dashboard list, inactive links included
//! - `PATCH /api/links/{id}` — partial update
//! - `POST /api/links/{id}/toggle` — flip visibility
//! - `DELETE /api/links/{id}` — delete, siblings keep their order
//! - `POST /api/links/reorder` — full-set reorder, all-or-nothing
//! - `PUT /api/user/username` — claim/change the vanity path
//! - `PATCH /api/user/profile`, `PATCH /api/user/colors`,
//!   `DELETE /api/user/background`, `DELETE /api/user/cursor`
//!
//! Public:
//! - `GET /api/profile/{username}` — active links + visible profile fields
//! - `GET /api/username/check?username=` — availability (rate limited)
//! - `POST /api/views/{username}` — view counter (rate limited,
//!   fire-and-forget)
//!
//!
//!
//! # Configuration
//!
//! - `RUST_PORT` — listen port, default 3000
//! - `REDIS_URL` — durable store; unset falls back to the in-memory
//!   store (single instance, not durable)
//! - `RUST_LOG` — tracing filter
//!
//!
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=info cargo run
//! ```
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::{delete, get, patch, post, put},
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod auth;
pub mod config;
pub mod error;
pub mod links;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod store;

use routes::{
    background_handler, claim_username_handler, colors_handler, create_link_handler,
    cursor_handler, delete_link_handler, links_handler, patch_link_handler, profile_handler,
    reorder_handler, toggle_link_handler, update_profile_handler, username_check_handler,
    views_handler,
};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);

    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(model::OWNER_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/links", post(create_link_handler).get(links_handler))
        .route("/api/links/reorder", post(reorder_handler))
        .route(
            "/api/links/{id}",
            patch(patch_link_handler).delete(delete_link_handler),
        )
        .route("/api/links/{id}/toggle", post(toggle_link_handler))
        .route("/api/username/check", get(username_check_handler))
        .route("/api/user/username", put(claim_username_handler))
        .route("/api/user/profile", patch(update_profile_handler))
        .route("/api/user/colors", patch(colors_handler))
        .route("/api/user/background", delete(background_handler))
        .route("/api/user/cursor", delete(cursor_handler))
        .route("/api/profile/{username}", get(profile_handler))
        .route("/api/views/{username}", post(views_handler))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
