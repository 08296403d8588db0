//! Discussion board backend: ranked feeds, threaded comments, votes.
//!
//! # General Infrastructure
//! - Posts carry a decaying popularity score recomputed inline on every
//!   vote; there is no background ranking sweep
//! - Feeds and comment pages share one paginator: one-row lookahead for the
//!   end-of-results flag, id-keyset windows for chronological order, plain
//!   offsets for everything else
//! - The vote ledger keeps at most one row per (voter, target) and moves
//!   every aggregate counter by relative updates, so concurrent voters on
//!   the same target never lose increments
//!
//! Authentication, content sanitization, uploads and email live in front of
//! this service; requests arrive with a resolved user id and clean text.

use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod comments;
pub mod config;
pub mod content;
pub mod database;
pub mod error;
pub mod feed;
pub mod models;
pub mod pagination;
pub mod rank;
pub mod routes;
pub mod state;
pub mod votes;

use routes::{comments_handler, feed_handler, vote_handler};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/posts", get(feed_handler))
        .route("/posts/{post_id}/comments", get(comments_handler))
        .route("/votes", post(vote_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
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
