//! HTTP Surface
//!
//! The `/rooms` resource tree plus a health check. All room and
//! history endpoints require a bearer token resolved by the auth
//! extractor.

pub mod auth;
pub mod error;
pub mod rooms;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::conversation::ConversationService;
use crate::database::Database;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub service: Arc<ConversationService>,
}

impl AppState {
    pub fn new(db: Database, service: Arc<ConversationService>) -> Self {
        Self { db, service }
    }
}

/// Assemble the full router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/rooms/", get(rooms::list_rooms).post(rooms::create_room))
        .route(
            "/rooms/:room_id/",
            get(rooms::room_detail)
                .patch(rooms::toggle_fixation)
                .delete(rooms::delete_room),
        )
        .route("/rooms/:room_id/messages/", post(rooms::send_message))
        .route(
            "/rooms/:room_id/messages/:message_id/",
            axum::routing::put(rooms::edit_message)
                .patch(rooms::mark_main)
                .delete(rooms::delete_from_message),
        )
        .route("/rooms/:room_id/suggestions/", post(rooms::suggestions))
        .route("/rooms/:room_id/regenerate/", post(rooms::regenerate))
        .route(
            "/rooms/:room_id/histories/",
            get(rooms::list_histories).post(rooms::save_history),
        )
        .route(
            "/rooms/:room_id/histories/:history_id/",
            get(rooms::history_detail)
                .put(rooms::rename_history)
                .patch(rooms::load_history)
                .delete(rooms::delete_history),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
