//! Local HTTP user service.
//!
//! Three JSON routes over the in-memory [`UserStore`]. This surface is
//! independent of the polling bridge; the two share nothing but process
//! configuration.

// Handlers are async for axum even when they never await.
#![allow(clippy::unused_async)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::BridgeError;
use crate::users::{User, UserStore, UserUpdate};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
}

async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.users.list())
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<User>, StatusCode> {
    state.users.get(id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, StatusCode> {
    state
        .users
        .update(id, &update)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).patch(patch_user))
        .with_state(state)
}

/// Bind and serve until cancelled.
pub async fn serve(
    bind: SocketAddr,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), BridgeError> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("user service listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}
