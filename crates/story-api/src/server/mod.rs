//! HTTP/WebSocket bridge between the presentation shell and the session.
//!
//! A single session is active at a time; creating a new one replaces it.
//! Realtime sessions are advanced by a ticker task mapping wall-clock
//! elapsed time onto the engine's logical clock; manual sessions are driven
//! through the advance route.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use contracts::{
    ActionResult, ApiError, Contact, Email, ErrorCode, Folder, SessionConfig, SessionStatus,
    Snapshot, StoryEvent, SCHEMA_VERSION_V1,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};

use crate::{SessionApi, SessionInitError};

const DEFAULT_PAGE_SIZE: usize = 500;
const MAX_PAGE_SIZE: usize = 5_000;
const TICK_INTERVAL_MS: u64 = 250;
const DEFAULT_PREFS_PATH: &str = "casefile_prefs.sqlite";

include!("error.rs");
include!("state.rs");
include!("routes/control.rs");
include!("routes/query.rs");
include!("routes/stream.rs");
include!("util.rs");

pub async fn serve(addr: SocketAddr) -> Result<(), ServerError> {
    let state = AppState::new();
    tokio::spawn(ticker(state.clone()));

    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/{session_id}/status", get(get_status))
        .route("/api/v1/sessions/{session_id}/snapshot", get(get_snapshot))
        .route("/api/v1/sessions/{session_id}/contacts", get(get_contacts))
        .route(
            "/api/v1/sessions/{session_id}/folders/{folder}",
            get(get_folder),
        )
        .route(
            "/api/v1/sessions/{session_id}/emails/{email_id}",
            get(get_email),
        )
        .route(
            "/api/v1/sessions/{session_id}/emails/{email_id}/open",
            post(open_email),
        )
        .route(
            "/api/v1/sessions/{session_id}/emails/{email_id}/delete",
            post(delete_email),
        )
        .route("/api/v1/sessions/{session_id}/events", get(get_events))
        .route(
            "/api/v1/sessions/{session_id}/actions/reply",
            post(submit_reply),
        )
        .route(
            "/api/v1/sessions/{session_id}/actions/choice",
            post(submit_choice),
        )
        .route(
            "/api/v1/sessions/{session_id}/actions/compose",
            post(submit_compose),
        )
        .route(
            "/api/v1/sessions/{session_id}/actions/install",
            post(submit_install),
        )
        .route(
            "/api/v1/sessions/{session_id}/actions/clue",
            post(reveal_clue),
        )
        .route("/api/v1/sessions/{session_id}/folder", post(set_folder))
        .route("/api/v1/sessions/{session_id}/advance", post(advance_session))
        .route("/api/v1/sessions/{session_id}/stream", get(stream_session))
        .layer(middleware::from_fn(with_cors))
        .with_state(state)
}

/// Advance realtime sessions and push deltas to stream subscribers.
async fn ticker(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    loop {
        interval.tick().await;
        let messages = {
            let mut inner = state.inner.lock().await;
            let Some(origin) = inner.origin else {
                continue;
            };
            let now_ms = origin.elapsed().as_millis() as u64;
            if let Some(session) = inner.session.as_mut() {
                session.advance_to(now_ms);
            }
            collect_delta_messages(&mut inner)
        };
        broadcast_messages(&state, messages);
    }
}

#[cfg(test)]
mod tests;
