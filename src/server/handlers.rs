//! HTTP request handlers for the relay.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::common::{ChatMessage, DisplayColor};
use crate::relay::{ClaimError, PublishError, WaitError};
use crate::storage::{ChatStats, HistoryQuery, StoreError};

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: status.as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        let status = match err {
            ClaimError::EmptyName => StatusCode::BAD_REQUEST,
            ClaimError::NameTaken(_) | ClaimError::ColorTaken(_) => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string())
    }
}

/// Unreadable or incomplete bodies (e.g. no `sender`) are the caller's fault.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct WaitParams {
    #[serde(default)]
    pub id: String,
}

/// GET /messages?id=<client>
///
/// Held open until the next message is published. Dropping the request
/// (client disconnect) drops the wait handle, which clears its slot.
pub async fn wait_for_message(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WaitParams>,
) -> Response {
    let handle = state.broadcaster.register(params.id);

    let outcome = match state.long_poll_timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(outcome) => outcome,
            Err(_) => return StatusCode::NO_CONTENT.into_response(),
        },
        None => handle.await,
    };

    match outcome {
        Ok(message) => Json(message).into_response(),
        Err(WaitError::Replaced) => {
            ApiError::new(StatusCode::CONFLICT, WaitError::Replaced.to_string()).into_response()
        }
    }
}

/// POST /messages
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatMessage>, JsonRejection>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Json(mut message) = payload?;
    if message.sender.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "sender is required"));
    }
    message.content = state.filter.censor(&message.content);

    let relay = Arc::clone(&state);
    tokio::task::spawn_blocking(move || relay.broadcaster.publish(message)).await??;

    Ok((StatusCode::CREATED, "message received"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaim {
    pub sender: String,
    #[serde(default)]
    pub sender_color: DisplayColor,
}

/// POST /users
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserClaim>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(claim) = payload?;
    state.users.claim(&claim.sender, claim.sender_color)?;
    Ok("registered")
}

/// DELETE /users/:name
pub async fn remove_user(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<&'static str, ApiError> {
    if state.users.release(&name) {
        Ok("signed out")
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, format!("user '{name}' not found")))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub sender: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Shorthand for `from = now - hours`; ignored when `from` is given.
    pub hours: Option<i64>,
}

impl HistoryParams {
    fn into_query(self, now: DateTime<Utc>) -> HistoryQuery {
        let from = self.from.or_else(|| {
            self.hours
                .and_then(Duration::try_hours)
                .and_then(|span| now.checked_sub_signed(span))
        });
        HistoryQuery {
            sender: self.sender,
            from,
            to: self.to,
        }
    }
}

/// GET /history
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let query = params.into_query(Utc::now());
    let messages =
        tokio::task::spawn_blocking(move || state.broadcaster.history().query(&query)).await??;
    Ok(Json(messages))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: usize,
}

/// DELETE /history/:sender
pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(sender): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let deleted =
        tokio::task::spawn_blocking(move || state.broadcaster.history().delete_sender(&sender))
            .await??;
    Ok(Json(Deleted { deleted }))
}

/// GET /stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<ChatStats>, ApiError> {
    let stats = tokio::task::spawn_blocking(move || state.broadcaster.history().stats()).await??;
    Ok(Json(stats))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hours_become_a_lower_bound() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let params = HistoryParams {
            hours: Some(3),
            ..HistoryParams::default()
        };

        let query = params.into_query(now);
        assert_eq!(query.from, Some(now - Duration::hours(3)));
        assert_eq!(query.to, None);
    }

    #[test]
    fn explicit_from_wins_over_hours() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let from = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let params = HistoryParams {
            from: Some(from),
            hours: Some(1),
            sender: Some("alice".to_string()),
            ..HistoryParams::default()
        };

        let query = params.into_query(now);
        assert_eq!(query.from, Some(from));
        assert_eq!(query.sender.as_deref(), Some("alice"));
    }

    #[test]
    fn claim_errors_map_to_statuses() {
        assert_eq!(ApiError::from(ClaimError::EmptyName).code, 400);
        assert_eq!(ApiError::from(ClaimError::NameTaken("a".into())).code, 409);
        assert_eq!(ApiError::from(ClaimError::ColorTaken(DisplayColor::Red)).code, 409);
    }
}
