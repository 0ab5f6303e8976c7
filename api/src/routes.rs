//! Route handlers for the read API.
//!
//! Three endpoints, all read-only: a store-backed health probe, the
//! filtered/paginated event query, and a per-type row count summary.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use entroscan_indexer::events::types::{EventKind, EventRecord};
use entroscan_indexer::store::{EventFilter, DEFAULT_LIMIT, MAX_LIMIT};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /api/events`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    /// Required event type discriminator.
    pub r#type: Option<String>,
    /// Exact request id match.
    pub request_id: Option<String>,
    /// Exact transaction hash match.
    pub tx_hash: Option<String>,
    /// Minimum block number, inclusive.
    pub from_block: Option<u64>,
    /// Maximum block number, inclusive.
    pub to_block: Option<u64>,
    /// Page size (default 50, capped).
    pub limit: Option<u64>,
    /// Page offset (default 0).
    pub offset: Option<u64>,
}

/// Pagination metadata returned with every event page.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total matching records ignoring pagination.
    pub total: u64,
    /// Page size used.
    pub limit: u64,
    /// Page offset used.
    pub offset: u64,
    /// True if rows exist beyond `offset + limit`.
    pub has_more: bool,
}

/// Body of `GET /api/events`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    /// Always true on the success path.
    pub success: bool,
    /// Records in this page, block number descending.
    pub events: Vec<EventRecord>,
    /// Pagination metadata.
    pub pagination: Pagination,
}

/// Body of `GET /api/events/summary`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Always true on the success path.
    pub success: bool,
    /// Row count per event type.
    pub summary: BTreeMap<String, u64>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always true on the success path.
    pub success: bool,
    /// Fixed "ok" marker.
    pub status: String,
}

/// Builds the API router over the given state.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/events", get(list_events))
        .route("/api/events/summary", get(summary))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: one trivial store round-trip.
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state
        .store
        .ping()
        .await
        .map_err(|err| ApiError::Unavailable(err.to_string()))?;
    Ok(Json(HealthResponse {
        success: true,
        status: "ok".into(),
    }))
}

/// Filtered, paginated read of one event table.
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let kind = parse_kind(query.r#type.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let mut filter = EventFilter::new(kind)
        .with_page(limit, offset)
        .with_block_range(query.from_block, query.to_block);
    if let Some(request_id) = query.request_id {
        filter = filter.with_request_id(request_id);
    }
    if let Some(tx_hash) = query.tx_hash {
        filter = filter.with_transaction_hash(tx_hash);
    }

    let page = state.store.query_events(&filter).await?;
    let has_more = page.has_more(limit, offset);

    Ok(Json(EventsResponse {
        success: true,
        events: page.events,
        pagination: Pagination {
            total: page.total,
            limit,
            offset,
            has_more,
        },
    }))
}

/// Row count per event type.
async fn summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiError> {
    let counts = state.store.count_by_kind().await?;
    let summary = counts
        .into_iter()
        .map(|(kind, count)| (kind.as_str().to_string(), count))
        .collect();
    Ok(Json(SummaryResponse {
        success: true,
        summary,
    }))
}

/// Resolves the `type` parameter, naming the valid set on failure.
fn parse_kind(raw: Option<&str>) -> Result<EventKind, ApiError> {
    let valid = EventKind::ALL
        .iter()
        .map(EventKind::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    match raw {
        None => Err(ApiError::BadRequest(format!(
            "missing required query parameter 'type'; valid types: {valid}"
        ))),
        Some(name) => EventKind::parse(name).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "unknown event type '{name}'; valid types: {valid}"
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_accepts_all_valid_names() {
        for kind in EventKind::ALL {
            assert_eq!(parse_kind(Some(kind.as_str())).unwrap(), kind);
        }
    }

    #[test]
    fn parse_kind_rejects_unknown_with_valid_set() {
        let err = parse_kind(Some("Bogus")).unwrap_err();
        let message = err.to_string();
        for kind in EventKind::ALL {
            assert!(message.contains(kind.as_str()));
        }
    }

    #[test]
    fn parse_kind_requires_type() {
        let err = parse_kind(None).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
