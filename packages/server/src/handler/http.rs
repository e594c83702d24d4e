//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::Serialize;

use kotatsu_shared::time::millis_to_rfc3339;

use crate::{
    domain::{UserHistoryEntry, UserStats},
    protocol::AdminStatsDto,
    state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// One public room as listed by the room browser.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub user_count: usize,
    pub max_users: u32,
    pub category: String,
    pub tags: Vec<String>,
    pub has_password: bool,
    pub current_video: String,
    pub total_views: u64,
    pub created_at: String,
}

/// Public room directory, most-viewed rooms first.
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let coordinator = state.coordinator.lock().await;
    let mut summaries: Vec<RoomSummaryDto> = coordinator
        .rooms()
        .values()
        .filter(|room| room.is_public)
        .map(|room| RoomSummaryDto {
            id: room.id.clone(),
            name: room.name.clone(),
            description: room.description.clone(),
            user_count: room.members.len(),
            max_users: room.max_users,
            category: room.category.clone(),
            tags: room.tags.clone(),
            has_password: !room.password.is_empty(),
            current_video: room.video_url.clone(),
            total_views: room.stats.total_views,
            created_at: millis_to_rfc3339(room.created_at),
        })
        .collect();
    summaries.sort_by(|a, b| b.total_views.cmp(&a.total_views));
    Json(summaries)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryDto {
    pub username: String,
    pub stats: UserStats,
    pub history: Vec<UserHistoryEntry>,
}

/// Stats and room history for a username seen by this process.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<UserSummaryDto>, StatusCode> {
    let coordinator = state.coordinator.lock().await;
    let stats = coordinator
        .stats_of(&username)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(UserSummaryDto {
        history: coordinator.history_of(&username).to_vec(),
        username,
        stats,
    }))
}

/// Read-only global totals, gated on the `ADMIN_TOKEN` shared secret.
pub async fn get_admin_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AdminStatsDto>, StatusCode> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if !admin_token_matches(presented, state.config.admin_token.as_deref()) {
        return Err(StatusCode::FORBIDDEN);
    }
    let coordinator = state.coordinator.lock().await;
    Ok(Json(coordinator.global_stats()))
}

/// An unset token disables the endpoint entirely.
fn admin_token_matches(presented: Option<&str>, configured: Option<&str>) -> bool {
    match configured {
        Some(token) => presented == Some(token),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::admin_token_matches;

    #[test]
    fn admin_endpoint_requires_the_exact_configured_token() {
        assert!(admin_token_matches(Some("s3cret"), Some("s3cret")));
        assert!(!admin_token_matches(Some("wrong"), Some("s3cret")));
        assert!(!admin_token_matches(None, Some("s3cret")));
        // no configured token means nothing is accepted
        assert!(!admin_token_matches(Some("anything"), None));
        assert!(!admin_token_matches(None, None));
    }
}
