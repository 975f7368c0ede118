// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Activity ledger routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::ActivityEntry;
use crate::services::LogActivityRequest;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const MAX_PER_PAGE: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities).post(log_activity))
        .route("/api/activities/{id}", delete(delete_activity))
}

#[derive(Deserialize)]
struct ActivitiesQuery {
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    50
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityEntry>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

/// List the caller's ledger, newest first.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    let per_page = params.per_page.clamp(1, MAX_PER_PAGE);
    let page = params.page.max(1);

    let all = state.activities.list_activities(user.user_id).await?;
    let total = all.len();
    let activities = all
        .into_iter()
        .skip((page as usize - 1).saturating_mul(per_page as usize))
        .take(per_page as usize)
        .collect();

    Ok(Json(ActivitiesResponse {
        activities,
        total,
        page,
        per_page,
    }))
}

async fn log_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<LogActivityRequest>,
) -> Result<(StatusCode, Json<ActivityEntry>)> {
    let activity = state.activities.log_activity(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.activities.delete_activity(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
