// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Leaderboard routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::LeaderboardEntry;
use crate::period::{PeriodType, ResetCountdown};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leaderboard/recalculate", post(recalculate))
        .route("/api/leaderboard/{period}", get(get_leaderboard))
        .route("/api/leaderboard/{period}/friends", get(get_friends_leaderboard))
        .route("/api/leaderboard/{period}/me", get(get_my_entry))
        .route("/api/leaderboard/{period}/reset-time", get(get_reset_time))
}

/// Global ranking for the current period.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(period): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let period: PeriodType = period.parse()?;
    Ok(Json(state.leaderboard.get_leaderboard(period).await?))
}

/// Ranking of the caller and their accepted friends.
async fn get_friends_leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(period): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let period: PeriodType = period.parse()?;
    let friend_ids = state.store.friend_ids(user.user_id).await?;

    let entries = state
        .leaderboard
        .get_leaderboard_for_user_and_friends(user.user_id, &friend_ids, period)
        .await?;
    Ok(Json(entries))
}

async fn get_my_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(period): Path<String>,
) -> Result<Json<LeaderboardEntry>> {
    let period: PeriodType = period.parse()?;
    state
        .leaderboard
        .get_user_entry(user.user_id, period)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("No {} entry for current period", period)))
}

async fn get_reset_time(
    State(state): State<Arc<AppState>>,
    Path(period): Path<String>,
) -> Result<Json<ResetCountdown>> {
    let period: PeriodType = period.parse()?;
    Ok(Json(state.leaderboard.get_time_until_reset(period)))
}

/// Recompute the caller's current-period entries.
async fn recalculate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(
        state
            .leaderboard
            .recalculate_user_leaderboard(user.user_id)
            .await?,
    ))
}
