// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! League routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{League, LeagueMember};
use crate::services::league::{LeagueDetails, LeagueInvitation, RankedMember};
use crate::services::CreateLeagueRequest;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leagues", get(get_my_leagues).post(create_league))
        .route("/api/leagues/public", get(get_public_leagues))
        .route("/api/leagues/invitations", get(get_invitations))
        .route("/api/leagues/{id}", get(get_league).delete(delete_league))
        .route("/api/leagues/{id}/members", get(get_members))
        .route("/api/leagues/{id}/join", post(join_league))
        .route("/api/leagues/{id}/leave", delete(leave_league))
        .route("/api/leagues/{id}/invite", post(invite_user))
        .route("/api/leagues/{id}/accept-invitation", post(accept_invitation))
        .route("/api/leagues/{id}/kick/{member_id}", post(kick_member))
        .route("/api/leagues/{id}/refresh-stats", post(refresh_stats))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    /// Username or email of the invitee
    #[validate(length(min = 1, max = 254))]
    pub user_identifier: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatsResponse {
    pub members_updated: usize,
}

// ─── Listing ─────────────────────────────────────────────────

async fn get_my_leagues(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<LeagueDetails>>> {
    Ok(Json(state.leagues.get_user_leagues(user.user_id).await?))
}

async fn get_public_leagues(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<LeagueDetails>>> {
    Ok(Json(state.leagues.get_public_leagues(user.user_id).await?))
}

async fn get_invitations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<LeagueInvitation>>> {
    Ok(Json(state.leagues.get_invitations(user.user_id).await?))
}

async fn get_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeagueDetails>> {
    Ok(Json(state.leagues.get_league(id, user.user_id).await?))
}

async fn get_members(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RankedMember>>> {
    Ok(Json(state.leagues.get_league_members(id).await?))
}

// ─── Lifecycle ───────────────────────────────────────────────

async fn create_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateLeagueRequest>,
) -> Result<(StatusCode, Json<League>)> {
    let league = state.leagues.create_league(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(league)))
}

async fn delete_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.leagues.delete_league(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Membership ──────────────────────────────────────────────

async fn join_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeagueMember>> {
    Ok(Json(state.leagues.join_league(user.user_id, id).await?))
}

async fn leave_league(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.leagues.leave_league(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn invite_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<InviteRequest>,
) -> Result<(StatusCode, Json<LeagueMember>)> {
    request.validate()?;
    let member = state
        .leagues
        .invite_user(user.user_id, id, &request.user_identifier)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeagueMember>> {
    Ok(Json(state.leagues.accept_invitation(user.user_id, id).await?))
}

async fn kick_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    state
        .leagues
        .kick_member(user.user_id, id, member_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefreshStatsResponse>> {
    let members_updated = state.leagues.refresh_stats(id).await?;
    Ok(Json(RefreshStatsResponse { members_updated }))
}
