// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! League management and league-scoped scoring.
//!
//! Membership rows move INVITED -> ACTIVE -> KICKED and never back. A member
//! who leaves is deleted instead. League scores count engagement (five
//! points per logged activity), unlike the CO2-based leaderboard.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::league::DEFAULT_MAX_PARTICIPANTS;
use crate::models::{Impact, League, LeagueMember, LeagueType, MemberStats, MemberStatus};
use crate::time_utils::Clock;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("League name is required".into()));
    }
    Ok(())
}

/// Body of a create-league request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeagueRequest {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "League name is too long")
    )]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub league_type: LeagueType,
    /// Defaults to today
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 2, max = 500, message = "Max participants must be between 2 and 500"))]
    #[serde(default)]
    pub max_participants: Option<u32>,
}

/// A league as seen by one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueDetails {
    #[serde(flatten)]
    pub league: League,
    pub member_count: usize,
    pub is_active: bool,
    pub is_full: bool,
    pub is_member: bool,
    pub is_host: bool,
}

/// An ACTIVE member with its position in the league.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMember {
    #[serde(flatten)]
    pub member: LeagueMember,
    pub rank: u32,
}

/// A pending invitation together with the league it is for.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueInvitation {
    pub member_id: Uuid,
    pub league: League,
}

pub struct LeagueService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl LeagueService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn load_league(&self, league_id: Uuid) -> Result<League> {
        self.store
            .get_league(league_id)
            .await?
            .ok_or_else(|| AppError::not_found("League not found"))
    }

    async fn require_user(&self, user_id: u64) -> Result<()> {
        match self.store.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("User not found")),
        }
    }

    async fn ensure_not_full(&self, league: &League) -> Result<()> {
        let active = self.store.count_active_members(league.id).await?;
        if league.is_full(active) {
            return Err(AppError::bad_request("League is full"));
        }
        Ok(())
    }

    async fn details(&self, league: League, user_id: u64) -> Result<LeagueDetails> {
        let member_count = self.store.count_active_members(league.id).await?;
        let is_member = self
            .store
            .find_member(league.id, user_id)
            .await?
            .is_some_and(|m| m.status == MemberStatus::Active);

        Ok(LeagueDetails {
            is_active: league.is_active(self.clock.today()),
            is_full: league.is_full(member_count),
            is_host: league.is_host(user_id),
            member_count,
            is_member,
            league,
        })
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Create a league hosted by `host_id`, who is enrolled as its first member.
    pub async fn create_league(
        &self,
        host_id: u64,
        request: CreateLeagueRequest,
    ) -> Result<League> {
        request.validate()?;
        self.require_user(host_id).await?;

        let now = self.clock.now();
        let start_date = request.start_date.unwrap_or(now.date());
        if request.end_date.is_some_and(|end| end < start_date) {
            return Err(AppError::bad_request(
                "End date must not be before start date",
            ));
        }

        let league = League {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description,
            league_type: request.league_type,
            host_id,
            start_date,
            end_date: request.end_date,
            max_participants: request.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS),
            is_permanent: false,
            created_at: now,
        };
        let host = LeagueMember::new(league.id, host_id, MemberStatus::Active, now);

        self.store.create_league_with_host(&league, &host).await?;

        tracing::info!(
            league_id = %league.id,
            host_id,
            league_type = league.league_type.as_str(),
            "League created"
        );
        Ok(league)
    }

    /// Seed the permanent public league if it does not exist yet.
    pub async fn ensure_permanent_league(
        &self,
        system_user_id: u64,
        name: &str,
    ) -> Result<League> {
        if let Some(existing) = self.store.permanent_league().await? {
            return Ok(existing);
        }

        let now = self.clock.now();
        let league = League {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: Some("Everyone is welcome. This league never ends.".to_string()),
            league_type: LeagueType::Public,
            host_id: system_user_id,
            start_date: now.date(),
            end_date: None,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            is_permanent: true,
            created_at: now,
        };
        let host = LeagueMember::new(league.id, system_user_id, MemberStatus::Active, now);

        self.store.create_league_with_host(&league, &host).await?;

        tracing::info!(league_id = %league.id, name, "Permanent league created");
        Ok(league)
    }

    /// Delete a league and all its memberships. Host only.
    pub async fn delete_league(&self, user_id: u64, league_id: Uuid) -> Result<()> {
        let league = self.load_league(league_id).await?;

        if !league.is_host(user_id) {
            return Err(AppError::forbidden("Only the host can delete the league"));
        }
        if league.is_permanent {
            return Err(AppError::bad_request("The permanent league cannot be deleted"));
        }

        let removed = self.store.delete_league(league_id).await?;
        tracing::info!(%league_id, user_id, members_removed = removed, "League deleted");
        Ok(())
    }

    // ─── Membership ──────────────────────────────────────────────

    pub async fn join_league(&self, user_id: u64, league_id: Uuid) -> Result<LeagueMember> {
        self.require_user(user_id).await?;
        let league = self.load_league(league_id).await?;

        if league.league_type == LeagueType::Private {
            return Err(AppError::forbidden(
                "Cannot join private league without invitation",
            ));
        }
        if !league.is_active(self.clock.today()) {
            return Err(AppError::bad_request("League is no longer active"));
        }
        self.ensure_not_full(&league).await?;

        if let Some(existing) = self.store.find_member(league_id, user_id).await? {
            return Err(match existing.status {
                MemberStatus::Active => AppError::bad_request("Already a member of this league"),
                MemberStatus::Invited => AppError::bad_request(
                    "You already have an invitation to this league. Accept it instead.",
                ),
                MemberStatus::Kicked => {
                    AppError::forbidden("You have been removed from this league")
                }
            });
        }

        let member = LeagueMember::new(league_id, user_id, MemberStatus::Active, self.clock.now());
        self.store.insert_member(&member).await?;
        tracing::info!(%league_id, user_id, "User joined league");

        self.update_member_stats(member.id).await?;
        self.reload_member(member.id).await
    }

    /// Remove the caller's membership row.
    pub async fn leave_league(&self, user_id: u64, league_id: Uuid) -> Result<()> {
        let member = self
            .store
            .find_member(league_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Not a member of this league"))?;

        // Kicked rows stay so the member cannot come back through join
        if member.status == MemberStatus::Kicked {
            return Err(AppError::forbidden("You have been removed from this league"));
        }

        let league = self.load_league(league_id).await?;
        if league.is_host(user_id) && !league.is_permanent {
            return Err(AppError::bad_request(
                "Host cannot leave league. Delete it instead or transfer ownership.",
            ));
        }

        self.store.delete_member(member.id).await?;
        tracing::info!(%league_id, user_id, "User left league");
        Ok(())
    }

    /// Invite a user, identified by username or email. Host only.
    pub async fn invite_user(
        &self,
        host_id: u64,
        league_id: Uuid,
        user_identifier: &str,
    ) -> Result<LeagueMember> {
        let league = self.load_league(league_id).await?;

        if !league.is_host(host_id) {
            return Err(AppError::forbidden("Only the host can invite users"));
        }
        if !league.is_active(self.clock.today()) {
            return Err(AppError::bad_request("League is no longer active"));
        }
        self.ensure_not_full(&league).await?;

        let invitee = self
            .store
            .find_user_by_identifier(user_identifier)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if self.store.find_member(league_id, invitee.id).await?.is_some() {
            return Err(AppError::bad_request("User is already a member"));
        }

        let mut member =
            LeagueMember::new(league_id, invitee.id, MemberStatus::Invited, self.clock.now());
        member.joined_at = None;
        self.store.insert_member(&member).await?;

        tracing::info!(%league_id, host_id, invitee = invitee.id, "User invited to league");
        Ok(member)
    }

    pub async fn accept_invitation(&self, user_id: u64, league_id: Uuid) -> Result<LeagueMember> {
        let mut member = self
            .store
            .find_member(league_id, user_id)
            .await?
            .filter(|m| m.status == MemberStatus::Invited)
            .ok_or_else(|| AppError::not_found("No pending invitation found"))?;

        let league = self.load_league(league_id).await?;
        self.ensure_not_full(&league).await?;

        member.transition(MemberStatus::Active)?;
        member.joined_at = Some(self.clock.now());
        self.store.update_member_status(&member).await?;
        tracing::info!(%league_id, user_id, "Invitation accepted");

        self.update_member_stats(member.id).await?;
        self.reload_member(member.id).await
    }

    /// Mark an ACTIVE member as KICKED. Host only; the row is kept.
    pub async fn kick_member(&self, host_id: u64, league_id: Uuid, member_id: Uuid) -> Result<()> {
        let league = self.load_league(league_id).await?;

        if !league.is_host(host_id) {
            return Err(AppError::forbidden("Only the host can kick members"));
        }

        let mut member = self
            .store
            .get_member(member_id)
            .await?
            .filter(|m| m.league_id == league_id)
            .ok_or_else(|| AppError::not_found("Member not found in this league"))?;

        if member.user_id == host_id {
            return Err(AppError::bad_request("Cannot kick yourself"));
        }
        if member.status != MemberStatus::Active {
            return Err(AppError::bad_request("Only active members can be kicked"));
        }

        member.transition(MemberStatus::Kicked)?;
        self.store.update_member_status(&member).await?;

        tracing::info!(%league_id, host_id, kicked = member.user_id, "Member kicked");
        Ok(())
    }

    async fn reload_member(&self, member_id: Uuid) -> Result<LeagueMember> {
        self.store
            .get_member(member_id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found in this league"))
    }

    // ─── Scoring ─────────────────────────────────────────────────

    /// Recompute a member's lifetime totals and score from the ledger.
    ///
    /// A member that no longer exists is skipped and `None` returned.
    pub async fn update_member_stats(&self, member_id: Uuid) -> Result<Option<MemberStats>> {
        let Some(member) = self.store.get_member(member_id).await? else {
            return Ok(None);
        };

        let activities = self.store.all_activities(member.user_id).await?;
        let totals: Impact = activities.iter().map(|a| a.impact()).sum();
        let stats = MemberStats::from_lifetime(totals, activities.len() as u32, self.clock.now());

        if !self.store.update_member_stats(member_id, &stats).await? {
            tracing::debug!(%member_id, "Member vanished before stats update");
            return Ok(None);
        }

        tracing::debug!(
            %member_id,
            user_id = member.user_id,
            activity_count = stats.activity_count,
            score = stats.score,
            "Member stats updated"
        );
        Ok(Some(stats))
    }

    /// Recompute every ACTIVE member of a league. Returns how many were updated.
    pub async fn refresh_stats(&self, league_id: Uuid) -> Result<usize> {
        self.load_league(league_id).await?;

        let members = self
            .store
            .members_with_status(league_id, MemberStatus::Active)
            .await?;

        let mut updated = 0;
        for member in &members {
            if self.update_member_stats(member.id).await?.is_some() {
                updated += 1;
            }
        }

        tracing::info!(%league_id, updated, "League stats refreshed");
        Ok(updated)
    }

    // ─── Queries ─────────────────────────────────────────────────

    /// ACTIVE members, highest score first, with 1-based ranks.
    pub async fn get_league_members(&self, league_id: Uuid) -> Result<Vec<RankedMember>> {
        let members = self
            .store
            .members_with_status(league_id, MemberStatus::Active)
            .await?;
        Ok(rank_members(members))
    }

    /// Active public leagues, flagged with the caller's membership.
    pub async fn get_public_leagues(&self, user_id: u64) -> Result<Vec<LeagueDetails>> {
        let today = self.clock.today();
        let mut result = Vec::new();
        for league in self.store.public_leagues().await? {
            if league.is_active(today) {
                result.push(self.details(league, user_id).await?);
            }
        }
        Ok(result)
    }

    /// Leagues the caller is an ACTIVE member of.
    pub async fn get_user_leagues(&self, user_id: u64) -> Result<Vec<LeagueDetails>> {
        let memberships = self
            .store
            .memberships_for_user(user_id, MemberStatus::Active)
            .await?;

        let mut result = Vec::with_capacity(memberships.len());
        for membership in memberships {
            // Memberships of a league deleted concurrently are skipped
            if let Some(league) = self.store.get_league(membership.league_id).await? {
                result.push(self.details(league, user_id).await?);
            }
        }
        Ok(result)
    }

    pub async fn get_invitations(&self, user_id: u64) -> Result<Vec<LeagueInvitation>> {
        let pending = self
            .store
            .memberships_for_user(user_id, MemberStatus::Invited)
            .await?;

        let mut result = Vec::with_capacity(pending.len());
        for invitation in pending {
            if let Some(league) = self.store.get_league(invitation.league_id).await? {
                result.push(LeagueInvitation {
                    member_id: invitation.id,
                    league,
                });
            }
        }
        Ok(result)
    }

    pub async fn get_league(&self, league_id: Uuid, user_id: u64) -> Result<LeagueDetails> {
        let league = self.load_league(league_id).await?;
        self.details(league, user_id).await
    }
}

/// Sort by score descending (user ID breaks ties) and number from 1.
pub fn rank_members(mut members: Vec<LeagueMember>) -> Vec<RankedMember> {
    members.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.user_id.cmp(&b.user_id))
    });

    members
        .into_iter()
        .enumerate()
        .map(|(position, member)| RankedMember {
            member,
            rank: position as u32 + 1,
        })
        .collect()
}
