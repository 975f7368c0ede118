// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Database layer.
//!
//! Services talk to a [`Store`]; production runs on Firestore, local
//! development and tests on the in-process [`MemoryStore`].

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{
    ActivityEntry, Friendship, Impact, LeaderboardEntry, League, LeagueMember, MemberStats,
    MemberStatus, User,
};
use crate::period::PeriodType;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const FRIENDSHIPS: &str = "friendships";
    /// Activity ledger (templates and generated rows alike)
    pub const ACTIVITIES: &str = "activities";
    /// Keyed by `{userId}_{periodType}_{periodStart}`
    pub const LEADERBOARD_ENTRIES: &str = "leaderboard_entries";
    pub const LEAGUES: &str = "leagues";
    pub const LEAGUE_MEMBERS: &str = "league_members";
}

/// Persistence operations needed by the services.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError>;

    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    /// Look a user up by username or email, case-insensitively.
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError>;

    /// IDs on the other side of every ACCEPTED friendship of `user_id`.
    async fn friend_ids(&self, user_id: u64) -> Result<Vec<u64>, AppError>;

    async fn upsert_friendship(&self, friendship: &Friendship) -> Result<(), AppError>;

    // ─── Activity ledger ─────────────────────────────────────────

    /// Store a ledger row and add `lifetime_delta` to the owner's totals, atomically.
    async fn record_activity(
        &self,
        activity: &ActivityEntry,
        lifetime_delta: Impact,
    ) -> Result<(), AppError>;

    /// Delete a ledger row and add `lifetime_delta` to the owner's totals, atomically.
    async fn remove_activity(
        &self,
        activity: &ActivityEntry,
        lifetime_delta: Impact,
    ) -> Result<(), AppError>;

    async fn get_activity(&self, activity_id: Uuid) -> Result<Option<ActivityEntry>, AppError>;

    /// Rows of `user_id` dated within `[start, end]`.
    async fn activities_in_range(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ActivityEntry>, AppError>;

    /// Every row of `user_id`, newest first.
    async fn all_activities(&self, user_id: u64) -> Result<Vec<ActivityEntry>, AppError>;

    /// Recurring templates not yet expanded up to `today`.
    async fn recurring_templates_due(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ActivityEntry>, AppError>;

    async fn generated_entry_exists(
        &self,
        user_id: u64,
        template_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, AppError>;

    /// Store a generated daily row. Lifetime totals are left alone.
    async fn insert_generated_activity(&self, activity: &ActivityEntry) -> Result<(), AppError>;

    async fn set_last_generated_date(
        &self,
        template_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), AppError>;

    // ─── Leaderboard entries ─────────────────────────────────────

    async fn get_entry(
        &self,
        user_id: u64,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Option<LeaderboardEntry>, AppError>;

    /// Insert or replace the entry under its natural key.
    async fn upsert_entry(&self, entry: &LeaderboardEntry) -> Result<(), AppError>;

    async fn entries_for_period(
        &self,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>, AppError>;

    async fn entries_for_users(
        &self,
        user_ids: &[u64],
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>, AppError>;

    /// Delete entries whose period ended before `cutoff`. Returns the count.
    async fn delete_entries_ended_before(&self, cutoff: NaiveDate) -> Result<usize, AppError>;

    // ─── Leagues ─────────────────────────────────────────────────

    /// Store a new league together with its host membership, atomically.
    async fn create_league_with_host(
        &self,
        league: &League,
        host: &LeagueMember,
    ) -> Result<(), AppError>;

    async fn get_league(&self, league_id: Uuid) -> Result<Option<League>, AppError>;

    /// Delete a league and all of its member rows. Returns the member count removed.
    async fn delete_league(&self, league_id: Uuid) -> Result<usize, AppError>;

    async fn public_leagues(&self) -> Result<Vec<League>, AppError>;

    async fn permanent_league(&self) -> Result<Option<League>, AppError>;

    // ─── League members ──────────────────────────────────────────

    async fn count_active_members(&self, league_id: Uuid) -> Result<usize, AppError>;

    async fn insert_member(&self, member: &LeagueMember) -> Result<(), AppError>;

    async fn get_member(&self, member_id: Uuid) -> Result<Option<LeagueMember>, AppError>;

    async fn find_member(
        &self,
        league_id: Uuid,
        user_id: u64,
    ) -> Result<Option<LeagueMember>, AppError>;

    async fn members_with_status(
        &self,
        league_id: Uuid,
        status: MemberStatus,
    ) -> Result<Vec<LeagueMember>, AppError>;

    async fn memberships_for_user(
        &self,
        user_id: u64,
        status: MemberStatus,
    ) -> Result<Vec<LeagueMember>, AppError>;

    /// Write status and `joinedAt` of an existing row.
    async fn update_member_status(&self, member: &LeagueMember) -> Result<(), AppError>;

    /// Field-level update of the scoring fields.
    ///
    /// Returns `false` (and writes nothing) if the row no longer exists.
    async fn update_member_stats(
        &self,
        member_id: Uuid,
        stats: &MemberStats,
    ) -> Result<bool, AppError>;

    async fn delete_member(&self, member_id: Uuid) -> Result<(), AppError>;
}
