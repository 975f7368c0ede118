// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Leaderboard aggregation and ranking.
//!
//! Aggregation is always a full recompute from the activity ledger, so any
//! number of overlapping triggers converge on the same stored entry.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Impact, LeaderboardEntry};
use crate::period::{reset_countdown, PeriodType, PeriodWindow, ResetCountdown};
use crate::time_utils::Clock;
use chrono::{Duration, NaiveDate};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

pub struct LeaderboardService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn require_user(&self, user_id: u64) -> Result<()> {
        match self.store.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(format!("User {}", user_id))),
        }
    }

    /// Recompute the `period_type` entry of `user_id` if `triggering_date`
    /// falls in the current window.
    ///
    /// Returns the stored entry, or `None` when the date is outside the window.
    pub async fn update_entry(
        &self,
        user_id: u64,
        period_type: PeriodType,
        triggering_date: NaiveDate,
    ) -> Result<Option<LeaderboardEntry>> {
        self.require_user(user_id).await?;
        self.update_entry_unchecked(user_id, period_type, triggering_date)
            .await
    }

    async fn update_entry_unchecked(
        &self,
        user_id: u64,
        period_type: PeriodType,
        triggering_date: NaiveDate,
    ) -> Result<Option<LeaderboardEntry>> {
        let window = period_type.window(self.clock.today());
        if !window.contains(triggering_date) {
            tracing::debug!(
                user_id,
                period = %period_type,
                date = %triggering_date,
                "Activity date outside current window, skipping"
            );
            return Ok(None);
        }

        self.recompute(user_id, period_type, window).await.map(Some)
    }

    /// Rebuild one entry from the ledger rows in `window` and store it.
    async fn recompute(
        &self,
        user_id: u64,
        period_type: PeriodType,
        window: PeriodWindow,
    ) -> Result<LeaderboardEntry> {
        // Read first: a failed read must leave the stored entry untouched
        let rows = self
            .store
            .activities_in_range(user_id, window.start, window.end)
            .await?;

        let mut entry = self
            .store
            .get_entry(user_id, period_type, window.start)
            .await?
            .unwrap_or_else(|| LeaderboardEntry::new(user_id, period_type, window));

        let totals: Impact = rows.iter().map(|row| row.impact()).sum();
        let days_tracked = rows.iter().map(|row| row.date).collect::<HashSet<_>>().len() as u32;

        entry.period_end = window.end;
        entry.days_required = period_type.days_required();
        entry.rank = None;
        entry.apply_totals(totals, days_tracked);

        self.store.upsert_entry(&entry).await?;

        tracing::debug!(
            user_id,
            period = %period_type,
            period_start = %window.start,
            total_co2 = entry.total_co2,
            days_tracked,
            is_valid = entry.is_valid,
            is_eligible = entry.is_eligible,
            "Leaderboard entry updated"
        );

        Ok(entry)
    }

    /// Update all four period entries for an activity dated `date`.
    pub async fn update_leaderboard_for_user(&self, user_id: u64, date: NaiveDate) -> Result<()> {
        self.require_user(user_id).await?;

        for period_type in PeriodType::ALL {
            self.update_entry_unchecked(user_id, period_type, date)
                .await?;
        }
        Ok(())
    }

    /// Recompute all four current-period entries regardless of any trigger date.
    pub async fn recalculate_user_leaderboard(
        &self,
        user_id: u64,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.require_user(user_id).await?;

        let today = self.clock.today();
        let mut entries = Vec::with_capacity(PeriodType::ALL.len());
        for period_type in PeriodType::ALL {
            entries.push(
                self.recompute(user_id, period_type, period_type.window(today))
                    .await?,
            );
        }

        tracing::info!(user_id, "Leaderboard recalculated");
        Ok(entries)
    }

    /// Eligible, valid entries of the current period, lowest CO2 first.
    pub async fn get_leaderboard(&self, period_type: PeriodType) -> Result<Vec<LeaderboardEntry>> {
        let period_start = period_type.period_start(self.clock.today());
        let entries = self
            .store
            .entries_for_period(period_type, period_start)
            .await?;
        Ok(rank_global(entries))
    }

    /// Entries of the caller and their friends for the current period.
    ///
    /// The caller is always included exactly once.
    pub async fn get_leaderboard_for_user_and_friends(
        &self,
        user_id: u64,
        friend_ids: &[u64],
        period_type: PeriodType,
    ) -> Result<Vec<LeaderboardEntry>> {
        let mut ids: Vec<u64> = friend_ids.to_vec();
        ids.push(user_id);
        ids.sort_unstable();
        ids.dedup();

        let period_start = period_type.period_start(self.clock.today());
        let entries = self
            .store
            .entries_for_users(&ids, period_type, period_start)
            .await?;
        Ok(rank_friends(entries))
    }

    pub async fn get_user_entry(
        &self,
        user_id: u64,
        period_type: PeriodType,
    ) -> Result<Option<LeaderboardEntry>> {
        let period_start = period_type.period_start(self.clock.today());
        self.store
            .get_entry(user_id, period_type, period_start)
            .await
    }

    pub fn get_time_until_reset(&self, period_type: PeriodType) -> ResetCountdown {
        reset_countdown(period_type, self.clock.now())
    }

    /// Delete entries whose period ended more than `retention_days` ago.
    pub async fn purge_stale_entries(&self, retention_days: u32) -> Result<usize> {
        let cutoff = self.clock.today() - Duration::days(retention_days as i64);
        let removed = self.store.delete_entries_ended_before(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, cutoff = %cutoff, "Purged stale leaderboard entries");
        }
        Ok(removed)
    }
}

/// Lower CO2 ranks higher; user ID breaks ties.
fn by_co2(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    a.total_co2
        .total_cmp(&b.total_co2)
        .then(a.user_id.cmp(&b.user_id))
}

/// Keep eligible, valid entries, sort them and assign 1-based ranks.
pub fn rank_global(entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<LeaderboardEntry> = entries
        .into_iter()
        .filter(|e| e.is_eligible && e.is_valid)
        .collect();
    ranked.sort_by(by_co2);

    for (position, entry) in ranked.iter_mut().enumerate() {
        entry.rank = Some(position as u32 + 1);
    }
    ranked
}

/// Eligible entries first (ranked), then the rest unranked.
pub fn rank_friends(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.is_eligible.cmp(&a.is_eligible).then_with(|| by_co2(a, b)));

    let mut next_rank = 1;
    for entry in entries.iter_mut() {
        if entry.is_eligible {
            entry.rank = Some(next_rank);
            next_rank += 1;
        } else {
            entry.rank = None;
        }
    }
    entries
}
