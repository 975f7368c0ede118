// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Activity ledger service.
//!
//! Handles the write path that drives the leaderboard:
//! 1. Validate and store the ledger row
//! 2. Fold its lifetime impact into the user's cached totals (same write)
//! 3. Trigger leaderboard aggregation for the affected periods

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::ActivityEntry;
use crate::services::LeaderboardService;
use crate::time_utils::Clock;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Body of a log-activity request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogActivityRequest {
    #[validate(length(min = 1, max = 200))]
    pub activity_name: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(range(min = 0.0))]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub co2_impact: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub water_impact: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub electricity_impact: f64,
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub is_recurring: bool,
    #[validate(range(min = 1, max = 7))]
    #[serde(default)]
    pub times_per_week: Option<u32>,
    #[validate(range(min = 1, max = 52))]
    #[serde(default)]
    pub weeks_per_year: Option<u32>,
}

pub struct ActivityLedger {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    leaderboard: Arc<LeaderboardService>,
}

impl ActivityLedger {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        leaderboard: Arc<LeaderboardService>,
    ) -> Self {
        Self {
            store,
            clock,
            leaderboard,
        }
    }

    /// Store a new ledger row for `user_id` and update the leaderboard.
    pub async fn log_activity(
        &self,
        user_id: u64,
        request: LogActivityRequest,
    ) -> Result<ActivityEntry> {
        request.validate()?;

        let now = self.clock.now();
        let recurring = request.is_recurring;
        let activity = ActivityEntry {
            id: Uuid::new_v4(),
            user_id,
            activity_name: request.activity_name.trim().to_string(),
            category: request.category.trim().to_string(),
            quantity: request.quantity,
            unit: request.unit,
            co2_impact: request.co2_impact,
            water_impact: request.water_impact,
            electricity_impact: request.electricity_impact,
            date: request.date.unwrap_or(now.date()),
            created_at: now,
            is_recurring: recurring,
            times_per_week: request.times_per_week.filter(|_| recurring),
            weeks_per_year: request.weeks_per_year.filter(|_| recurring),
            last_generated_date: None,
            source_recurring_id: None,
        };

        self.store
            .record_activity(&activity, activity.lifetime_impact())
            .await?;

        tracing::info!(
            user_id,
            activity_id = %activity.id,
            date = %activity.date,
            recurring,
            "Activity logged"
        );

        self.leaderboard
            .update_leaderboard_for_user(user_id, activity.date)
            .await?;

        Ok(activity)
    }

    /// Delete one of the caller's rows and recompute their leaderboard.
    pub async fn delete_activity(&self, user_id: u64, activity_id: Uuid) -> Result<()> {
        let activity = self
            .store
            .get_activity(activity_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| AppError::not_found("Activity not found"))?;

        self.store
            .remove_activity(&activity, activity.lifetime_impact().negated())
            .await?;

        tracing::info!(user_id, %activity_id, "Activity deleted");

        self.leaderboard
            .recalculate_user_leaderboard(user_id)
            .await?;
        Ok(())
    }

    /// All rows of `user_id`, newest first.
    pub async fn list_activities(&self, user_id: u64) -> Result<Vec<ActivityEntry>> {
        self.store.all_activities(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::User;
    use crate::period::PeriodType;
    use crate::time_utils::ManualClock;

    fn request(co2: f64) -> LogActivityRequest {
        LogActivityRequest {
            activity_name: "Car drive".to_string(),
            category: "Transport".to_string(),
            quantity: 12.0,
            unit: "km".to_string(),
            co2_impact: co2,
            water_impact: 0.0,
            electricity_impact: 0.0,
            date: None,
            is_recurring: false,
            times_per_week: None,
            weeks_per_year: None,
        }
    }

    async fn ledger() -> (Arc<MemoryStore>, ActivityLedger) {
        let store = Arc::new(MemoryStore::new());
        store.upsert_user(&User::new(1, "alice")).await.unwrap();
        let clock = Arc::new(ManualClock::at_noon(
            NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(),
        ));
        let leaderboard = Arc::new(LeaderboardService::new(store.clone(), clock.clone()));
        let ledger = ActivityLedger::new(store.clone(), clock, leaderboard);
        (store, ledger)
    }

    #[tokio::test]
    async fn test_log_updates_totals_and_leaderboard() {
        let (store, ledger) = ledger().await;

        let activity = ledger.log_activity(1, request(2.5)).await.unwrap();

        let user = store.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.total_co2, 2.5);
        let daily = store
            .get_entry(1, PeriodType::Daily, activity.date)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(daily.total_co2, 2.5);
    }

    #[tokio::test]
    async fn test_delete_reverses_totals() {
        let (store, ledger) = ledger().await;
        let activity = ledger.log_activity(1, request(2.5)).await.unwrap();

        ledger.delete_activity(1, activity.id).await.unwrap();

        let user = store.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.total_co2, 0.0);
        let daily = store
            .get_entry(1, PeriodType::Daily, activity.date)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(daily.total_co2, 0.0);
        assert_eq!(daily.days_tracked, 0);
    }

    #[tokio::test]
    async fn test_cannot_delete_someone_elses_activity() {
        let (store, ledger) = ledger().await;
        store.upsert_user(&User::new(2, "bob")).await.unwrap();
        let activity = ledger.log_activity(1, request(2.5)).await.unwrap();

        let err = ledger.delete_activity(2, activity.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_negative_impact_rejected() {
        let (_, ledger) = ledger().await;
        let err = ledger.log_activity(1, request(-1.0)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
