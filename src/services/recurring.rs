// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Recurring-activity backfill.
//!
//! Expands every recurring template into one generated ledger row per
//! elapsed day. Runs once at startup and then at each local midnight. The
//! same tick purges leaderboard entries past the retention window.

use crate::db::Store;
use crate::error::Result;
use crate::models::ActivityEntry;
use crate::services::LeaderboardService;
use crate::time_utils::{until_next_midnight, Clock};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

/// Outcome of one backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub templates_scanned: u32,
    pub rows_generated: u32,
    pub templates_failed: u32,
}

impl BackfillReport {
    pub fn is_partial_failure(&self) -> bool {
        self.templates_failed > 0 && self.templates_failed < self.templates_scanned
    }
}

pub struct RecurringBackfill {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    leaderboard: Arc<LeaderboardService>,
    retention_days: u32,
}

impl RecurringBackfill {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        leaderboard: Arc<LeaderboardService>,
        retention_days: u32,
    ) -> Self {
        Self {
            store,
            clock,
            leaderboard,
            retention_days,
        }
    }

    /// Generate the missing daily rows of every due template up to today.
    ///
    /// A failing template is logged and counted; the others still run.
    pub async fn generate_up_to_today(&self) -> Result<BackfillReport> {
        let today = self.clock.today();
        let templates = self.store.recurring_templates_due(today).await?;

        let mut report = BackfillReport {
            templates_scanned: templates.len() as u32,
            ..Default::default()
        };

        for template in &templates {
            match self.expand_template(template, today).await {
                Ok(generated) => {
                    report.rows_generated += generated;
                    if generated > 0 {
                        self.refresh_leaderboard(template.user_id).await;
                    }
                }
                Err(e) => {
                    report.templates_failed += 1;
                    tracing::warn!(
                        template_id = %template.id,
                        user_id = template.user_id,
                        error = %e,
                        "Failed to expand recurring activity"
                    );
                }
            }
        }

        if report.templates_failed > 0 {
            tracing::warn!(
                partial = report.is_partial_failure(),
                scanned = report.templates_scanned,
                generated = report.rows_generated,
                failed = report.templates_failed,
                "Recurring backfill finished with failures"
            );
        } else {
            tracing::info!(
                scanned = report.templates_scanned,
                generated = report.rows_generated,
                failed = report.templates_failed,
                "Recurring backfill finished"
            );
        }
        Ok(report)
    }

    /// Insert one row per missing day of `template`, then advance its marker.
    async fn expand_template(&self, template: &ActivityEntry, today: NaiveDate) -> Result<u32> {
        let after_template = template.date + Duration::days(1);
        let mut date = match template.last_generated_date {
            Some(last) => (last + Duration::days(1)).max(after_template),
            None => after_template,
        };

        let created_at = self.clock.now();
        let mut generated = 0;

        while date <= today {
            if !self
                .store
                .generated_entry_exists(template.user_id, template.id, date)
                .await?
            {
                let row = template.daily_instance(date, created_at);
                self.store.insert_generated_activity(&row).await?;
                generated += 1;
            }
            date += Duration::days(1);
        }

        self.store.set_last_generated_date(template.id, today).await?;

        if generated > 0 {
            tracing::debug!(
                template_id = %template.id,
                user_id = template.user_id,
                generated,
                "Expanded recurring activity"
            );
        }
        Ok(generated)
    }

    async fn refresh_leaderboard(&self, user_id: u64) {
        if let Err(e) = self.leaderboard.recalculate_user_leaderboard(user_id).await {
            tracing::warn!(user_id, error = %e, "Leaderboard refresh after backfill failed");
        }
    }

    /// One scheduled pass: backfill, then retention purge. Never fails.
    pub async fn run_once(&self) {
        if let Err(e) = self.generate_up_to_today().await {
            tracing::error!(error = %e, "Recurring backfill failed");
        }

        if let Err(e) = self.leaderboard.purge_stale_entries(self.retention_days).await {
            tracing::error!(error = %e, "Leaderboard retention purge failed");
        }
    }

    /// Run forever, waking at every local midnight.
    pub async fn run(self: Arc<Self>) {
        tracing::info!("Starting recurring backfill scheduler");

        loop {
            let wait = until_next_midnight(self.clock.now());
            tracing::debug!(seconds = wait.as_secs(), "Next recurring backfill scheduled");
            // Small margin so the wakeup lands on the new day
            tokio::time::sleep(wait + std::time::Duration::from_secs(1)).await;

            self.run_once().await;
        }
    }
}
