//! Per-user, per-period leaderboard snapshots.
//!
//! An entry is recomputed from the ledger from scratch on every update, so it
//! deliberately carries no wall-clock timestamps: recomputing an unchanged
//! ledger yields an identical row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::activity::Impact;
use crate::period::{PeriodType, PeriodWindow};

// Plausible per-day bounds. Averages above the max are treated as data-entry
// errors; non-zero averages below the min as attempts to game the ranking.
pub const MAX_DAILY_CO2: f64 = 100.0;
pub const MAX_DAILY_WATER: f64 = 2000.0;
pub const MAX_DAILY_ELECTRICITY: f64 = 100.0;
pub const MIN_DAILY_CO2: f64 = 0.1;
pub const MIN_DAILY_WATER: f64 = 1.0;
pub const MIN_DAILY_ELECTRICITY: f64 = 0.1;

/// Aggregated impact of one user over one period window.
///
/// Stored at `leaderboard_entries/{userId}_{periodType}_{periodStart}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub period_type: PeriodType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,

    #[serde(default)]
    pub total_co2: f64,
    #[serde(default)]
    pub total_water: f64,
    #[serde(default)]
    pub total_electricity: f64,

    /// Distinct calendar days with at least one ledger row in the window
    #[serde(default)]
    pub days_tracked: u32,
    pub days_required: u32,
    #[serde(default)]
    pub is_eligible: bool,
    #[serde(default = "default_true")]
    pub is_valid: bool,
    #[serde(default)]
    pub disqualification_reason: Option<String>,

    /// Position in a ranking, assigned at query time and never stored.
    #[serde(default)]
    pub rank: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl LeaderboardEntry {
    /// Empty entry for `user_id` in the given window.
    pub fn new(user_id: u64, period_type: PeriodType, window: PeriodWindow) -> Self {
        Self {
            user_id,
            period_type,
            period_start: window.start,
            period_end: window.end,
            total_co2: 0.0,
            total_water: 0.0,
            total_electricity: 0.0,
            days_tracked: 0,
            days_required: period_type.days_required(),
            is_eligible: false,
            is_valid: true,
            disqualification_reason: None,
            rank: None,
        }
    }

    /// Storage key, unique per (user, period type, period start).
    pub fn document_id(&self) -> String {
        Self::key(self.user_id, self.period_type, self.period_start)
    }

    pub fn key(user_id: u64, period_type: PeriodType, period_start: NaiveDate) -> String {
        format!("{}_{}_{}", user_id, period_type.as_str(), period_start)
    }

    pub fn totals(&self) -> Impact {
        Impact::new(self.total_co2, self.total_water, self.total_electricity)
    }

    /// Replace the aggregates and re-derive validity and eligibility.
    pub fn apply_totals(&mut self, totals: Impact, days_tracked: u32) {
        self.total_co2 = totals.co2;
        self.total_water = totals.water;
        self.total_electricity = totals.electricity;
        self.days_tracked = days_tracked;
        self.validate();
        self.check_eligibility();
    }

    /// Run the plausibility bounds and record every violated one.
    pub fn validate(&mut self) {
        let reasons = disqualification_reasons(self.totals(), self.days_tracked);
        if reasons.is_empty() {
            self.is_valid = true;
            self.disqualification_reason = None;
        } else {
            self.is_valid = false;
            self.disqualification_reason = Some(reasons.join("; "));
        }
    }

    pub fn check_eligibility(&mut self) {
        self.is_eligible = self.days_tracked >= self.days_required && self.is_valid;
    }
}

/// Reasons why `totals` over `days_tracked` days look implausible.
pub fn disqualification_reasons(totals: Impact, days_tracked: u32) -> Vec<String> {
    let days = days_tracked.max(1) as f64;
    let avg_co2 = totals.co2 / days;
    let avg_water = totals.water / days;
    let avg_electricity = totals.electricity / days;

    let mut reasons = Vec::new();

    if avg_co2 > MAX_DAILY_CO2 {
        reasons.push(format!("CO2 too high ({:.1} kg/day)", avg_co2));
    }
    if avg_water > MAX_DAILY_WATER {
        reasons.push(format!("Water too high ({:.0} L/day)", avg_water));
    }
    if avg_electricity > MAX_DAILY_ELECTRICITY {
        reasons.push(format!("Electricity too high ({:.1} kWh/day)", avg_electricity));
    }

    if totals.co2 > 0.0 && avg_co2 < MIN_DAILY_CO2 {
        reasons.push("CO2 suspiciously low".to_string());
    }
    if totals.water > 0.0 && avg_water < MIN_DAILY_WATER {
        reasons.push("Water suspiciously low".to_string());
    }
    if totals.electricity > 0.0 && avg_electricity < MIN_DAILY_ELECTRICITY {
        reasons.push("Electricity suspiciously low".to_string());
    }

    reasons
}
