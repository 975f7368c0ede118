// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Activity ledger rows.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Weeks per year assumed for a recurring activity when none is given.
pub const DEFAULT_WEEKS_PER_YEAR: u32 = 52;

/// CO2 / water / electricity magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Impact {
    /// kg CO2
    pub co2: f64,
    /// Litres
    pub water: f64,
    /// kWh
    pub electricity: f64,
}

impl Impact {
    pub fn new(co2: f64, water: f64, electricity: f64) -> Self {
        Self {
            co2,
            water,
            electricity,
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            co2: self.co2 * factor,
            water: self.water * factor,
            electricity: self.electricity * factor,
        }
    }

    pub fn negated(self) -> Self {
        self.scaled(-1.0)
    }
}

impl std::ops::AddAssign for Impact {
    fn add_assign(&mut self, rhs: Self) {
        self.co2 += rhs.co2;
        self.water += rhs.water;
        self.electricity += rhs.electricity;
    }
}

impl std::iter::Sum for Impact {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Impact::default(), |mut acc, impact| {
            acc += impact;
            acc
        })
    }
}

/// One dated consumption event in a user's ledger.
///
/// A row with `is_recurring` set is a template: the backfill job expands it
/// into one generated row per day, each pointing back through
/// `source_recurring_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityEntry {
    /// Row ID (also used as document ID)
    pub id: Uuid,
    /// Owning user
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub activity_name: String,
    /// Category tag (Transport, Household, ...)
    pub category: String,
    pub quantity: f64,
    /// Unit label for `quantity`
    pub unit: String,
    #[serde(default)]
    pub co2_impact: f64,
    #[serde(default)]
    pub water_impact: f64,
    #[serde(default)]
    pub electricity_impact: f64,
    /// Calendar day the activity counts towards
    pub date: NaiveDate,
    pub created_at: NaiveDateTime,

    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_per_week: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks_per_year: Option<u32>,
    /// Last day the backfill job generated a row for (templates only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generated_date: Option<NaiveDate>,
    /// Template this row was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_recurring_id: Option<Uuid>,
}

impl ActivityEntry {
    /// Impact of this single row, as counted by period aggregation.
    pub fn impact(&self) -> Impact {
        Impact::new(self.co2_impact, self.water_impact, self.electricity_impact)
    }

    /// Impact folded into the user's lifetime totals when the row is logged.
    ///
    /// A recurring template counts for a whole year of occurrences, so the
    /// rows generated from it count for nothing.
    pub fn lifetime_impact(&self) -> Impact {
        if self.is_generated() {
            return Impact::default();
        }
        if !self.is_recurring {
            return self.impact();
        }
        let occurrences = self.times_per_week.unwrap_or(1) as f64
            * self.weeks_per_year.unwrap_or(DEFAULT_WEEKS_PER_YEAR) as f64;
        self.impact().scaled(occurrences)
    }

    /// Share of one occurrence that falls on a single day.
    pub fn daily_factor(&self) -> f64 {
        self.times_per_week
            .map(|times| times as f64 / 7.0)
            .unwrap_or(1.0)
    }

    pub fn is_generated(&self) -> bool {
        self.source_recurring_id.is_some()
    }

    /// Deterministic ID of the row generated from template `template_id` on `date`.
    pub fn generated_id(template_id: Uuid, date: NaiveDate) -> Uuid {
        Uuid::new_v5(&template_id, date.to_string().as_bytes())
    }

    /// Build the generated daily row for `date` from this template.
    pub fn daily_instance(&self, date: NaiveDate, created_at: NaiveDateTime) -> ActivityEntry {
        let factor = self.daily_factor();
        let daily = self.impact().scaled(factor);

        ActivityEntry {
            id: Self::generated_id(self.id, date),
            user_id: self.user_id,
            activity_name: self.activity_name.clone(),
            category: self.category.clone(),
            quantity: self.quantity * factor,
            unit: self.unit.clone(),
            co2_impact: daily.co2,
            water_impact: daily.water,
            electricity_impact: daily.electricity,
            date,
            created_at,
            is_recurring: false,
            times_per_week: None,
            weeks_per_year: None,
            last_generated_date: None,
            source_recurring_id: Some(self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(times_per_week: Option<u32>) -> ActivityEntry {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ActivityEntry {
            id: Uuid::new_v4(),
            user_id: 7,
            activity_name: "Car drive".to_string(),
            category: "Transport".to_string(),
            quantity: 20.0,
            unit: "km".to_string(),
            co2_impact: 3.5,
            water_impact: 0.0,
            electricity_impact: 0.0,
            date,
            created_at: date.and_hms_opt(8, 0, 0).unwrap(),
            is_recurring: true,
            times_per_week,
            weeks_per_year: None,
            last_generated_date: None,
            source_recurring_id: None,
        }
    }

    #[test]
    fn test_lifetime_impact_of_recurring_template() {
        let t = template(Some(5));
        assert_eq!(t.lifetime_impact().co2, 3.5 * 5.0 * 52.0);
    }

    #[test]
    fn test_lifetime_impact_of_single_entry() {
        let mut t = template(Some(5));
        t.is_recurring = false;
        assert_eq!(t.lifetime_impact(), t.impact());
    }

    #[test]
    fn test_daily_instance_scales_by_times_per_week() {
        let t = template(Some(7));
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let row = t.daily_instance(day, day.and_hms_opt(0, 0, 1).unwrap());

        assert!((row.co2_impact - 3.5).abs() < 1e-9);
        assert!((row.quantity - 20.0).abs() < 1e-9);
        assert!(!row.is_recurring);
        assert_eq!(row.source_recurring_id, Some(t.id));
        assert_eq!(row.id, ActivityEntry::generated_id(t.id, day));
        assert_eq!(row.lifetime_impact(), Impact::default());
    }

    #[test]
    fn test_daily_factor_defaults_to_one() {
        assert_eq!(template(None).daily_factor(), 1.0);
        assert!((template(Some(2)).daily_factor() - 2.0 / 7.0).abs() < 1e-12);
    }
}
