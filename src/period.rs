// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Leaderboard period windows.
//!
//! Every function here is pure and takes the reference day (or instant) as
//! an argument. Windows are closed: both `start` and `end` are included.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::AppError;

/// Leaderboard bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodType {
    pub const ALL: [PeriodType; 4] = [
        PeriodType::Daily,
        PeriodType::Weekly,
        PeriodType::Monthly,
        PeriodType::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Daily => "DAILY",
            PeriodType::Weekly => "WEEKLY",
            PeriodType::Monthly => "MONTHLY",
            PeriodType::Yearly => "YEARLY",
        }
    }

    /// First day of the window containing `today`.
    pub fn period_start(self, today: NaiveDate) -> NaiveDate {
        match self {
            PeriodType::Daily => today,
            PeriodType::Weekly => {
                today - Duration::days(today.weekday().num_days_from_monday() as i64)
            }
            PeriodType::Monthly => today.with_day(1).unwrap_or(today),
            PeriodType::Yearly => today.with_ordinal(1).unwrap_or(today),
        }
    }

    /// Last day of the window containing `today`.
    pub fn period_end(self, today: NaiveDate) -> NaiveDate {
        match self {
            PeriodType::Daily => today,
            PeriodType::Weekly => self.period_start(today) + Duration::days(6),
            PeriodType::Monthly => last_day_of_month(today),
            PeriodType::Yearly => NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
        }
    }

    /// Both window bounds for `today`.
    pub fn window(self, today: NaiveDate) -> PeriodWindow {
        PeriodWindow {
            start: self.period_start(today),
            end: self.period_end(today),
        }
    }

    /// Minimum distinct tracked days for an entry to be eligible.
    ///
    /// Deliberately lenient: any tracked day in the window qualifies.
    pub fn days_required(self) -> u32 {
        match self {
            PeriodType::Daily | PeriodType::Weekly | PeriodType::Monthly | PeriodType::Yearly => 1,
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(PeriodType::Daily),
            "WEEKLY" => Ok(PeriodType::Weekly),
            "MONTHLY" => Ok(PeriodType::Monthly),
            "YEARLY" => Ok(PeriodType::Yearly),
            _ => Err(AppError::BadRequest(
                "Invalid period type. Use: DAILY, WEEKLY, MONTHLY, YEARLY".to_string(),
            )),
        }
    }
}

/// Closed date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(date)
}

/// Breakdown of the time left in a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TimeRemaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

/// Countdown to the next leaderboard reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ResetCountdown {
    pub period_type: PeriodType,
    pub millis_until_reset: i64,
    pub time_remaining: TimeRemaining,
}

/// Time from `now` until the start of the day after the current period ends.
pub fn reset_countdown(period_type: PeriodType, now: NaiveDateTime) -> ResetCountdown {
    let period_end = period_type.period_end(now.date());
    let reset_at = (period_end + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now);
    let millis_until_reset = (reset_at - now).num_milliseconds();

    let total_seconds = millis_until_reset / 1000;
    ResetCountdown {
        period_type,
        millis_until_reset,
        time_remaining: TimeRemaining {
            days: total_seconds / (24 * 3600),
            hours: (total_seconds % (24 * 3600)) / 3600,
            minutes: (total_seconds % 3600) / 60,
            seconds: total_seconds % 60,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_contains_today_for_every_kind() {
        let mut day = date(2023, 12, 25);
        while day <= date(2025, 1, 10) {
            for kind in PeriodType::ALL {
                let window = kind.window(day);
                assert!(window.start <= day && day <= window.end, "{kind} {day}");
            }
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_weekly_is_monday_to_sunday() {
        for offset in 0..14 {
            let day = date(2024, 3, 1) + Duration::days(offset);
            let window = PeriodType::Weekly.window(day);
            assert_eq!(window.start.weekday(), Weekday::Mon);
            assert_eq!(window.end.weekday(), Weekday::Sun);
            assert_eq!(window.end - window.start, Duration::days(6));
        }
    }

    #[test]
    fn test_weekly_across_year_boundary() {
        // Wednesday, 1 January 2025
        let window = PeriodType::Weekly.window(date(2025, 1, 1));
        assert_eq!(window.start, date(2024, 12, 30));
        assert_eq!(window.end, date(2025, 1, 5));
    }

    #[test]
    fn test_monthly_uses_calendar_length() {
        assert_eq!(PeriodType::Monthly.period_end(date(2024, 2, 10)), date(2024, 2, 29));
        assert_eq!(PeriodType::Monthly.period_end(date(2023, 2, 10)), date(2023, 2, 28));
        assert_eq!(PeriodType::Monthly.period_end(date(2024, 4, 30)), date(2024, 4, 30));
        assert_eq!(PeriodType::Monthly.period_end(date(2024, 12, 3)), date(2024, 12, 31));
        assert_eq!(PeriodType::Monthly.period_start(date(2024, 12, 3)), date(2024, 12, 1));
    }

    #[test]
    fn test_yearly_window() {
        let window = PeriodType::Yearly.window(date(2024, 7, 4));
        assert_eq!(window.start, date(2024, 1, 1));
        assert_eq!(window.end, date(2024, 12, 31));
        assert_eq!((window.end - window.start).num_days() + 1, 366);
    }

    #[test]
    fn test_daily_window_is_single_day() {
        let today = date(2024, 5, 17);
        assert_eq!(PeriodType::Daily.window(today), PeriodWindow { start: today, end: today });
    }

    #[test]
    fn test_days_required_is_lenient() {
        for kind in PeriodType::ALL {
            assert_eq!(kind.days_required(), 1);
        }
    }

    #[test]
    fn test_parse_period_type() {
        assert_eq!("weekly".parse::<PeriodType>().unwrap(), PeriodType::Weekly);
        assert_eq!(" YEARLY ".parse::<PeriodType>().unwrap(), PeriodType::Yearly);
        assert!(matches!(
            "fortnightly".parse::<PeriodType>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_reset_countdown_daily() {
        let now = date(2024, 5, 17).and_hms_opt(22, 58, 30).unwrap();
        let countdown = reset_countdown(PeriodType::Daily, now);
        assert_eq!(countdown.millis_until_reset, (61 * 60 + 30) * 1000);
        assert_eq!(
            countdown.time_remaining,
            TimeRemaining { days: 0, hours: 1, minutes: 1, seconds: 30 }
        );
    }

    #[test]
    fn test_reset_countdown_weekly_from_monday_midnight() {
        // Monday
        let now = date(2024, 5, 13).and_hms_opt(0, 0, 0).unwrap();
        let countdown = reset_countdown(PeriodType::Weekly, now);
        assert_eq!(countdown.time_remaining.days, 7);
        assert_eq!(countdown.millis_until_reset, 7 * 24 * 3600 * 1000);
    }
}
