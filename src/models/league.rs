// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Leagues and league memberships.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::AppError;
use crate::models::activity::Impact;

pub const DEFAULT_MAX_PARTICIPANTS: u32 = 500;

/// Points awarded per logged activity in league scoring.
pub const POINTS_PER_ACTIVITY: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum LeagueType {
    #[serde(alias = "public", alias = "Public")]
    Public,
    #[serde(alias = "private", alias = "Private")]
    Private,
}

impl LeagueType {
    pub fn as_str(self) -> &'static str {
        match self {
            LeagueType::Public => "PUBLIC",
            LeagueType::Private => "PRIVATE",
        }
    }
}

/// A user-created (or system-seeded) competition group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct League {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub league_type: LeagueType,
    pub host_id: u64,
    pub start_date: NaiveDate,
    /// None means open-ended
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub max_participants: u32,
    /// Only the seeded global league; never expires, host may leave
    #[serde(default)]
    pub is_permanent: bool,
    pub created_at: NaiveDateTime,
}

impl League {
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.is_permanent || self.end_date.is_none_or(|end| end >= today)
    }

    pub fn is_full(&self, active_members: usize) -> bool {
        active_members >= self.max_participants as usize
    }

    pub fn is_host(&self, user_id: u64) -> bool {
        self.host_id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MemberStatus {
    Invited,
    Active,
    Kicked,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Invited => "INVITED",
            MemberStatus::Active => "ACTIVE",
            MemberStatus::Kicked => "KICKED",
        }
    }

    /// Allowed edges: INVITED -> ACTIVE -> KICKED.
    pub fn can_transition_to(self, next: MemberStatus) -> bool {
        matches!(
            (self, next),
            (MemberStatus::Invited, MemberStatus::Active)
                | (MemberStatus::Active, MemberStatus::Kicked)
        )
    }
}

/// A user's membership row in one league, with league-scoped scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueMember {
    pub id: Uuid,
    pub league_id: Uuid,
    pub user_id: u64,
    pub status: MemberStatus,
    #[serde(default)]
    pub joined_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_activity: Option<NaiveDateTime>,

    #[serde(default)]
    pub total_co2: f64,
    #[serde(default)]
    pub total_water: f64,
    #[serde(default)]
    pub total_electricity: f64,
    #[serde(default)]
    pub activity_count: u32,
    #[serde(default)]
    pub score: f64,
}

impl LeagueMember {
    pub fn new(league_id: Uuid, user_id: u64, status: MemberStatus, now: NaiveDateTime) -> Self {
        Self {
            id: Self::member_id(league_id, user_id),
            league_id,
            user_id,
            status,
            joined_at: Some(now),
            last_activity: Some(now),
            total_co2: 0.0,
            total_water: 0.0,
            total_electricity: 0.0,
            activity_count: 0,
            score: 0.0,
        }
    }

    /// Row ID for `user_id` in `league_id`. One row per (league, user) by construction.
    pub fn member_id(league_id: Uuid, user_id: u64) -> Uuid {
        Uuid::new_v5(&league_id, &user_id.to_be_bytes())
    }

    /// Move to `next`, refusing edges the state machine does not allow.
    pub fn transition(&mut self, next: MemberStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "Cannot change membership from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn apply_stats(&mut self, stats: &MemberStats) {
        self.total_co2 = stats.total_co2;
        self.total_water = stats.total_water;
        self.total_electricity = stats.total_electricity;
        self.activity_count = stats.activity_count;
        self.score = stats.score;
        self.last_activity = Some(stats.last_activity);
    }
}

/// Scoring fields written by a stats refresh. Only these fields are updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    pub total_co2: f64,
    pub total_water: f64,
    pub total_electricity: f64,
    pub activity_count: u32,
    pub score: f64,
    pub last_activity: NaiveDateTime,
}

impl MemberStats {
    /// Score is proportional to engagement (activity count), not to impact.
    pub fn from_lifetime(totals: Impact, activity_count: u32, now: NaiveDateTime) -> Self {
        Self {
            total_co2: totals.co2,
            total_water: totals.water,
            total_electricity: totals.electricity,
            activity_count,
            score: activity_count as f64 * POINTS_PER_ACTIVITY,
            last_activity: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn league(end_date: Option<NaiveDate>, is_permanent: bool) -> League {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        League {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            description: None,
            league_type: LeagueType::Public,
            host_id: 1,
            start_date: start,
            end_date,
            max_participants: 3,
            is_permanent,
            created_at: start.and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_league_activity() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let yesterday = today.pred_opt().unwrap();

        assert!(league(None, false).is_active(today));
        assert!(league(Some(today), false).is_active(today));
        assert!(!league(Some(yesterday), false).is_active(today));
        assert!(league(Some(yesterday), true).is_active(today));
    }

    #[test]
    fn test_league_full() {
        let l = league(None, false);
        assert!(!l.is_full(2));
        assert!(l.is_full(3));
    }

    #[test]
    fn test_member_transitions_are_forward_only() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut member = LeagueMember::new(Uuid::new_v4(), 2, MemberStatus::Invited, now);

        assert!(member.transition(MemberStatus::Kicked).is_err());
        member.transition(MemberStatus::Active).unwrap();
        assert!(member.transition(MemberStatus::Invited).is_err());
        member.transition(MemberStatus::Kicked).unwrap();
        assert!(member.transition(MemberStatus::Active).is_err());
        assert_eq!(member.status, MemberStatus::Kicked);
    }

    #[test]
    fn test_score_is_five_points_per_activity() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let stats = MemberStats::from_lifetime(Impact::new(40.0, 10.0, 2.0), 4, now);
        assert_eq!(stats.score, 20.0);
        assert_eq!(stats.activity_count, 4);
    }
}
