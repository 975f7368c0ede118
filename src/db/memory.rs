// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! In-process store backed by concurrent maps.
//!
//! Used for local development (`STORAGE_BACKEND=memory`) and tests. Every
//! operation touches one map entry at a time, except the ledger writes which
//! hold the owner's user entry while inserting or removing the row.

use crate::db::Store;
use crate::error::AppError;
use crate::models::{
    ActivityEntry, Friendship, FriendshipStatus, Impact, LeaderboardEntry, League, LeagueMember,
    LeagueType, MemberStats, MemberStatus, User,
};
use crate::period::PeriodType;
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<u64, User>,
    friendships: DashMap<String, Friendship>,
    activities: DashMap<Uuid, ActivityEntry>,
    entries: DashMap<String, LeaderboardEntry>,
    leagues: DashMap<Uuid, League>,
    members: DashMap<Uuid, LeagueMember>,

    #[cfg(test)]
    mock_fail_templates: std::sync::Mutex<std::collections::HashSet<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored leaderboard entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Make backfill writes for these templates fail.
    #[cfg(test)]
    pub fn set_mock_fail_templates(&self, ids: impl IntoIterator<Item = Uuid>) {
        let mut guard = self.mock_fail_templates.lock().unwrap();
        guard.clear();
        guard.extend(ids);
    }

    #[cfg(test)]
    fn check_mock_failure(&self, template_id: Uuid) -> Result<(), AppError> {
        if self.mock_fail_templates.lock().unwrap().contains(&template_id) {
            return Err(AppError::Database(format!(
                "Simulated failure for template {}",
                template_id
            )));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_mock_failure(&self, _template_id: Uuid) -> Result<(), AppError> {
        Ok(())
    }

    fn apply_totals(user: &mut User, delta: Impact) {
        user.total_co2 += delta.co2;
        user.total_water += delta.water;
        user.total_electricity += delta.electricity;
    }

    fn members_where(&self, predicate: impl Fn(&LeagueMember) -> bool) -> Vec<LeagueMember> {
        self.members
            .iter()
            .filter(|m| predicate(m.value()))
            .map(|m| m.value().clone())
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.matches_identifier(identifier))
            .map(|u| u.value().clone()))
    }

    async fn friend_ids(&self, user_id: u64) -> Result<Vec<u64>, AppError> {
        let mut ids: Vec<u64> = self
            .friendships
            .iter()
            .filter(|f| f.status == FriendshipStatus::Accepted)
            .filter_map(|f| f.other_side(user_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn upsert_friendship(&self, friendship: &Friendship) -> Result<(), AppError> {
        self.friendships
            .insert(friendship.document_id(), friendship.clone());
        Ok(())
    }

    async fn record_activity(
        &self,
        activity: &ActivityEntry,
        lifetime_delta: Impact,
    ) -> Result<(), AppError> {
        let mut user = self
            .users
            .get_mut(&activity.user_id)
            .ok_or_else(|| AppError::not_found(format!("User {}", activity.user_id)))?;

        self.activities.insert(activity.id, activity.clone());
        Self::apply_totals(&mut user, lifetime_delta);
        Ok(())
    }

    async fn remove_activity(
        &self,
        activity: &ActivityEntry,
        lifetime_delta: Impact,
    ) -> Result<(), AppError> {
        let mut user = self
            .users
            .get_mut(&activity.user_id)
            .ok_or_else(|| AppError::not_found(format!("User {}", activity.user_id)))?;

        if self.activities.remove(&activity.id).is_some() {
            Self::apply_totals(&mut user, lifetime_delta);
        }
        Ok(())
    }

    async fn get_activity(&self, activity_id: Uuid) -> Result<Option<ActivityEntry>, AppError> {
        Ok(self.activities.get(&activity_id).map(|a| a.clone()))
    }

    async fn activities_in_range(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ActivityEntry>, AppError> {
        Ok(self
            .activities
            .iter()
            .filter(|a| a.user_id == user_id && a.date >= start && a.date <= end)
            .map(|a| a.value().clone())
            .collect())
    }

    async fn all_activities(&self, user_id: u64) -> Result<Vec<ActivityEntry>, AppError> {
        let mut rows: Vec<ActivityEntry> = self
            .activities
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.value().clone())
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(rows)
    }

    async fn recurring_templates_due(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ActivityEntry>, AppError> {
        Ok(self
            .activities
            .iter()
            .filter(|a| a.is_recurring && a.last_generated_date.is_none_or(|last| last < today))
            .map(|a| a.value().clone())
            .collect())
    }

    async fn generated_entry_exists(
        &self,
        user_id: u64,
        template_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        Ok(self.activities.iter().any(|a| {
            a.user_id == user_id && a.source_recurring_id == Some(template_id) && a.date == date
        }))
    }

    async fn insert_generated_activity(&self, activity: &ActivityEntry) -> Result<(), AppError> {
        if let Some(template_id) = activity.source_recurring_id {
            self.check_mock_failure(template_id)?;
        }
        self.activities.insert(activity.id, activity.clone());
        Ok(())
    }

    async fn set_last_generated_date(
        &self,
        template_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), AppError> {
        self.check_mock_failure(template_id)?;
        let mut template = self
            .activities
            .get_mut(&template_id)
            .ok_or_else(|| AppError::not_found(format!("Recurring activity {}", template_id)))?;
        template.last_generated_date = Some(date);
        Ok(())
    }

    async fn get_entry(
        &self,
        user_id: u64,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Option<LeaderboardEntry>, AppError> {
        let key = LeaderboardEntry::key(user_id, period_type, period_start);
        Ok(self.entries.get(&key).map(|e| e.clone()))
    }

    async fn upsert_entry(&self, entry: &LeaderboardEntry) -> Result<(), AppError> {
        let mut stored = entry.clone();
        stored.rank = None;
        self.entries.insert(entry.document_id(), stored);
        Ok(())
    }

    async fn entries_for_period(
        &self,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.period_type == period_type && e.period_start == period_start)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn entries_for_users(
        &self,
        user_ids: &[u64],
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        Ok(user_ids
            .iter()
            .filter_map(|&user_id| {
                let key = LeaderboardEntry::key(user_id, period_type, period_start);
                self.entries.get(&key).map(|e| e.clone())
            })
            .collect())
    }

    async fn delete_entries_ended_before(&self, cutoff: NaiveDate) -> Result<usize, AppError> {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.period_end >= cutoff);
        Ok(before - self.entries.len())
    }

    async fn create_league_with_host(
        &self,
        league: &League,
        host: &LeagueMember,
    ) -> Result<(), AppError> {
        self.leagues.insert(league.id, league.clone());
        self.members.insert(host.id, host.clone());
        Ok(())
    }

    async fn get_league(&self, league_id: Uuid) -> Result<Option<League>, AppError> {
        Ok(self.leagues.get(&league_id).map(|l| l.clone()))
    }

    async fn delete_league(&self, league_id: Uuid) -> Result<usize, AppError> {
        let before = self.members.len();
        self.members.retain(|_, m| m.league_id != league_id);
        self.leagues.remove(&league_id);
        Ok(before - self.members.len())
    }

    async fn public_leagues(&self) -> Result<Vec<League>, AppError> {
        let mut leagues: Vec<League> = self
            .leagues
            .iter()
            .filter(|l| l.league_type == LeagueType::Public)
            .map(|l| l.value().clone())
            .collect();
        leagues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leagues)
    }

    async fn permanent_league(&self) -> Result<Option<League>, AppError> {
        Ok(self
            .leagues
            .iter()
            .find(|l| l.is_permanent)
            .map(|l| l.value().clone()))
    }

    async fn count_active_members(&self, league_id: Uuid) -> Result<usize, AppError> {
        Ok(self
            .members
            .iter()
            .filter(|m| m.league_id == league_id && m.status == MemberStatus::Active)
            .count())
    }

    async fn insert_member(&self, member: &LeagueMember) -> Result<(), AppError> {
        self.members.insert(member.id, member.clone());
        Ok(())
    }

    async fn get_member(&self, member_id: Uuid) -> Result<Option<LeagueMember>, AppError> {
        Ok(self.members.get(&member_id).map(|m| m.clone()))
    }

    async fn find_member(
        &self,
        league_id: Uuid,
        user_id: u64,
    ) -> Result<Option<LeagueMember>, AppError> {
        self.get_member(LeagueMember::member_id(league_id, user_id))
            .await
    }

    async fn members_with_status(
        &self,
        league_id: Uuid,
        status: MemberStatus,
    ) -> Result<Vec<LeagueMember>, AppError> {
        Ok(self.members_where(|m| m.league_id == league_id && m.status == status))
    }

    async fn memberships_for_user(
        &self,
        user_id: u64,
        status: MemberStatus,
    ) -> Result<Vec<LeagueMember>, AppError> {
        Ok(self.members_where(|m| m.user_id == user_id && m.status == status))
    }

    async fn update_member_status(&self, member: &LeagueMember) -> Result<(), AppError> {
        let mut stored = self
            .members
            .get_mut(&member.id)
            .ok_or_else(|| AppError::not_found("Member not found in this league"))?;
        stored.status = member.status;
        stored.joined_at = member.joined_at;
        Ok(())
    }

    async fn update_member_stats(
        &self,
        member_id: Uuid,
        stats: &MemberStats,
    ) -> Result<bool, AppError> {
        match self.members.get_mut(&member_id) {
            Some(mut member) => {
                member.apply_stats(stats);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_member(&self, member_id: Uuid) -> Result<(), AppError> {
        self.members.remove(&member_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_friend_ids_are_bidirectional() {
        let store = MemoryStore::new();
        store
            .upsert_friendship(&Friendship::accepted(1, 2))
            .await
            .unwrap();
        store
            .upsert_friendship(&Friendship::accepted(3, 1))
            .await
            .unwrap();
        store
            .upsert_friendship(&Friendship {
                user_id: 1,
                friend_id: 4,
                status: FriendshipStatus::Pending,
            })
            .await
            .unwrap();

        assert_eq!(store.friend_ids(1).await.unwrap(), vec![2, 3]);
        assert_eq!(store.friend_ids(2).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_upsert_entry_never_duplicates_key() {
        let store = MemoryStore::new();
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut entry =
            LeaderboardEntry::new(1, PeriodType::Weekly, PeriodType::Weekly.window(today));

        store.upsert_entry(&entry).await.unwrap();
        entry.total_co2 = 12.0;
        entry.rank = Some(1);
        store.upsert_entry(&entry).await.unwrap();

        assert_eq!(store.entry_count(), 1);
        let stored = store
            .get_entry(1, PeriodType::Weekly, entry.period_start)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.total_co2, 12.0);
        assert_eq!(stored.rank, None);
    }

    #[tokio::test]
    async fn test_record_activity_requires_user() {
        let store = MemoryStore::new();
        let day = now().date();
        let activity = ActivityEntry {
            id: Uuid::new_v4(),
            user_id: 9,
            activity_name: "Shower".to_string(),
            category: "Household".to_string(),
            quantity: 10.0,
            unit: "min".to_string(),
            co2_impact: 0.5,
            water_impact: 80.0,
            electricity_impact: 1.0,
            date: day,
            created_at: now(),
            is_recurring: false,
            times_per_week: None,
            weeks_per_year: None,
            last_generated_date: None,
            source_recurring_id: None,
        };

        let err = store
            .record_activity(&activity, activity.lifetime_impact())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.get_activity(activity.id).await.unwrap().is_none());

        store.upsert_user(&User::new(9, "nine")).await.unwrap();
        store
            .record_activity(&activity, activity.lifetime_impact())
            .await
            .unwrap();
        let user = store.get_user(9).await.unwrap().unwrap();
        assert_eq!(user.total_water, 80.0);
    }

    #[tokio::test]
    async fn test_stats_update_skips_missing_member() {
        let store = MemoryStore::new();
        let league_id = Uuid::new_v4();
        let member = LeagueMember::new(league_id, 5, MemberStatus::Active, now());
        let stats = MemberStats::from_lifetime(Impact::new(1.0, 2.0, 3.0), 2, now());

        assert!(!store.update_member_stats(member.id, &stats).await.unwrap());

        store.insert_member(&member).await.unwrap();
        assert!(store.update_member_stats(member.id, &stats).await.unwrap());
        let stored = store.find_member(league_id, 5).await.unwrap().unwrap();
        assert_eq!(stored.score, 10.0);
    }

    #[tokio::test]
    async fn test_delete_league_removes_members() {
        let store = MemoryStore::new();
        let league_id = Uuid::new_v4();
        for user_id in 1..=3 {
            store
                .insert_member(&LeagueMember::new(
                    league_id,
                    user_id,
                    MemberStatus::Active,
                    now(),
                ))
                .await
                .unwrap();
        }
        store
            .insert_member(&LeagueMember::new(
                Uuid::new_v4(),
                1,
                MemberStatus::Active,
                now(),
            ))
            .await
            .unwrap();

        assert_eq!(store.delete_league(league_id).await.unwrap(), 3);
        assert_eq!(
            store
                .memberships_for_user(1, MemberStatus::Active)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
