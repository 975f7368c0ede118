// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users and friendships (read-mostly, owned by the profile service)
//! - Activities (the ledger, including recurring templates)
//! - Leaderboard entries (keyed by their natural key)
//! - Leagues and league members
//!
//! Documents use camelCase field names, so query filters do too.

use crate::db::{collections, Store};
use crate::error::AppError;
use crate::models::{
    ActivityEntry, Friendship, FriendshipStatus, Impact, LeaderboardEntry, League, LeagueMember,
    MemberStats, MemberStatus, User,
};
use crate::period::PeriodType;
use async_trait::async_trait;
use chrono::NaiveDate;
use firestore::errors::FirestoreError;
use firestore::{paths_camel_case, FirestoreQueryDirection, FirestoreWritePrecondition};
use futures_util::{stream, StreamExt};
use uuid::Uuid;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Fetch a single document by ID.
    async fn get_doc<T>(&self, collection: &str, doc_id: &str) -> Result<Option<T>, AppError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(doc_id)
            .await
            .map_err(db_err)
    }

    /// Create or replace a single document.
    async fn set_doc<T>(&self, collection: &str, doc_id: &str, obj: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .object(obj)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, doc_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Write a ledger change and the owner's adjusted totals in one transaction.
    ///
    /// `insert` selects between storing and deleting the ledger row.
    async fn apply_ledger_change(
        &self,
        activity: &ActivityEntry,
        lifetime_delta: Impact,
        insert: bool,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let user_id = activity.user_id;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Read the user inside the transaction window so a concurrent write retries
        let mut user = match self.get_user(user_id).await? {
            Some(user) => user,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::not_found(format!("User {}", user_id)));
            }
        };
        user.total_co2 += lifetime_delta.co2;
        user.total_water += lifetime_delta.water;
        user.total_electricity += lifetime_delta.electricity;

        if insert {
            client
                .fluent()
                .update()
                .in_col(collections::ACTIVITIES)
                .document_id(activity.id.to_string())
                .object(activity)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add activity to transaction: {}", e))
                })?;
        } else {
            client
                .fluent()
                .delete()
                .from(collections::ACTIVITIES)
                .document_id(activity.id.to_string())
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add deletion to transaction: {}", e))
                })?;
        }

        client
            .fluent()
            .update()
            .fields(paths_camel_case!(User::{total_co2, total_water, total_electricity}))
            .in_col(collections::USERS)
            .document_id(user_id.to_string())
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, &user_id.to_string()).await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &user.id.to_string(), user)
            .await
    }

    /// Firestore has no case-insensitive match; this compares exact values.
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let identifier = identifier.trim().to_string();

        for field in ["username", "email"] {
            let value = identifier.clone();
            let mut found: Vec<User> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::USERS)
                .filter(move |q| q.field(field).eq(value.clone()))
                .limit(1)
                .obj()
                .query()
                .await
                .map_err(db_err)?;

            if let Some(user) = found.pop() {
                return Ok(Some(user));
            }
        }

        Ok(None)
    }

    async fn friend_ids(&self, user_id: u64) -> Result<Vec<u64>, AppError> {
        let mut ids = Vec::new();

        // A friendship is stored once, so look at both sides
        for field in ["userId", "friendId"] {
            let friendships: Vec<Friendship> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::FRIENDSHIPS)
                .filter(move |q| {
                    q.for_all([
                        q.field(field).eq(user_id),
                        q.field("status").eq("ACCEPTED"),
                    ])
                })
                .obj()
                .query()
                .await
                .map_err(db_err)?;

            ids.extend(
                friendships
                    .iter()
                    .filter(|f| f.status == FriendshipStatus::Accepted)
                    .filter_map(|f| f.other_side(user_id)),
            );
        }

        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn upsert_friendship(&self, friendship: &Friendship) -> Result<(), AppError> {
        self.set_doc(
            collections::FRIENDSHIPS,
            &friendship.document_id(),
            friendship,
        )
        .await
    }

    // ─── Activity Ledger Operations ──────────────────────────────

    async fn record_activity(
        &self,
        activity: &ActivityEntry,
        lifetime_delta: Impact,
    ) -> Result<(), AppError> {
        self.apply_ledger_change(activity, lifetime_delta, true)
            .await?;

        tracing::info!(
            user_id = activity.user_id,
            activity_id = %activity.id,
            "Activity recorded atomically"
        );
        Ok(())
    }

    async fn remove_activity(
        &self,
        activity: &ActivityEntry,
        lifetime_delta: Impact,
    ) -> Result<(), AppError> {
        self.apply_ledger_change(activity, lifetime_delta, false)
            .await?;

        tracing::info!(
            user_id = activity.user_id,
            activity_id = %activity.id,
            "Activity removed atomically"
        );
        Ok(())
    }

    async fn get_activity(&self, activity_id: Uuid) -> Result<Option<ActivityEntry>, AppError> {
        self.get_doc(collections::ACTIVITIES, &activity_id.to_string())
            .await
    }

    async fn activities_in_range(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ActivityEntry>, AppError> {
        // ISO dates compare correctly as strings
        let start = start.to_string();
        let end = end.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id),
                    q.field("date").greater_than_or_equal(start.clone()),
                    q.field("date").less_than_or_equal(end.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn all_activities(&self, user_id: u64) -> Result<Vec<ActivityEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.field("userId").eq(user_id))
            .order_by([("date", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn recurring_templates_due(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ActivityEntry>, AppError> {
        // "lastGeneratedDate is null OR < today" is not expressible as one query
        let templates: Vec<ActivityEntry> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.field("isRecurring").eq(true))
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        Ok(templates
            .into_iter()
            .filter(|t| t.last_generated_date.is_none_or(|last| last < today))
            .collect())
    }

    async fn generated_entry_exists(
        &self,
        user_id: u64,
        template_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        let template_id = template_id.to_string();
        let date = date.to_string();

        let found: Vec<ActivityEntry> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id),
                    q.field("sourceRecurringId").eq(template_id.clone()),
                    q.field("date").eq(date.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        Ok(!found.is_empty())
    }

    async fn insert_generated_activity(&self, activity: &ActivityEntry) -> Result<(), AppError> {
        self.set_doc(collections::ACTIVITIES, &activity.id.to_string(), activity)
            .await
    }

    async fn set_last_generated_date(
        &self,
        template_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), AppError> {
        let mut template: ActivityEntry = self
            .get_activity(template_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Recurring activity {}", template_id)))?;
        template.last_generated_date = Some(date);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths_camel_case!(ActivityEntry::{last_generated_date}))
            .in_col(collections::ACTIVITIES)
            .document_id(template_id.to_string())
            .object(&template)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ─── Leaderboard Operations ──────────────────────────────────

    async fn get_entry(
        &self,
        user_id: u64,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Option<LeaderboardEntry>, AppError> {
        let doc_id = LeaderboardEntry::key(user_id, period_type, period_start);
        self.get_doc(collections::LEADERBOARD_ENTRIES, &doc_id)
            .await
    }

    async fn upsert_entry(&self, entry: &LeaderboardEntry) -> Result<(), AppError> {
        let mut stored = entry.clone();
        stored.rank = None;
        self.set_doc(
            collections::LEADERBOARD_ENTRIES,
            &entry.document_id(),
            &stored,
        )
        .await
    }

    async fn entries_for_period(
        &self,
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let period_start = period_start.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEADERBOARD_ENTRIES)
            .filter(move |q| {
                q.for_all([
                    q.field("periodType").eq(period_type.as_str()),
                    q.field("periodStart").eq(period_start.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Fetches each user's entry by document ID with bounded concurrency.
    async fn entries_for_users(
        &self,
        user_ids: &[u64],
        period_type: PeriodType,
        period_start: NaiveDate,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let results: Vec<Result<Option<LeaderboardEntry>, AppError>> =
            stream::iter(user_ids.to_vec())
                .map(|user_id| async move {
                    self.get_entry(user_id, period_type, period_start).await
                })
                .buffer_unordered(MAX_CONCURRENT_DB_OPS)
                .collect()
                .await;

        let mut entries = Vec::with_capacity(results.len());
        for result in results {
            if let Some(entry) = result? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn delete_entries_ended_before(&self, cutoff: NaiveDate) -> Result<usize, AppError> {
        let cutoff = cutoff.to_string();

        let stale: Vec<LeaderboardEntry> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LEADERBOARD_ENTRIES)
            .filter(move |q| q.field("periodEnd").less_than(cutoff.clone()))
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        self.batch_delete(
            &stale,
            collections::LEADERBOARD_ENTRIES,
            LeaderboardEntry::document_id,
        )
        .await?;

        Ok(stale.len())
    }

    // ─── League Operations ───────────────────────────────────────

    async fn create_league_with_host(
        &self,
        league: &League,
        host: &LeagueMember,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::LEAGUES)
            .document_id(league.id.to_string())
            .object(league)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add league to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::LEAGUE_MEMBERS)
            .document_id(host.id.to_string())
            .object(host)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add host member to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    async fn get_league(&self, league_id: Uuid) -> Result<Option<League>, AppError> {
        self.get_doc(collections::LEAGUES, &league_id.to_string())
            .await
    }

    async fn delete_league(&self, league_id: Uuid) -> Result<usize, AppError> {
        let league_key = league_id.to_string();

        let members: Vec<LeagueMember> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LEAGUE_MEMBERS)
            .filter(move |q| q.field("leagueId").eq(league_key.clone()))
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        self.batch_delete(&members, collections::LEAGUE_MEMBERS, |m: &LeagueMember| {
            m.id.to_string()
        })
        .await?;

        self.delete_doc(collections::LEAGUES, &league_id.to_string())
            .await?;

        Ok(members.len())
    }

    async fn public_leagues(&self) -> Result<Vec<League>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEAGUES)
            .filter(|q| q.field("leagueType").eq("PUBLIC"))
            .order_by([("createdAt", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn permanent_league(&self) -> Result<Option<League>, AppError> {
        let mut found: Vec<League> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LEAGUES)
            .filter(|q| q.field("isPermanent").eq(true))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        Ok(found.pop())
    }

    // ─── League Member Operations ────────────────────────────────

    async fn count_active_members(&self, league_id: Uuid) -> Result<usize, AppError> {
        Ok(self
            .members_with_status(league_id, MemberStatus::Active)
            .await?
            .len())
    }

    async fn insert_member(&self, member: &LeagueMember) -> Result<(), AppError> {
        self.set_doc(collections::LEAGUE_MEMBERS, &member.id.to_string(), member)
            .await
    }

    async fn get_member(&self, member_id: Uuid) -> Result<Option<LeagueMember>, AppError> {
        self.get_doc(collections::LEAGUE_MEMBERS, &member_id.to_string())
            .await
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
        let league_key = league_id.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEAGUE_MEMBERS)
            .filter(move |q| {
                q.for_all([
                    q.field("leagueId").eq(league_key.clone()),
                    q.field("status").eq(status.as_str()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn memberships_for_user(
        &self,
        user_id: u64,
        status: MemberStatus,
    ) -> Result<Vec<LeagueMember>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEAGUE_MEMBERS)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id),
                    q.field("status").eq(status.as_str()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn update_member_status(&self, member: &LeagueMember) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths_camel_case!(LeagueMember::{status, joined_at}))
            .in_col(collections::LEAGUE_MEMBERS)
            .document_id(member.id.to_string())
            .object(member)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_member_stats(
        &self,
        member_id: Uuid,
        stats: &MemberStats,
    ) -> Result<bool, AppError> {
        // The precondition keeps a concurrent leave from being undone
        let result: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths_camel_case!(MemberStats::{
                total_co2,
                total_water,
                total_electricity,
                activity_count,
                score,
                last_activity
            }))
            .in_col(collections::LEAGUE_MEMBERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(member_id.to_string())
            .object(stats)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataNotFoundError(_)) => Ok(false),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn delete_member(&self, member_id: Uuid) -> Result<(), AppError> {
        self.delete_doc(collections::LEAGUE_MEMBERS, &member_id.to_string())
            .await
    }
}
