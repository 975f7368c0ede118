// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Services module - business logic layer.

pub mod activity;
pub mod leaderboard;
pub mod league;
pub mod recurring;

pub use activity::{ActivityLedger, LogActivityRequest};
pub use leaderboard::LeaderboardService;
pub use league::{CreateLeagueRequest, LeagueService};
pub use recurring::{BackfillReport, RecurringBackfill};
