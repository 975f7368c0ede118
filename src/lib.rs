// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! EcoTrace: social environmental-footprint tracking.
//!
//! This crate provides the leaderboard and league backend: activities are
//! aggregated into per-period CO2/water/electricity snapshots, ranked on
//! global and friends leaderboards, and scored inside user-created leagues.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod period;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{ActivityLedger, LeaderboardService, LeagueService, RecurringBackfill};
use std::sync::Arc;
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub leaderboard: Arc<LeaderboardService>,
    pub leagues: LeagueService,
    pub activities: ActivityLedger,
    pub backfill: Arc<RecurringBackfill>,
}

impl AppState {
    /// Wire all services onto one store and clock.
    pub fn new(config: Config, store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        let leaderboard = Arc::new(LeaderboardService::new(store.clone(), clock.clone()));
        let leagues = LeagueService::new(store.clone(), clock.clone());
        let activities = ActivityLedger::new(store.clone(), clock.clone(), leaderboard.clone());
        let backfill = Arc::new(RecurringBackfill::new(
            store.clone(),
            clock.clone(),
            leaderboard.clone(),
            config.leaderboard_retention_days,
        ));

        Self {
            config,
            store,
            clock,
            leaderboard,
            leagues,
            activities,
            backfill,
        }
    }
}
