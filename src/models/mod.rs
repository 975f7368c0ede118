// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Data models for the application.

pub mod activity;
pub mod leaderboard;
pub mod league;
pub mod user;

pub use activity::{ActivityEntry, Impact};
pub use leaderboard::LeaderboardEntry;
pub use league::{League, LeagueMember, LeagueType, MemberStats, MemberStatus};
pub use user::{Friendship, FriendshipStatus, User};
