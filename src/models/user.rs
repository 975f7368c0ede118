//! User and friendship records.
//!
//! Profiles and the social graph are owned by other services; the leaderboard
//! core only reads them, apart from the cached lifetime totals.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Numeric user ID (also used as document ID, matches the token subject)
    pub id: u64,
    pub username: String,
    /// Email address (may be None if not shared)
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Lifetime kg CO2 across all logged activities
    #[serde(default)]
    pub total_co2: f64,
    /// Lifetime litres of water
    #[serde(default)]
    pub total_water: f64,
    /// Lifetime kWh
    #[serde(default)]
    pub total_electricity: f64,
}

impl User {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: None,
            full_name: None,
            total_co2: 0.0,
            total_water: 0.0,
            total_electricity: 0.0,
        }
    }

    /// True if `identifier` is this user's username or email (case-insensitive).
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        self.username.eq_ignore_ascii_case(identifier)
            || self
                .email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(identifier))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

/// A friendship, stored once for both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub user_id: u64,
    pub friend_id: u64,
    pub status: FriendshipStatus,
}

impl Friendship {
    pub fn accepted(user_id: u64, friend_id: u64) -> Self {
        Self {
            user_id,
            friend_id,
            status: FriendshipStatus::Accepted,
        }
    }

    /// Document ID, independent of which side sent the request.
    pub fn document_id(&self) -> String {
        let (low, high) = if self.user_id <= self.friend_id {
            (self.user_id, self.friend_id)
        } else {
            (self.friend_id, self.user_id)
        };
        format!("{}_{}", low, high)
    }

    /// The other side of the friendship, if `user_id` is part of it.
    pub fn other_side(&self, user_id: u64) -> Option<u64> {
        if self.user_id == user_id {
            Some(self.friend_id)
        } else if self.friend_id == user_id {
            Some(self.user_id)
        } else {
            None
        }
    }
}
