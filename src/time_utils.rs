// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! Injected time source and shared date/time helpers.
//!
//! Period windows are calendar-based in server local time, so services never
//! call `Local::now()` directly; they ask a [`Clock`].

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use std::sync::RwLock;

/// Source of "now" for period and scheduling logic.
pub trait Clock: Send + Sync {
    /// Current local date-time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall-clock time in the server's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to. Used by tests and demos.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Clock fixed at noon of the given day.
    pub fn at_noon(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Time left until the next local midnight.
pub fn until_next_midnight(now: NaiveDateTime) -> std::time::Duration {
    let next_midnight = (now.date() + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now);
    (next_midnight - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}
