//! PageStats — per-page usage statistics driving LRU/LFU eviction.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::common::{PageId, StatsId};

/// Usage statistics for one [`crate::model::TilePage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageStats {
    pub id: StatsId,
    pub page_id: PageId,
    /// Fraction in [0, 1] of the page's tile slots currently materialized.
    pub fill_factor: f64,
    pub frequency_of_use_per_minute: f64,
    pub last_access_time_minutes: i64,
    /// Equal to `last_access_time_minutes`; ascending scan order visits the oldest page first.
    pub lru_score: f64,
    /// Equal to `frequency_of_use_per_minute`; ascending scan visits the least-used page first.
    pub lfu_score: f64,
}

impl PageStats {
    /// A freshly created, never-touched PageStats row.
    pub fn new(id: StatsId, page_id: PageId, created_at_minutes: i64) -> Self {
        let mut stats = Self {
            id,
            page_id,
            fill_factor: 0.0,
            frequency_of_use_per_minute: 0.0,
            last_access_time_minutes: created_at_minutes,
            lru_score: 0.0,
            lfu_score: 0.0,
        };
        stats.recompute_scores();
        stats
    }

    /// Add `num_tiles_added` to the page's fill factor, expressed as a fraction
    /// of `tiles_per_page`. Clamped to [0, 1].
    pub fn add_tiles(&mut self, num_tiles_added: i64, tiles_per_page: &BigInt) {
        let tiles_per_page_f = tiles_per_page.to_f64().unwrap_or(1.0).max(1.0);
        let delta = num_tiles_added as f64 / tiles_per_page_f;
        self.fill_factor = (self.fill_factor + delta).clamp(0.0, 1.0);
    }

    /// Record `num_hits` accesses at `last_access_minutes`, given the page's
    /// immutable `creation_time_minutes`.
    pub fn add_hits(&mut self, num_hits: u64, last_access_minutes: i64, creation_time_minutes: i64) {
        let prev_age_minutes = (self.last_access_time_minutes - creation_time_minutes).max(1) as f64;
        let prev_hits = self.frequency_of_use_per_minute * prev_age_minutes;

        let age_minutes = (last_access_minutes - creation_time_minutes).max(1) as f64;
        self.frequency_of_use_per_minute = (prev_hits + num_hits as f64) / age_minutes;
        self.last_access_time_minutes = last_access_minutes;

        self.recompute_scores();
    }

    /// Mark the page truncated: fill_factor = 0, removing it from eviction
    /// candidacy until it is refilled.
    pub fn truncate(&mut self) {
        self.fill_factor = 0.0;
    }

    fn recompute_scores(&mut self) {
        self.lru_score = self.last_access_time_minutes as f64;
        self.lfu_score = self.frequency_of_use_per_minute;
    }
}
