//! Property-based tests for the invariants that matter most under arbitrary
//! operation sequences: quota conservation and LRU/LFU ordering.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use num_bigint::BigInt;
use proptest::prelude::*;

use diskquota_store::calculator::{GridCoverage, TilePageCalculator};
use diskquota_store::store::{HitPayload, PagePayload};
use diskquota_store::{Store, StoreConfig, TileSet};

struct FixtureCalculator {
    layers: Mutex<BTreeMap<String, Vec<TileSet>>>,
    tiles_per_page: BigInt,
}

impl FixtureCalculator {
    fn new(tiles_per_page: i64, layers: Vec<(&str, Vec<TileSet>)>) -> Self {
        let mut map = BTreeMap::new();
        for (layer, tile_sets) in layers {
            map.insert(layer.to_string(), tile_sets);
        }
        Self {
            layers: Mutex::new(map),
            tiles_per_page: BigInt::from(tiles_per_page),
        }
    }
}

impl TilePageCalculator for FixtureCalculator {
    fn layer_names(&self) -> BTreeSet<String> {
        self.layers.lock().unwrap().keys().cloned().collect()
    }

    fn tile_sets_for(&self, layer: &str) -> Vec<TileSet> {
        self.layers.lock().unwrap().get(layer).cloned().unwrap_or_default()
    }

    fn tiles_per_page(&self, _tile_set: &TileSet, _zoom_level: u8) -> BigInt {
        self.tiles_per_page.clone()
    }

    fn to_grid_coverage(&self, _tile_set: &TileSet, tile_page: &diskquota_store::TilePage) -> Vec<GridCoverage> {
        vec![GridCoverage {
            min_x: tile_page.page_x,
            min_y: tile_page.page_y,
            max_x: tile_page.page_x,
            max_y: tile_page.page_y,
            zoom_level: tile_page.zoom_level,
        }]
    }
}

fn tile_set(id: &str, layer: &str) -> TileSet {
    TileSet::new(id, layer, "EPSG:4326", "png", "params-v1")
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

proptest! {
    /// After any sequence of quota deltas against a single tile set, the
    /// tile set's own row and the global sentinel row both equal the exact
    /// running sum of deltas applied so far - no delta is lost or
    /// double-counted across transactions.
    #[test]
    fn quota_conservation_under_random_diffs(diffs in prop::collection::vec(-1_000i64..=1_000i64, 1..40)) {
        init_logging();

        let dir = tempfile::tempdir().unwrap();
        let t1 = tile_set("t1", "L1");
        let calc = Arc::new(FixtureCalculator::new(10, vec![("L1", vec![t1.clone()])]));
        let store = Store::open(StoreConfig::new(dir.path()), calc).unwrap();

        let mut expected = BigInt::from(0);
        for diff in &diffs {
            store.add_to_quota_and_tile_counts(&t1.id, BigInt::from(*diff), vec![]).unwrap();
            expected += diff;
        }

        prop_assert_eq!(store.used_quota_by_tile_set_id(&t1.id).unwrap().bytes, expected.clone());
        prop_assert_eq!(store.globally_used_quota().unwrap(), expected);
    }

    /// Conservation holds across multiple tile sets too: the global row
    /// always equals the sum of every tile set's own row, regardless of the
    /// interleaving of their updates.
    #[test]
    fn quota_conservation_across_tile_sets(
        diffs_a in prop::collection::vec(-500i64..=500i64, 1..20),
        diffs_b in prop::collection::vec(-500i64..=500i64, 1..20),
    ) {
        init_logging();

        let dir = tempfile::tempdir().unwrap();
        let t1 = tile_set("t1", "L1");
        let t2 = tile_set("t2", "L2");
        let calc = Arc::new(FixtureCalculator::new(10, vec![("L1", vec![t1.clone()]), ("L2", vec![t2.clone()])]));
        let store = Store::open(StoreConfig::new(dir.path()), calc).unwrap();

        let mut expected_a = BigInt::from(0);
        let mut expected_b = BigInt::from(0);
        let mut iter_b = diffs_b.iter();
        for diff_a in &diffs_a {
            store.add_to_quota_and_tile_counts(&t1.id, BigInt::from(*diff_a), vec![]).unwrap();
            expected_a += diff_a;
            if let Some(diff_b) = iter_b.next() {
                store.add_to_quota_and_tile_counts(&t2.id, BigInt::from(*diff_b), vec![]).unwrap();
                expected_b += diff_b;
            }
        }
        for diff_b in iter_b {
            store.add_to_quota_and_tile_counts(&t2.id, BigInt::from(*diff_b), vec![]).unwrap();
            expected_b += diff_b;
        }

        prop_assert_eq!(store.used_quota_by_tile_set_id(&t1.id).unwrap().bytes, expected_a.clone());
        prop_assert_eq!(store.used_quota_by_tile_set_id(&t2.id).unwrap().bytes, expected_b.clone());
        prop_assert_eq!(store.globally_used_quota().unwrap(), expected_a + expected_b);
    }

    /// Of two pages touched at distinct access times, the LRU eviction
    /// candidate is always the one whose last access is further in the
    /// past, no matter which one was created or hit first.
    #[test]
    fn lru_always_picks_the_least_recently_touched_page(
        older_minutes in 0i64..1_000_000,
        gap_minutes in 1i64..1_000_000,
    ) {
        init_logging();
        let newer_minutes = older_minutes + gap_minutes;

        let dir = tempfile::tempdir().unwrap();
        let t1 = tile_set("t1", "L1");
        let calc = Arc::new(FixtureCalculator::new(10, vec![("L1", vec![t1.clone()])]));
        let store = Store::open(StoreConfig::new(dir.path()), calc).unwrap();

        store
            .add_to_quota_and_tile_counts(
                &t1.id,
                BigInt::from(0),
                vec![
                    PagePayload { zoom_level: 1, page_x: 0, page_y: 0, num_tiles_added: 1 },
                    PagePayload { zoom_level: 1, page_x: 1, page_y: 0, num_tiles_added: 1 },
                ],
            )
            .unwrap();

        store
            .add_hits_and_set_access_time(vec![
                HitPayload {
                    tile_set_id: t1.id.clone(),
                    zoom_level: 1,
                    page_x: 0,
                    page_y: 0,
                    num_hits: 1,
                    last_access_time_millis: older_minutes * 60_000,
                },
                HitPayload {
                    tile_set_id: t1.id.clone(),
                    zoom_level: 1,
                    page_x: 1,
                    page_y: 0,
                    num_hits: 1,
                    last_access_time_millis: newer_minutes * 60_000,
                },
            ])
            .unwrap()
            .wait()
            .unwrap();

        let mut layers = HashSet::new();
        layers.insert("L1".to_string());
        let candidate = store.least_recently_used_page(layers).unwrap().expect("one candidate");
        prop_assert_eq!((candidate.page_x, candidate.page_y), (0, 0));
    }

    /// Of two pages hit a different number of times over the same window,
    /// the LFU eviction candidate is always the one hit less often.
    #[test]
    fn lfu_always_picks_the_least_frequently_touched_page(
        fewer_hits in 0u64..50,
        extra_hits in 1u64..50,
    ) {
        init_logging();
        let more_hits = fewer_hits + extra_hits;

        let dir = tempfile::tempdir().unwrap();
        let t1 = tile_set("t1", "L1");
        let calc = Arc::new(FixtureCalculator::new(10, vec![("L1", vec![t1.clone()])]));
        let store = Store::open(StoreConfig::new(dir.path()), calc).unwrap();

        store
            .add_to_quota_and_tile_counts(
                &t1.id,
                BigInt::from(0),
                vec![
                    PagePayload { zoom_level: 1, page_x: 0, page_y: 0, num_tiles_added: 1 },
                    PagePayload { zoom_level: 1, page_x: 1, page_y: 0, num_tiles_added: 1 },
                ],
            )
            .unwrap();

        store
            .add_hits_and_set_access_time(vec![
                HitPayload {
                    tile_set_id: t1.id.clone(),
                    zoom_level: 1,
                    page_x: 0,
                    page_y: 0,
                    num_hits: fewer_hits,
                    last_access_time_millis: 60_000,
                },
                HitPayload {
                    tile_set_id: t1.id.clone(),
                    zoom_level: 1,
                    page_x: 1,
                    page_y: 0,
                    num_hits: more_hits,
                    last_access_time_millis: 60_000,
                },
            ])
            .unwrap()
            .wait()
            .unwrap();

        let mut layers = HashSet::new();
        layers.insert("L1".to_string());
        let candidate = store.least_frequently_used_page(layers).unwrap().expect("one candidate");
        prop_assert_eq!((candidate.page_x, candidate.page_y), (0, 0));
    }
}
