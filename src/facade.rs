//! Store Facade: the public API surface. Every operation except
//! `tile_sets()` and `tiles_for_page()` runs inside the [`TransactionWorker`].

use std::collections::HashSet;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::calculator::{GridCoverage, TilePageCalculator};
use crate::common::{Error, Result, StoreConfig, TileSetId};
use crate::model::{PageStats, Quota, TilePage, TileSet};
use crate::store::{EvictionPolicy, HitPayload, PagePayload, StoreEngine};
use crate::worker::{PendingResult, TransactionWorker};

/// The disk-quota accounting store.
pub struct Store {
    worker: TransactionWorker,
    calculator: Arc<dyn TilePageCalculator>,
}

impl Store {
    /// Open (or create) the store at `config.cache_root` and run startup
    /// reconciliation against `calculator`. Fails the whole open if
    /// reconciliation raises.
    pub fn open(config: StoreConfig, calculator: Arc<dyn TilePageCalculator>) -> Result<Self> {
        let engine = Arc::new(StoreEngine::open(&config.store_path())?);
        engine.reconcile(calculator.as_ref())?;
        let worker = TransactionWorker::spawn(engine, config.shutdown_deadline);
        Ok(Self { worker, calculator })
    }

    /// Bytes tracked by the sentinel global quota row.
    pub fn globally_used_quota(&self) -> Result<BigInt> {
        self.worker.submit_and_wait(|engine| {
            let q = engine
                .get_global_quota()?
                .ok_or_else(|| Error::Invariant("global quota row missing".to_string()))?;
            Ok(q.bytes)
        })
    }

    /// Quota row for `id`; fails with [`Error::NoSuchTileSet`] if absent.
    pub fn used_quota_by_tile_set_id(&self, id: &TileSetId) -> Result<Quota> {
        let id = id.clone();
        self.worker
            .submit_and_wait(move |engine| engine.get_quota_by_tile_set(&id)?.ok_or_else(|| Error::NoSuchTileSet(id.to_string())))
    }

    /// Aggregated bytes across every tile set of `layer`; fails with
    /// [`Error::NoSuchLayer`] if the layer has zero tile sets.
    pub fn used_quota_by_layer(&self, layer: &str) -> Result<BigInt> {
        let layer = layer.to_string();
        self.worker.submit_and_wait(move |engine| {
            let ids = engine.tile_set_ids_for_layer(&layer)?;
            if ids.is_empty() {
                return Err(Error::NoSuchLayer(layer.clone()));
            }
            let mut total = BigInt::from(0);
            for id in ids {
                if let Some(q) = engine.get_quota_by_tile_set(&id)? {
                    total += q.bytes;
                }
            }
            Ok(total)
        })
    }

    /// Snapshot of all tile sets excluding the sentinel. Bypasses the worker:
    /// best-effort, no cross-row consistency promise.
    pub fn tile_sets(&self) -> Result<Vec<TileSet>> {
        self.worker.engine().list_tile_sets()
    }

    /// TileSet by id; fails with [`Error::NoSuchTileSet`] if absent.
    pub fn tile_set_by_id(&self, id: &TileSetId) -> Result<TileSet> {
        let id = id.clone();
        self.worker
            .submit_and_wait(move |engine| engine.get_tile_set(&id)?.ok_or_else(|| Error::NoSuchTileSet(id.to_string())))
    }

    /// Cascade-delete every tile set of `layer`. Returns a handle
    /// resolving to the total bytes freed.
    pub fn delete_layer(&self, layer: &str) -> Result<PendingResult<BigInt>> {
        let layer = layer.to_string();
        self.worker.submit(move |engine| engine.cascade_delete_layer(&layer))
    }

    /// Apply a quota delta and per-page tile-count updates for `tile_set_id`.
    /// Synchronous.
    pub fn add_to_quota_and_tile_counts(&self, tile_set_id: &TileSetId, quota_diff: BigInt, pages: Vec<PagePayload>) -> Result<()> {
        let tile_set_id = tile_set_id.clone();
        let calculator = Arc::clone(&self.calculator);
        self.worker
            .submit_and_wait(move |engine| engine.add_to_quota_and_tile_counts(&tile_set_id, &quota_diff, &pages, calculator.as_ref()))
    }

    /// Record hits and access times for a batch of payloads. Returns
    /// a handle resolving to the updated `PageStats`, in payload order minus
    /// any skipped for a vanished tile set.
    pub fn add_hits_and_set_access_time(&self, payloads: Vec<HitPayload>) -> Result<PendingResult<Vec<PageStats>>> {
        self.worker.submit(move |engine| engine.add_hits_and_set_access_time(&payloads))
    }

    /// The most expirable page among `layers` under the LRU policy.
    pub fn least_recently_used_page(&self, layers: HashSet<String>) -> Result<Option<TilePage>> {
        self.worker.submit_and_wait(move |engine| engine.eviction_candidate(&layers, EvictionPolicy::Lru))
    }

    /// The most expirable page among `layers` under the LFU policy.
    pub fn least_frequently_used_page(&self, layers: HashSet<String>) -> Result<Option<TilePage>> {
        self.worker.submit_and_wait(move |engine| engine.eviction_candidate(&layers, EvictionPolicy::Lfu))
    }

    /// Mark `tile_page`'s stats truncated (fill-factor = 0).
    pub fn set_truncated(&self, tile_page: &TilePage) -> Result<Option<PageStats>> {
        let page_id = tile_page.id;
        self.worker.submit_and_wait(move |engine| engine.set_truncated(page_id))
    }

    /// Grid-coverage rectangles for `tile_page`, via the external calculator.
    /// Bypasses the worker: pure computation over already-resolved state.
    pub fn tiles_for_page(&self, tile_page: &TilePage) -> Result<Vec<GridCoverage>> {
        let engine = self.worker.engine();
        let tile_set = engine
            .get_tile_set(&tile_page.tile_set_id)?
            .ok_or_else(|| Error::NoSuchTileSet(tile_page.tile_set_id.to_string()))?;
        Ok(self.calculator.to_grid_coverage(&tile_set, tile_page))
    }

    /// Close the store: stop accepting submissions and drain the worker.
    /// Idempotent.
    pub fn close(&self) {
        self.worker.close();
    }
}
