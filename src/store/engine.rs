//! Concrete realization of the Persistent Store Engine on top of
//! `sled`, plus the transactional business logic for the store's operations.
//!
//! Every secondary index lives as a distinct byte-prefixed key
//! range inside one `sled::Tree` (see [`super::codec`]) so that every
//! multi-index mutation in this module fits inside a single
//! `sled::Tree::transaction` call.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use num_bigint::BigInt;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree};

use crate::calculator::TilePageCalculator;
use crate::common::config::GLOBAL_QUOTA_TILE_SET_ID;
use crate::common::{Error, PageId, QuotaId, Result, StatsId, TileSetId};
use crate::model::{PageStats, Quota, TilePage, TileSet};

use super::codec::{self, prefix};

/// One page's worth of tile additions, as passed to `addToQuotaAndTileCounts`.
#[derive(Debug, Clone)]
pub struct PagePayload {
    pub zoom_level: u8,
    pub page_x: i64,
    pub page_y: i64,
    pub num_tiles_added: i64,
}

/// One page's worth of hits, as passed to `addHitsAndSetAccessTime`.
/// Carries its own tile-set id since a batch may span several tile sets and
/// each payload is checked and skipped independently.
#[derive(Debug, Clone)]
pub struct HitPayload {
    pub tile_set_id: TileSetId,
    pub zoom_level: u8,
    pub page_x: i64,
    pub page_y: i64,
    pub num_hits: u64,
    pub last_access_time_millis: i64,
}

/// Eviction policy selecting which secondary index to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    Lru,
    Lfu,
}

fn abort(e: impl Into<Error>) -> ConflictableTransactionError<Error> {
    ConflictableTransactionError::Abort(e.into())
}

fn now_minutes() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    millis / 60_000
}

/// The embedded transactional store engine.
pub struct StoreEngine {
    db: sled::Db,
}

impl StoreEngine {
    /// Open (creating if absent) the PSE environment at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| Error::from(sled::Error::Io(e)))?;
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    // ========================================================================
    // Key helpers
    // ========================================================================

    fn tile_set_key(id: &TileSetId) -> Vec<u8> {
        [prefix::TILE_SET_BY_ID, id.as_str().as_bytes()].concat()
    }

    fn page_key_key(page_key: &str) -> Vec<u8> {
        [prefix::PAGE_BY_KEY, page_key.as_bytes()].concat()
    }

    fn page_id_key(id: PageId) -> Vec<u8> {
        [prefix::PAGE_BY_ID, &codec::encode_u64(id.0)[..]].concat()
    }

    fn stats_id_key(id: StatsId) -> Vec<u8> {
        [prefix::STATS_BY_ID, &codec::encode_u64(id.0)[..]].concat()
    }

    fn stats_by_page_id_key(id: PageId) -> Vec<u8> {
        [prefix::STATS_BY_PAGE_ID, &codec::encode_u64(id.0)[..]].concat()
    }

    fn quota_id_key(id: QuotaId) -> Vec<u8> {
        [prefix::QUOTA_BY_ID, &codec::encode_u64(id.0)[..]].concat()
    }

    fn quota_by_tile_set_key(id: &TileSetId) -> Vec<u8> {
        [prefix::QUOTA_BY_TILE_SET_ID, id.as_str().as_bytes()].concat()
    }

    // ========================================================================
    // Point reads (non-transactional; safe because the Transaction Worker is
    // the sole writer, see `worker.rs`)
    // ========================================================================

    pub fn get_tile_set(&self, id: &TileSetId) -> Result<Option<TileSet>> {
        match self.db.get(Self::tile_set_key(id))? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_quota_by_tile_set(&self, id: &TileSetId) -> Result<Option<Quota>> {
        let Some(qid_bytes) = self.db.get(Self::quota_by_tile_set_key(id))? else {
            return Ok(None);
        };
        let qid = QuotaId::new(codec::decode_u64(&qid_bytes));
        match self.db.get(Self::quota_id_key(qid))? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_global_quota(&self) -> Result<Option<Quota>> {
        self.get_quota_by_tile_set(&TileSetId::new(GLOBAL_QUOTA_TILE_SET_ID))
    }

    /// All tile sets excluding the sentinel (`tileSets()`). Best-effort
    /// snapshot: no cross-row consistency promise, matching the contract.
    pub fn list_tile_sets(&self) -> Result<Vec<TileSet>> {
        let mut out = Vec::new();
        for entry in self.db.scan_prefix(prefix::TILE_SET_BY_ID) {
            let (_, value) = entry?;
            let ts: TileSet = codec::decode(&value)?;
            if !ts.is_global_sentinel() {
                out.push(ts);
            }
        }
        Ok(out)
    }

    /// Tile-set ids belonging to `layer`, via the `TileSetsByLayer` index.
    pub fn tile_set_ids_for_layer(&self, layer: &str) -> Result<Vec<TileSetId>> {
        let (lo, hi) = codec::layer_key_bounds(layer);
        let lo_key = [prefix::TILE_SET_BY_LAYER, &lo[..]].concat();
        let hi_key = [prefix::TILE_SET_BY_LAYER, &hi[..]].concat();
        let mut out = Vec::new();
        for entry in self.db.range(lo_key..=hi_key) {
            let (_, value) = entry?;
            out.push(TileSetId::new(String::from_utf8_lossy(&value).into_owned()));
        }
        Ok(out)
    }

    /// Layer names currently present in `TileSetsByLayer`, excluding the sentinel.
    pub fn known_present_layers(&self) -> Result<BTreeSet<String>> {
        let mut layers = BTreeSet::new();
        for entry in self.db.scan_prefix(prefix::TILE_SET_BY_LAYER) {
            let (key, _) = entry?;
            let rest = &key[prefix::TILE_SET_BY_LAYER.len()..];
            if let Some(sep) = rest.iter().position(|&b| b == 0) {
                let layer = String::from_utf8_lossy(&rest[..sep]).into_owned();
                if layer != GLOBAL_QUOTA_TILE_SET_ID {
                    layers.insert(layer);
                }
            }
        }
        Ok(layers)
    }

    fn tile_page_by_key(&self, page_key: &str) -> Result<Option<TilePage>> {
        match self.db.get(Self::page_key_key(page_key))? {
            Some(id_bytes) => {
                let id = PageId::new(codec::decode_u64(&id_bytes));
                match self.db.get(Self::page_id_key(id))? {
                    Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
                    None => Ok(None),
                }
            }
            None => Ok(None),
        }
    }

    fn page_stats_by_page_id(&self, page_id: PageId) -> Result<Option<PageStats>> {
        let Some(sid_bytes) = self.db.get(Self::stats_by_page_id_key(page_id))? else {
            return Ok(None);
        };
        let sid = StatsId::new(codec::decode_u64(&sid_bytes));
        match self.db.get(Self::stats_id_key(sid))? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Tile pages belonging to `tile_set_id`, found via the `page_key` prefix.
    fn tile_pages_for_tile_set(&self, tile_set_id: &TileSetId) -> Result<Vec<TilePage>> {
        let mut key_prefix = Vec::new();
        key_prefix.extend_from_slice(prefix::PAGE_BY_KEY);
        key_prefix.extend_from_slice(tile_set_id.as_str().as_bytes());
        key_prefix.push(b'/');

        let mut out = Vec::new();
        for entry in self.db.scan_prefix(&key_prefix) {
            let (_, id_bytes) = entry?;
            let id = PageId::new(codec::decode_u64(&id_bytes));
            if let Some(bytes) = self.db.get(Self::page_id_key(id))? {
                out.push(codec::decode(&bytes)?);
            }
        }
        Ok(out)
    }

    // ========================================================================
    // Transactional writes inside `TransactionalTree` (shared by the ops below)
    // ========================================================================

    fn tx_get<T: serde::de::DeserializeOwned>(
        tx: &TransactionalTree,
        key: &[u8],
    ) -> ConflictableTransactionResult<Option<T>, Error> {
        match tx.get(key)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes).map_err(abort)?)),
            None => Ok(None),
        }
    }

    fn tx_put<T: serde::Serialize>(
        tx: &TransactionalTree,
        key: &[u8],
        value: &T,
    ) -> ConflictableTransactionResult<(), Error> {
        let bytes = codec::encode(value).map_err(abort)?;
        tx.insert(key, bytes)?;
        Ok(())
    }

    fn tx_put_tile_set(tx: &TransactionalTree, ts: &TileSet) -> ConflictableTransactionResult<(), Error> {
        Self::tx_put(tx, &Self::tile_set_key(&ts.id), ts)?;
        let layer_key = [
            prefix::TILE_SET_BY_LAYER,
            &codec::layer_key(&ts.layer_name, ts.id.as_str())[..],
        ]
        .concat();
        tx.insert(layer_key, ts.id.as_str().as_bytes())?;
        Ok(())
    }

    fn tx_delete_tile_set(tx: &TransactionalTree, ts: &TileSet) -> ConflictableTransactionResult<(), Error> {
        tx.remove(Self::tile_set_key(&ts.id))?;
        let layer_key = [
            prefix::TILE_SET_BY_LAYER,
            &codec::layer_key(&ts.layer_name, ts.id.as_str())[..],
        ]
        .concat();
        tx.remove(layer_key)?;
        Ok(())
    }

    fn tx_put_quota(tx: &TransactionalTree, q: &Quota) -> ConflictableTransactionResult<(), Error> {
        Self::tx_put(tx, &Self::quota_id_key(q.id), q)?;
        tx.insert(Self::quota_by_tile_set_key(&q.tile_set_id), &codec::encode_u64(q.id.0)[..])?;
        Ok(())
    }

    fn tx_delete_quota(tx: &TransactionalTree, q: &Quota) -> ConflictableTransactionResult<(), Error> {
        tx.remove(Self::quota_id_key(q.id))?;
        tx.remove(Self::quota_by_tile_set_key(&q.tile_set_id))?;
        Ok(())
    }

    fn tx_get_quota_by_tile_set(
        tx: &TransactionalTree,
        id: &TileSetId,
    ) -> ConflictableTransactionResult<Option<Quota>, Error> {
        let Some(qid_bytes) = tx.get(Self::quota_by_tile_set_key(id))? else {
            return Ok(None);
        };
        let qid = QuotaId::new(codec::decode_u64(&qid_bytes));
        Self::tx_get(tx, &Self::quota_id_key(qid))
    }

    fn tx_put_page(tx: &TransactionalTree, page: &TilePage) -> ConflictableTransactionResult<(), Error> {
        Self::tx_put(tx, &Self::page_id_key(page.id), page)?;
        tx.insert(Self::page_key_key(&page.page_key), &codec::encode_u64(page.id.0)[..])?;
        Ok(())
    }

    fn tx_remove_page(tx: &TransactionalTree, page: &TilePage) -> ConflictableTransactionResult<(), Error> {
        tx.remove(Self::page_id_key(page.id))?;
        tx.remove(Self::page_key_key(&page.page_key))?;
        Ok(())
    }

    fn tx_get_page_by_key(
        tx: &TransactionalTree,
        page_key: &str,
    ) -> ConflictableTransactionResult<Option<TilePage>, Error> {
        let Some(id_bytes) = tx.get(Self::page_key_key(page_key))? else {
            return Ok(None);
        };
        let id = PageId::new(codec::decode_u64(&id_bytes));
        Self::tx_get(tx, &Self::page_id_key(id))
    }

    fn tx_put_stats(tx: &TransactionalTree, old: Option<&PageStats>, stats: &PageStats) -> ConflictableTransactionResult<(), Error> {
        if let Some(old) = old {
            tx.remove(&score_key_for(prefix::STATS_BY_LRU, old.lru_score, old.id.0)[..])?;
            tx.remove(&score_key_for(prefix::STATS_BY_LFU, old.lfu_score, old.id.0)[..])?;
        }
        Self::tx_put(tx, &Self::stats_id_key(stats.id), stats)?;
        tx.insert(Self::stats_by_page_id_key(stats.page_id), &codec::encode_u64(stats.id.0)[..])?;
        tx.insert(
            &score_key_for(prefix::STATS_BY_LRU, stats.lru_score, stats.id.0)[..],
            &codec::encode_u64(stats.id.0)[..],
        )?;
        tx.insert(
            &score_key_for(prefix::STATS_BY_LFU, stats.lfu_score, stats.id.0)[..],
            &codec::encode_u64(stats.id.0)[..],
        )?;
        Ok(())
    }

    fn tx_get_stats_by_page_id(
        tx: &TransactionalTree,
        page_id: PageId,
    ) -> ConflictableTransactionResult<Option<PageStats>, Error> {
        let Some(sid_bytes) = tx.get(Self::stats_by_page_id_key(page_id))? else {
            return Ok(None);
        };
        let sid = StatsId::new(codec::decode_u64(&sid_bytes));
        Self::tx_get(tx, &Self::stats_id_key(sid))
    }

    fn tx_remove_stats(tx: &TransactionalTree, stats: &PageStats) -> ConflictableTransactionResult<(), Error> {
        tx.remove(Self::stats_id_key(stats.id))?;
        tx.remove(Self::stats_by_page_id_key(stats.page_id))?;
        tx.remove(&score_key_for(prefix::STATS_BY_LRU, stats.lru_score, stats.id.0)[..])?;
        tx.remove(&score_key_for(prefix::STATS_BY_LFU, stats.lfu_score, stats.id.0)[..])?;
        Ok(())
    }

    // ========================================================================
    // Startup Reconciler
    // ========================================================================

    /// Run startup reconciliation against `calculator`'s reported layers.
    pub fn reconcile(&self, calculator: &dyn TilePageCalculator) -> Result<()> {
        let already_initialized = self.get_global_quota()?.is_some();
        let known = calculator.layer_names();
        let present = self.known_present_layers()?;

        let stale_layers: Vec<String> = present.difference(&known).cloned().collect();
        for layer in &stale_layers {
            if let Err(e) = self.cascade_delete_layer(layer) {
                log::warn!("startup reconciliation: failed to cascade-delete stale layer {layer}: {e}");
            }
        }

        let mut to_insert: Vec<TileSet> = Vec::new();
        for layer in &known {
            for ts in calculator.tile_sets_for(layer) {
                if self.get_tile_set(&ts.id)?.is_none() {
                    to_insert.push(ts);
                }
            }
        }

        // Ids must be allocated before entering the transaction: a
        // `TransactionalTree` only sees the keyspace, not `Db::generate_id`.
        let sentinel_qid = if already_initialized { None } else { Some(QuotaId::new(self.db.generate_id()?)) };
        let insert_qids: Vec<QuotaId> = (0..to_insert.len())
            .map(|_| self.db.generate_id().map(QuotaId::new))
            .collect::<sled::Result<_>>()?;

        self.db
            .transaction(|tx| {
                if let Some(qid) = sentinel_qid {
                    let sentinel = TileSet::global_sentinel();
                    Self::tx_put_tile_set(tx, &sentinel)?;
                    let global = Quota::zero(qid, sentinel.id.clone());
                    Self::tx_put_quota(tx, &global)?;
                }

                for (ts, qid) in to_insert.iter().zip(insert_qids.iter()) {
                    Self::tx_put_tile_set(tx, ts)?;
                    let q = Quota::zero(*qid, ts.id.clone());
                    Self::tx_put_quota(tx, &q)?;
                }

                Ok(())
            })
            .map_err(Error::from)?;

        Ok(())
    }

    // ========================================================================
    // Cascade delete of a layer
    // ========================================================================

    /// Cascade-delete every tile set (and its pages/stats/quota) belonging to
    /// `layer`, folding the freed bytes back out of the global quota. Returns
    /// the total bytes freed.
    pub fn cascade_delete_layer(&self, layer: &str) -> Result<BigInt> {
        let tile_set_ids = self.tile_set_ids_for_layer(layer)?;
        if tile_set_ids.is_empty() {
            return Ok(BigInt::from(0));
        }

        let mut tile_sets = Vec::new();
        let mut pages_by_tile_set = Vec::new();
        for id in &tile_set_ids {
            let Some(ts) = self.get_tile_set(id)? else { continue };
            let pages = self.tile_pages_for_tile_set(id)?;
            pages_by_tile_set.push(pages);
            tile_sets.push(ts);
        }

        let total_freed = self
            .db
            .transaction(|tx| {
                let mut freed_total = BigInt::from(0);

                let global_id = TileSetId::new(GLOBAL_QUOTA_TILE_SET_ID);
                let mut global = Self::tx_get_quota_by_tile_set(tx, &global_id)?
                    .ok_or_else(|| abort(Error::Invariant("global quota row missing".into())))?;

                for (ts, pages) in tile_sets.iter().zip(pages_by_tile_set.iter()) {
                    let freed = match Self::tx_get_quota_by_tile_set(tx, &ts.id)? {
                        Some(q) => q.bytes.clone(),
                        None => {
                            log::warn!("cascade delete: tile set {} has no quota row, treating as zero", ts.id);
                            BigInt::from(0)
                        }
                    };

                    for page in pages {
                        if let Some(stats) = Self::tx_get_stats_by_page_id(tx, page.id)? {
                            Self::tx_remove_stats(tx, &stats)?;
                        }
                        Self::tx_remove_page(tx, page)?;
                    }

                    if let Some(q) = Self::tx_get_quota_by_tile_set(tx, &ts.id)? {
                        Self::tx_delete_quota(tx, &q)?;
                    }
                    Self::tx_delete_tile_set(tx, ts)?;

                    freed_total += freed;
                }

                global.bytes -= &freed_total;
                Self::tx_put_quota(tx, &global)?;

                Ok(freed_total)
            })
            .map_err(Error::from)?;

        Ok(total_freed)
    }

    // ========================================================================
    // addToQuotaAndTileCounts
    // ========================================================================

    /// Apply a quota delta and per-page tile-count updates for `tile_set_id`.
    /// No-op (logged) if the tile set was concurrently deleted.
    pub fn add_to_quota_and_tile_counts(
        &self,
        tile_set_id: &TileSetId,
        quota_diff: &BigInt,
        pages: &[PagePayload],
        calculator: &dyn TilePageCalculator,
    ) -> Result<()> {
        let Some(tile_set) = self.get_tile_set(tile_set_id)? else {
            log::info!("addToQuotaAndTileCounts: tile set {tile_set_id} absent, no-op");
            return Ok(());
        };

        let created_at = now_minutes();
        let tiles_per_page: Vec<BigInt> = pages
            .iter()
            .map(|p| calculator.tiles_per_page(&tile_set, p.zoom_level))
            .collect();

        // Pre-allocate ids outside the transaction (see reconcile()'s comment);
        // unused ones (existing page/stats rows) are simply never written.
        let fresh_page_ids: Vec<PageId> = (0..pages.len())
            .map(|_| self.db.generate_id().map(PageId::new))
            .collect::<sled::Result<_>>()?;
        let fresh_stats_ids: Vec<StatsId> = (0..pages.len())
            .map(|_| self.db.generate_id().map(StatsId::new))
            .collect::<sled::Result<_>>()?;

        self.db
            .transaction(|tx| {
                let mut ts_quota = Self::tx_get_quota_by_tile_set(tx, tile_set_id)?
                    .ok_or_else(|| abort(Error::NoSuchTileSet(tile_set_id.to_string())))?;
                ts_quota.add(quota_diff);
                Self::tx_put_quota(tx, &ts_quota)?;

                let global_id = TileSetId::new(GLOBAL_QUOTA_TILE_SET_ID);
                let mut global = Self::tx_get_quota_by_tile_set(tx, &global_id)?
                    .ok_or_else(|| abort(Error::Invariant("global quota row missing".into())))?;
                global.add(quota_diff);
                Self::tx_put_quota(tx, &global)?;

                for ((payload, tpp), (fresh_page_id, fresh_stats_id)) in pages
                    .iter()
                    .zip(tiles_per_page.iter())
                    .zip(fresh_page_ids.iter().zip(fresh_stats_ids.iter()))
                {
                    let page_key = TilePage::derive_page_key(tile_set_id, payload.zoom_level, payload.page_x, payload.page_y);

                    let page = match Self::tx_get_page_by_key(tx, &page_key)? {
                        Some(p) => p,
                        None => {
                            let p = TilePage::new(*fresh_page_id, tile_set_id.clone(), payload.zoom_level, payload.page_x, payload.page_y, created_at);
                            Self::tx_put_page(tx, &p)?;
                            p
                        }
                    };

                    let old_stats = Self::tx_get_stats_by_page_id(tx, page.id)?;
                    let mut stats = match &old_stats {
                        Some(s) => s.clone(),
                        None => PageStats::new(*fresh_stats_id, page.id, created_at),
                    };
                    let before = stats.clone();
                    stats.add_tiles(payload.num_tiles_added, tpp);
                    if old_stats.is_some() || stats != before {
                        Self::tx_put_stats(tx, old_stats.as_ref(), &stats)?;
                    }
                }

                Ok(())
            })
            .map_err(Error::from)?;

        Ok(())
    }

    // ========================================================================
    // addHitsAndSetAccessTime
    // ========================================================================

    /// Record hits and access time for each payload; payloads whose tile set
    /// has vanished are skipped individually, the rest of the batch still
    /// commits.
    pub fn add_hits_and_set_access_time(&self, payloads: &[HitPayload]) -> Result<Vec<PageStats>> {
        let created_at = now_minutes();

        let mut live = Vec::with_capacity(payloads.len());
        for payload in payloads {
            if self.get_tile_set(&payload.tile_set_id)?.is_some() {
                live.push(payload);
            } else {
                log::info!(
                    "addHitsAndSetAccessTime: tile set {} absent, skipping payload",
                    payload.tile_set_id
                );
            }
        }

        let fresh_page_ids: Vec<PageId> = (0..live.len())
            .map(|_| self.db.generate_id().map(PageId::new))
            .collect::<sled::Result<_>>()?;
        let fresh_stats_ids: Vec<StatsId> = (0..live.len())
            .map(|_| self.db.generate_id().map(StatsId::new))
            .collect::<sled::Result<_>>()?;

        let result = self
            .db
            .transaction(|tx| {
                let mut updated = Vec::new();

                for (payload, (fresh_page_id, fresh_stats_id)) in
                    live.iter().zip(fresh_page_ids.iter().zip(fresh_stats_ids.iter()))
                {
                    let page_key =
                        TilePage::derive_page_key(&payload.tile_set_id, payload.zoom_level, payload.page_x, payload.page_y);

                    let page = match Self::tx_get_page_by_key(tx, &page_key)? {
                        Some(p) => p,
                        None => {
                            let p = TilePage::new(
                                *fresh_page_id,
                                payload.tile_set_id.clone(),
                                payload.zoom_level,
                                payload.page_x,
                                payload.page_y,
                                created_at,
                            );
                            Self::tx_put_page(tx, &p)?;
                            p
                        }
                    };

                    let last_access_minutes = payload.last_access_time_millis / 60_000;

                    let old_stats = Self::tx_get_stats_by_page_id(tx, page.id)?;
                    let mut stats = match &old_stats {
                        Some(s) => s.clone(),
                        None => PageStats::new(*fresh_stats_id, page.id, page.created_at_minutes),
                    };
                    let before = stats.clone();
                    stats.add_hits(payload.num_hits, last_access_minutes, page.created_at_minutes);
                    if old_stats.is_some() || stats != before {
                        Self::tx_put_stats(tx, old_stats.as_ref(), &stats)?;
                    }
                    updated.push(stats);
                }

                Ok(updated)
            })
            .map_err(Error::from)?;

        Ok(result)
    }

    // ========================================================================
    // Eviction candidate query
    // ========================================================================

    /// Find the most expirable page (by the chosen policy) among `layers`.
    pub fn eviction_candidate(&self, layers: &HashSet<String>, policy: EvictionPolicy) -> Result<Option<TilePage>> {
        let mut tile_set_ids: HashSet<TileSetId> = HashSet::new();
        for layer in layers {
            tile_set_ids.extend(self.tile_set_ids_for_layer(layer)?);
        }
        if tile_set_ids.is_empty() {
            return Ok(None);
        }

        let prefix_bytes = match policy {
            EvictionPolicy::Lru => prefix::STATS_BY_LRU,
            EvictionPolicy::Lfu => prefix::STATS_BY_LFU,
        };

        for entry in self.db.scan_prefix(prefix_bytes) {
            let (_, sid_bytes) = entry?;
            let sid = StatsId::new(codec::decode_u64(&sid_bytes));
            let Some(bytes) = self.db.get(Self::stats_id_key(sid))? else {
                continue;
            };
            let stats: PageStats = codec::decode(&bytes)?;
            if stats.fill_factor <= 0.0 {
                continue;
            }

            let Some(page_bytes) = self.db.get(Self::page_id_key(stats.page_id))? else {
                continue;
            };
            let page: TilePage = codec::decode(&page_bytes)?;
            if tile_set_ids.contains(&page.tile_set_id) {
                return Ok(Some(page));
            }
        }

        Ok(None)
    }

    // ========================================================================
    // setTruncated
    // ========================================================================

    /// Mark the PageStats for `page_id` truncated (fill_factor = 0); returns
    /// the updated stats, or `None` if no stats exist for the page.
    pub fn set_truncated(&self, page_id: PageId) -> Result<Option<PageStats>> {
        let result = self
            .db
            .transaction(|tx| {
                let Some(old_stats) = Self::tx_get_stats_by_page_id(tx, page_id)? else {
                    return Ok(None);
                };
                let mut stats = old_stats.clone();
                stats.truncate();
                Self::tx_put_stats(tx, Some(&old_stats), &stats)?;
                Ok(Some(stats))
            })
            .map_err(Error::from)?;

        Ok(result)
    }

    /// Look up a tile page by its natural coordinates (used by the facade to
    /// translate caller-facing coordinates into a [`PageId`] for `setTruncated`
    /// and `tilesForPage`).
    pub fn find_tile_page(&self, tile_set_id: &TileSetId, zoom_level: u8, page_x: i64, page_y: i64) -> Result<Option<TilePage>> {
        let page_key = TilePage::derive_page_key(tile_set_id, zoom_level, page_x, page_y);
        self.tile_page_by_key(&page_key)
    }

    pub fn get_page_stats(&self, page_id: PageId) -> Result<Option<PageStats>> {
        self.page_stats_by_page_id(page_id)
    }
}

fn score_key_for(index_prefix: &[u8], score: f64, stats_id: u64) -> Vec<u8> {
    [index_prefix, &codec::score_key(score, stats_id)[..]].concat()
}
