//! diskquota-store - a durable disk-quota accounting store for a tile cache.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         diskquota-store                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Store Facade (facade::Store)                │   │
//! │  │   globallyUsedQuota / usedQuotaByLayer / deleteLayer ...  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Transaction Worker (worker::TransactionWorker)    │   │
//! │  │      single-threaded executor, serializes all mutation   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │          Store Engine (store::StoreEngine)                │   │
//! │  │   reconciler, cascade delete, quota/stats ops, eviction   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Persistent Store Engine (sled::Db)              │   │
//! │  │   one Tree, byte-prefixed per index (store::codec)        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - shared primitives (ids, error, config)
//! - [`model`] - entity schema: TileSet, TilePage, PageStats, Quota
//! - [`calculator`] - external collaborator contracts (tile page calculator, cache directory locator)
//! - [`store`] - the PSE realization on `sled` and its transactional operations
//! - [`worker`] - the single-threaded Transaction Worker
//! - [`facade`] - the public [`Store`] API
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use diskquota_store::{Store, StoreConfig};
//! use diskquota_store::calculator::TilePageCalculator;
//! # fn get_calculator() -> Arc<dyn TilePageCalculator> { unimplemented!() }
//!
//! let config = StoreConfig::new("/var/cache/tiles");
//! let store = Store::open(config, get_calculator()).unwrap();
//! let used = store.globally_used_quota().unwrap();
//! ```

pub mod calculator;
pub mod common;
pub mod facade;
pub mod model;
pub mod store;
pub mod worker;

pub use common::{Error, PageId, QuotaId, Result, StatsId, StoreConfig, TileSetId};
pub use facade::Store;
pub use model::{PageStats, Quota, TilePage, TileSet};
