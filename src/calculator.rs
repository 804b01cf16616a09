//! External collaborators consumed through their contracts.
//!
//! The tile page calculator and cache directory locator are oracles supplied
//! by the embedding application; this crate only depends on the trait
//! boundaries below and never implements the real grid math itself.

use std::collections::BTreeSet;

use num_bigint::BigInt;

use crate::model::{TilePage, TileSet};

/// A rectangle of the tile grid, as reported by `toGridCoverage`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCoverage {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
    pub zoom_level: u8,
}

/// Oracle yielding tile sets for a layer and tile counts per page.
///
/// Implementations are expected to be cheap and side-effect free; the store
/// calls these synchronously from inside transactional units of work.
pub trait TilePageCalculator: Send + Sync {
    /// All layer names this calculator currently knows about.
    fn layer_names(&self) -> BTreeSet<String>;

    /// The tile sets that belong to `layer`.
    fn tile_sets_for(&self, layer: &str) -> Vec<TileSet>;

    /// Number of tiles that fit in one page of `tile_set` at `zoom_level`.
    fn tiles_per_page(&self, tile_set: &TileSet, zoom_level: u8) -> BigInt;

    /// Grid-coverage rectangles covered by `tile_page`.
    fn to_grid_coverage(&self, tile_set: &TileSet, tile_page: &TilePage) -> Vec<GridCoverage>;
}

/// Oracle supplying the on-disk cache root.
pub trait CacheDirectoryLocator: Send + Sync {
    fn default_path(&self) -> std::path::PathBuf;
}
