//! TileSet — a concrete (layer, grid, format, parameters) tuple.

use serde::{Deserialize, Serialize};

use crate::common::config::GLOBAL_QUOTA_TILE_SET_ID;
use crate::common::TileSetId;

/// A tile set: the unit that storage accounting is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSet {
    pub id: TileSetId,
    pub layer_name: String,
    pub gridset_id: String,
    pub format: String,
    pub parameters_hash: String,
}

impl TileSet {
    pub fn new(
        id: impl Into<TileSetId>,
        layer_name: impl Into<String>,
        gridset_id: impl Into<String>,
        format: impl Into<String>,
        parameters_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            layer_name: layer_name.into(),
            gridset_id: gridset_id.into(),
            format: format.into(),
            parameters_hash: parameters_hash.into(),
        }
    }

    /// The distinguished sentinel tile set that backs the global quota row.
    pub fn global_sentinel() -> Self {
        Self {
            id: TileSetId::new(GLOBAL_QUOTA_TILE_SET_ID),
            layer_name: GLOBAL_QUOTA_TILE_SET_ID.to_string(),
            gridset_id: String::new(),
            format: String::new(),
            parameters_hash: String::new(),
        }
    }

    pub fn is_global_sentinel(&self) -> bool {
        self.id.as_str() == GLOBAL_QUOTA_TILE_SET_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_sentinel() {
        let t = TileSet::global_sentinel();
        assert!(t.is_global_sentinel());
        assert_eq!(t.layer_name, GLOBAL_QUOTA_TILE_SET_ID);
    }

    #[test]
    fn test_non_sentinel() {
        let t = TileSet::new("t1", "layer1", "EPSG:4326", "png", "hash1");
        assert!(!t.is_global_sentinel());
    }
}
