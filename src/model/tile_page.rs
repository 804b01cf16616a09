//! TilePage — a rectangular block of tiles at one zoom level.

use serde::{Deserialize, Serialize};

use crate::common::{PageId, TileSetId};

/// A tile page: the unit of eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePage {
    pub id: PageId,
    pub tile_set_id: TileSetId,
    pub zoom_level: u8,
    pub page_x: i64,
    pub page_y: i64,
    /// Deterministic function of (tile_set_id, zoom, x, y); unique across all pages.
    pub page_key: String,
    /// Minutes since epoch, truncated, at creation time.
    pub created_at_minutes: i64,
}

impl TilePage {
    /// Compute the deterministic page key used as the unique lookup key in
    /// `PageByKey`.
    pub fn derive_page_key(tile_set_id: &TileSetId, zoom_level: u8, page_x: i64, page_y: i64) -> String {
        format!("{}/{}/{}/{}", tile_set_id.as_str(), zoom_level, page_x, page_y)
    }

    /// Build a new `TilePage` with a freshly assigned id and `created_at_minutes`
    /// set to `now_minutes`. The id must come from the store's id allocator.
    pub fn new(
        id: PageId,
        tile_set_id: TileSetId,
        zoom_level: u8,
        page_x: i64,
        page_y: i64,
        now_minutes: i64,
    ) -> Self {
        let page_key = Self::derive_page_key(&tile_set_id, zoom_level, page_x, page_y);
        Self {
            id,
            tile_set_id,
            zoom_level,
            page_x,
            page_y,
            page_key,
            created_at_minutes: now_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key_deterministic() {
        let tsid = TileSetId::new("t1");
        let k1 = TilePage::derive_page_key(&tsid, 4, 10, 20);
        let k2 = TilePage::derive_page_key(&tsid, 4, 10, 20);
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_page_key_distinguishes_coordinates() {
        let tsid = TileSetId::new("t1");
        let k1 = TilePage::derive_page_key(&tsid, 4, 10, 20);
        let k2 = TilePage::derive_page_key(&tsid, 4, 10, 21);
        assert_ne!(k1, k2);
    }
}
