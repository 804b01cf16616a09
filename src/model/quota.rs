//! Quota — arbitrary-precision byte usage for a tile set (or the global sentinel).

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::common::{QuotaId, TileSetId};

/// Bytes currently used by a tile set (or, for the sentinel id, the whole store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub id: QuotaId,
    pub tile_set_id: TileSetId,
    pub bytes: BigInt,
}

impl Quota {
    pub fn new(id: QuotaId, tile_set_id: TileSetId, bytes: BigInt) -> Self {
        Self {
            id,
            tile_set_id,
            bytes,
        }
    }

    pub fn zero(id: QuotaId, tile_set_id: TileSetId) -> Self {
        Self::new(id, tile_set_id, BigInt::from(0))
    }

    /// Add `diff` (may be negative) to `bytes` in place.
    pub fn add(&mut self, diff: &BigInt) {
        self.bytes += diff;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_quota() {
        let q = Quota::zero(QuotaId::new(1), TileSetId::new("t1"));
        assert_eq!(q.bytes, BigInt::from(0));
    }

    #[test]
    fn test_add_negative() {
        let mut q = Quota::new(QuotaId::new(1), TileSetId::new("t1"), BigInt::from(1024));
        q.add(&BigInt::from(-1024));
        assert_eq!(q.bytes, BigInt::from(0));
    }

    #[test]
    fn test_add_positive() {
        let mut q = Quota::zero(QuotaId::new(1), TileSetId::new("t1"));
        q.add(&BigInt::from(512));
        q.add(&BigInt::from(512));
        assert_eq!(q.bytes, BigInt::from(1024));
    }
}
