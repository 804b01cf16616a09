//! Key and value encoding for the PSE.
//!
//! The store uses a single `sled::Tree` as its physical keyspace and realizes
//! every typed index as a distinct byte-prefixed key range
//! inside it — this keeps every mutation across indexes inside one
//! `sled::Tree::transaction` call instead of fighting `sled`'s bounded
//! tuple-arity `Transactional` impl for a dozen separate trees.

use serde::{de::DeserializeOwned, Serialize};

use crate::common::Result;

pub mod prefix {
    pub const TILE_SET_BY_ID: &[u8] = b"ts\0";
    pub const TILE_SET_BY_LAYER: &[u8] = b"tl\0";
    pub const PAGE_BY_ID: &[u8] = b"pg\0";
    pub const PAGE_BY_KEY: &[u8] = b"pk\0";
    pub const STATS_BY_ID: &[u8] = b"ps\0";
    pub const STATS_BY_PAGE_ID: &[u8] = b"pp\0";
    pub const STATS_BY_LRU: &[u8] = b"pl\0";
    pub const STATS_BY_LFU: &[u8] = b"pf\0";
    pub const QUOTA_BY_ID: &[u8] = b"q\0";
    pub const QUOTA_BY_TILE_SET_ID: &[u8] = b"qt\0";
    pub const META: &[u8] = b"meta\0";
}

/// Serialize a value with `bincode` for storage as a `sled` value.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Deserialize a `bincode`-encoded `sled` value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Big-endian encoding of a `u64` id so lexicographic byte order matches
/// numeric order (used for `PageId`/`StatsId`/`QuotaId` keys).
#[inline]
pub fn encode_u64(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

#[inline]
pub fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

/// Map an `f64` score onto a `u64` whose unsigned byte order matches the
/// score's natural total order (NaN sorts after all finite values). This is
/// the fixed-point fallback needed when the engine only supports
/// byte-ordered keys, which is always true for `sled`.
pub fn encode_score_sortable(score: f64) -> [u8; 8] {
    let bits = if score.is_nan() {
        u64::MAX
    } else {
        let bits = score.to_bits();
        if score.is_sign_negative() {
            !bits
        } else {
            bits | (1u64 << 63)
        }
    };
    bits.to_be_bytes()
}

/// Build a `PageStatsByLRU`/`PageStatsByLFU` key: the sortable score followed
/// by the stats id as a tiebreak, so distinct rows with equal scores remain
/// individually addressable and deterministically ordered by key, then by
/// primary id as a tiebreak.
pub fn score_key(score: f64, stats_id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&encode_score_sortable(score));
    key[8..].copy_from_slice(&encode_u64(stats_id));
    key
}

/// Build a `TileSetsByLayer` key: `layer_name` then a NUL separator then the
/// tile-set id, keeping all tile sets of a layer contiguous under ascending
/// scan while remaining unique per tile set.
pub fn layer_key(layer_name: &str, tile_set_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(layer_name.len() + 1 + tile_set_id.len());
    key.extend_from_slice(layer_name.as_bytes());
    key.push(0);
    key.extend_from_slice(tile_set_id.as_bytes());
    key
}

/// Lower/upper bounds for an ascending scan of all `TileSetsByLayer` entries
/// for exactly `layer_name`.
pub fn layer_key_bounds(layer_name: &str) -> (Vec<u8>, Vec<u8>) {
    let mut lo = Vec::with_capacity(layer_name.len() + 1);
    lo.extend_from_slice(layer_name.as_bytes());
    lo.push(0);
    let mut hi = lo.clone();
    hi.push(0xff);
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_roundtrip_order() {
        let a = encode_u64(1);
        let b = encode_u64(2);
        assert!(a < b);
        assert_eq!(decode_u64(&a), 1);
    }

    #[test]
    fn test_score_sortable_order() {
        let neg = encode_score_sortable(-5.0);
        let zero = encode_score_sortable(0.0);
        let pos = encode_score_sortable(5.0);
        assert!(neg < zero);
        assert!(zero < pos);
    }

    #[test]
    fn test_score_sortable_monotone_within_sign() {
        let a = encode_score_sortable(-100.0);
        let b = encode_score_sortable(-1.0);
        assert!(a < b, "-100 should sort before -1");

        let c = encode_score_sortable(1.0);
        let d = encode_score_sortable(100.0);
        assert!(c < d);
    }

    #[test]
    fn test_nan_sorts_last() {
        let finite = encode_score_sortable(f64::MAX);
        let nan = encode_score_sortable(f64::NAN);
        assert!(finite < nan);
    }

    #[test]
    fn test_score_key_tiebreak() {
        let k1 = score_key(1.0, 1);
        let k2 = score_key(1.0, 2);
        assert!(k1 < k2);
    }

    #[test]
    fn test_layer_key_bounds_exclude_other_layers() {
        let (lo, hi) = layer_key_bounds("layerA");
        let k_a = layer_key("layerA", "t1");
        let k_b = layer_key("layerAB", "t1");
        assert!(k_a.as_slice() >= lo.as_slice() && k_a.as_slice() <= hi.as_slice());
        assert!(!(k_b.as_slice() >= lo.as_slice() && k_b.as_slice() <= hi.as_slice()));
    }
}
