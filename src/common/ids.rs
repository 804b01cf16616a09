//! Identifier newtypes for the stored entities.

use std::fmt;

/// Opaque tile-set identity (string-valued in the source system).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TileSetId(pub String);

impl TileSetId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        TileSetId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TileSetId {
    fn from(s: &str) -> Self {
        TileSetId(s.to_string())
    }
}

impl From<String> for TileSetId {
    fn from(s: String) -> Self {
        TileSetId(s)
    }
}

/// Machine-assigned identity for a [`crate::model::TilePage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PageId(pub u64);

impl PageId {
    #[inline]
    pub fn new(id: u64) -> Self {
        PageId(id)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}

/// Identity for a [`crate::model::PageStats`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct StatsId(pub u64);

impl StatsId {
    #[inline]
    pub fn new(id: u64) -> Self {
        StatsId(id)
    }
}

impl fmt::Display for StatsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stats({})", self.0)
    }
}

/// Identity for a [`crate::model::Quota`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct QuotaId(pub u64);

impl QuotaId {
    #[inline]
    pub fn new(id: u64) -> Self {
        QuotaId(id)
    }
}

impl fmt::Display for QuotaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quota({})", self.0)
    }
}
