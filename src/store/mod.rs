//! The Persistent Store Engine: key/value encoding plus the
//! transactional operations for every index and business rule the store needs.

mod codec;
mod engine;

pub use engine::{EvictionPolicy, HitPayload, PagePayload, StoreEngine};
