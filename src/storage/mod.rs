//! Storage layer
//!
//! The entry store, the per-entry sorted-set index, and the background
//! expiration sweep.

pub mod expiration;
pub mod memory;
pub mod zset;

pub use expiration::ExpirationSweeper;
pub use memory::{MemoryStore, StoredValue, ValueType};
pub use zset::SortedSet;
