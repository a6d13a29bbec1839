//! Mirrored folder state.
//!
//! This module provides the cache port the sync engine writes through,
//! plus an in-memory and a `SQLite` backend.

mod memory;
mod model;
mod repository;
mod store;

pub use memory::MemoryCache;
pub use model::{AddressRecord, HeaderRecord, PartMeta};
pub use repository::CacheRepository;
pub use store::{CacheStore, FolderCache};
