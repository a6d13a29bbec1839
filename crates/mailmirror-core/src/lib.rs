//! # mailmirror-core
//!
//! Mailbox synchronization engine.
//!
//! This crate provides:
//! - **Folder views** - an ordered mirror of a mailbox's UIDs with
//!   offset-stable, newest-first pagination
//! - **Sync** - new/deleted detection, UIDVALIDITY handling and read-state
//!   refresh against the server
//! - **Header cache** - a storage port with in-memory and `SQLite` backends
//! - **Part fetching** - bounded retries for servers that drop body data
//!
//! The IMAP transport and the storage backend are consumed through the
//! [`Connection`] and [`CacheStore`] traits.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod cache;
pub mod config;
pub mod connection;
mod error;
pub mod folder;
pub mod headers;

pub use account::Account;
pub use cache::{
    AddressRecord, CacheRepository, CacheStore, FolderCache, HeaderRecord, MemoryCache, PartMeta,
};
pub use config::{SyncConfig, SyncConfigBuilder};
pub use connection::Connection;
pub use error::{Error, Result};
pub use folder::{Folder, Page, SyncOutcome};
