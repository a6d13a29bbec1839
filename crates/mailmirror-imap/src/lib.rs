//! # mailmirror-imap
//!
//! IMAP protocol vocabulary shared by the mailbox synchronization engine,
//! following RFC 9051 (`IMAP4rev2`) with RFC 3501 (`IMAP4rev1`) naming.
//!
//! This crate does not open sockets. It defines the values that cross the
//! boundary between a sync engine and whatever transport drives the server:
//!
//! - **Identifiers**: [`Uid`], [`UidValidity`] and compressed [`UidSet`]s
//! - **Commands**: [`SearchCriteria`], [`FetchAttribute`] and
//!   [`StatusAttribute`], serialized in the protocol's native
//!   operator-first syntax
//! - **Responses**: [`FetchItem`], [`Envelope`], [`BodyStructure`] and
//!   [`StatusItem`], plus the per-UID [`FetchResponse`] map
//! - **Quirks**: fixups that realign misbehaving server responses onto the
//!   UIDs that were actually requested
//!
//! ## Example
//!
//! ```
//! use mailmirror_imap::{SearchCriteria, Uid, UidSet};
//!
//! let query = SearchCriteria::Or(
//!     Box::new(SearchCriteria::Subject("invoice".into())),
//!     Box::new(SearchCriteria::Body("invoice".into())),
//! );
//! assert_eq!(query.to_string(), "OR SUBJECT invoice BODY invoice");
//!
//! let uids: Vec<Uid> = [1, 2, 3, 7].into_iter().filter_map(Uid::new).collect();
//! assert_eq!(UidSet::from_uids(&uids).to_string(), "1:3,7");
//! ```
//!
//! ## Modules
//!
//! - [`command`]: search criteria, fetch/status attributes and serialization
//! - [`response`]: fetch/status response data
//! - [`quirks`]: server-specific workarounds
//! - [`types`]: identifiers, flags and capabilities

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
mod error;
pub mod quirks;
pub mod response;
pub mod types;

pub use command::{FetchAttribute, SearchCriteria, StatusAttribute};
pub use error::{Error, Result};
pub use quirks::{ReconcileError, pad_new_uids, reconcile_fetch_response};
pub use response::{Address, BodyStructure, Envelope, FetchItem, FetchResponse, StatusItem};
pub use types::{Capability, Flag, Flags, Uid, UidSet, UidValidity};

/// IMAP protocol version the vocabulary follows.
pub const IMAP_VERSION: &str = "IMAP4rev2";
