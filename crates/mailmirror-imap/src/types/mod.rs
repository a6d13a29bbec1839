//! Core IMAP types.
//!
//! This module defines the identifiers, flags and capabilities used
//! throughout the sync engine, following RFC 9051 (`IMAP4rev2`) and
//! RFC 3501 (`IMAP4rev1`).

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod sequence;

pub use capability::Capability;
pub use flags::{Flag, Flags};
pub use identifiers::{Uid, UidValidity};
pub use sequence::UidSet;
