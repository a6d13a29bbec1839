//! IMAP command vocabulary.
//!
//! This module provides the search, fetch and status arguments a sync
//! engine hands to its transport, and their wire serialization.

mod serialize;
mod types;

pub use types::{FetchAttribute, SearchCriteria, StatusAttribute};

use serialize::{
    write_fetch_attribute, write_fetch_attributes, write_search_criteria, write_status_attributes,
};

/// Serializes a FETCH attribute list as sent after `UID FETCH <set>`.
#[must_use]
pub fn fetch_attributes_to_string(attrs: &[FetchAttribute]) -> String {
    let mut buf = Vec::new();
    write_fetch_attributes(&mut buf, attrs);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serializes a STATUS attribute list as sent after `STATUS <mailbox>`.
#[must_use]
pub fn status_attributes_to_string(attrs: &[StatusAttribute]) -> String {
    let mut buf = Vec::new();
    write_status_attributes(&mut buf, attrs);
    String::from_utf8_lossy(&buf).into_owned()
}

impl std::fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = Vec::new();
        write_search_criteria(&mut buf, self);
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

impl std::fmt::Display for FetchAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = Vec::new();
        write_fetch_attribute(&mut buf, self);
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}
