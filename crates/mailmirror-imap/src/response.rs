//! Response data types.

use std::collections::BTreeMap;

use crate::types::{Flags, Uid, UidValidity};

/// FETCH results keyed by the UID the server labelled them with.
pub type FetchResponse = BTreeMap<Uid, Vec<FetchItem>>;

/// FETCH response item.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// RFC822 size.
    Rfc822Size(u32),
    /// Envelope.
    Envelope(Box<Envelope>),
    /// UID.
    Uid(Uid),
    /// BODY section.
    Body {
        /// Section specifier.
        section: Option<String>,
        /// Origin offset.
        origin: Option<u32>,
        /// Body data.
        data: Option<Vec<u8>>,
    },
    /// BODYSTRUCTURE.
    BodyStructure(BodyStructure),
    /// MODSEQ (CONDSTORE).
    ModSeq(u64),
}

impl FetchItem {
    /// Returns the flags among `items`, if the server sent them.
    #[must_use]
    pub fn flags(items: &[Self]) -> Option<&Flags> {
        items.iter().find_map(|item| match item {
            Self::Flags(flags) => Some(flags),
            _ => None,
        })
    }

    /// Returns the data of the body section named `section` (compared
    /// case-insensitively), if the server sent it and it was not NIL.
    #[must_use]
    pub fn section_data<'a>(items: &'a [Self], section: &str) -> Option<&'a [u8]> {
        items.iter().find_map(|item| match item {
            Self::Body {
                section: Some(s),
                data: Some(data),
                ..
            } if s.eq_ignore_ascii_case(section) => Some(data.as_slice()),
            _ => None,
        })
    }
}

/// Message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Email address from envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete).
    pub adl: Option<String>,
    /// Mailbox name (local part).
    pub mailbox: Option<String>,
    /// Host name (domain part).
    pub host: Option<String>,
}

impl Address {
    /// Returns the full email address.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// Body structure (simplified).
#[derive(Debug, Clone, PartialEq)]
pub enum BodyStructure {
    /// Single-part body.
    Basic {
        /// MIME type.
        media_type: String,
        /// MIME subtype.
        media_subtype: String,
        /// Body parameters.
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Body size in bytes.
        size: u32,
    },
    /// Message/RFC822 body.
    Message {
        /// Body parameters.
        params: Vec<(String, String)>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Body size in bytes.
        size: u32,
        /// Envelope of nested message.
        envelope: Box<Envelope>,
        /// Body structure of nested message.
        body: Box<Self>,
        /// Size in lines.
        lines: u32,
    },
    /// Text body.
    Text {
        /// Text subtype.
        subtype: String,
        /// Body parameters.
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Body size in bytes.
        size: u32,
        /// Size in lines.
        lines: u32,
    },
    /// Multipart body.
    Multipart {
        /// Child body parts.
        bodies: Vec<Self>,
        /// Multipart subtype.
        subtype: String,
    },
}

/// STATUS response item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusItem {
    /// Number of messages.
    Messages(u32),
    /// Next UID.
    UidNext(Uid),
    /// UIDVALIDITY value.
    UidValidity(UidValidity),
    /// Number of unseen messages.
    Unseen(u32),
    /// Highest mod-sequence.
    HighestModSeq(u64),
}

impl StatusItem {
    /// Returns the UIDVALIDITY among `items`, if the server sent it.
    #[must_use]
    pub fn uid_validity(items: &[Self]) -> Option<UidValidity> {
        items.iter().find_map(|item| match item {
            Self::UidValidity(v) => Some(*v),
            _ => None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Flag;

    #[test]
    fn address_email() {
        let addr = Address {
            name: Some("Alice".to_string()),
            adl: None,
            mailbox: Some("alice".to_string()),
            host: Some("example.com".to_string()),
        };
        assert_eq!(addr.email(), Some("alice@example.com".to_string()));
    }

    #[test]
    fn address_without_host_has_no_email() {
        let addr = Address {
            name: None,
            adl: None,
            mailbox: Some("undisclosed-recipients".to_string()),
            host: None,
        };
        assert!(addr.email().is_none());
    }

    #[test]
    fn section_data_matches_case_insensitively() {
        let items = vec![
            FetchItem::Flags(Flags::from_vec(vec![Flag::Seen])),
            FetchItem::Body {
                section: Some("header.fields (references)".to_string()),
                origin: None,
                data: Some(b"References: <a@b>\r\n".to_vec()),
            },
        ];
        assert_eq!(
            FetchItem::section_data(&items, "HEADER.FIELDS (REFERENCES)"),
            Some(&b"References: <a@b>\r\n"[..])
        );
        assert!(FetchItem::flags(&items).unwrap().is_seen());
    }

    #[test]
    fn section_data_ignores_nil() {
        let items = vec![FetchItem::Body {
            section: Some("2".to_string()),
            origin: None,
            data: None,
        }];
        assert!(FetchItem::section_data(&items, "2").is_none());
    }

    #[test]
    fn status_uid_validity() {
        let items = vec![
            StatusItem::Messages(3),
            StatusItem::UidValidity(UidValidity::new(77).unwrap()),
        ];
        assert_eq!(StatusItem::uid_validity(&items), UidValidity::new(77));
        assert!(StatusItem::uid_validity(&[StatusItem::Unseen(1)]).is_none());
    }
}
