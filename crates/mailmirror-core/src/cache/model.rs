//! Cache data models.

use std::collections::BTreeMap;

use mailmirror_imap::{Address, Flags, Uid};
use serde::{Deserialize, Serialize};

/// An address as shown in a header listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Display name, RFC 2047 decoded.
    pub name: Option<String>,
    /// `mailbox@host`, when both halves are present.
    pub email: Option<String>,
}

impl From<&Address> for AddressRecord {
    fn from(address: &Address) -> Self {
        Self {
            name: address
                .name
                .as_deref()
                .map(mailmirror_mime::encoding::decode_rfc2047),
            email: address.email(),
        }
    }
}

/// Metadata for one body part, keyed by IMAP part number in
/// [`HeaderRecord::parts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartMeta {
    /// MIME type, lowercase (`text`, `image`, ...).
    pub media_type: String,
    /// MIME subtype, lowercase.
    pub subtype: String,
    /// Content-Transfer-Encoding, lowercase.
    pub encoding: String,
    /// `charset` body parameter, if any.
    pub charset: Option<String>,
    /// Encoded size in bytes.
    pub size: u32,
    /// File name from the `name` parameter, if any.
    pub name: Option<String>,
}

/// Cached metadata for one message.
///
/// Flags are the only field updated locally; everything else changes only
/// when the header is fetched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecord {
    /// Message UID.
    pub uid: Uid,
    /// Mailbox the message lives in.
    pub folder: String,
    /// Message flags.
    pub flags: Flags,
    /// Subject, RFC 2047 decoded.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<AddressRecord>,
    /// To addresses.
    pub to: Vec<AddressRecord>,
    /// Cc addresses.
    pub cc: Vec<AddressRecord>,
    /// Bcc addresses.
    pub bcc: Vec<AddressRecord>,
    /// Reply-To addresses.
    pub reply_to: Vec<AddressRecord>,
    /// Date header, as sent.
    pub date: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-IDs from the References header.
    pub references: Vec<String>,
    /// RFC822 size in bytes.
    pub size: u32,
    /// Short plain-text preview of the first part.
    pub excerpt: Option<String>,
    /// Body parts keyed by IMAP part number (`"1"`, `"2.1"`, ...).
    pub parts: BTreeMap<String, PartMeta>,
}

impl HeaderRecord {
    /// Returns the metadata of `part`, if the message has it.
    #[must_use]
    pub fn part(&self, part: &str) -> Option<&PartMeta> {
        self.parts.get(part)
    }

    /// Whether the message has been read.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.flags.is_seen()
    }

    /// Whether the message is starred.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.flags.is_flagged()
    }
}
