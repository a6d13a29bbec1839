//! Command-related type definitions.

use crate::types::UidSet;

/// STATUS attributes to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAttribute {
    /// Number of messages.
    Messages,
    /// Next UID.
    UidNext,
    /// UIDVALIDITY.
    UidValidity,
    /// Number of unseen messages.
    Unseen,
    /// Highest mod-sequence.
    HighestModSeq,
}

impl StatusAttribute {
    /// Returns the attribute as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
            Self::HighestModSeq => "HIGHESTMODSEQ",
        }
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// RFC822 size.
    Rfc822Size,
    /// Envelope structure.
    Envelope,
    /// Body structure.
    BodyStructure,
    /// UID.
    Uid,
    /// Body section.
    Body {
        /// Section specifier.
        section: Option<String>,
        /// Peek (don't set \Seen).
        peek: bool,
        /// Partial fetch range.
        partial: Option<(u32, u32)>,
    },
}

impl FetchAttribute {
    /// A full, non-peeking fetch of one body section.
    ///
    /// Servers mark the message `\Seen` when it is read this way.
    #[must_use]
    pub fn section(section: impl Into<String>) -> Self {
        Self::Body {
            section: Some(section.into()),
            peek: false,
            partial: None,
        }
    }

    /// A peeking fetch of one body section, optionally truncated.
    #[must_use]
    pub fn peek_section(section: impl Into<String>, partial: Option<(u32, u32)>) -> Self {
        Self::Body {
            section: Some(section.into()),
            peek: true,
            partial,
        }
    }
}

/// SEARCH criteria.
///
/// Serialized in the protocol's operator-first (Polish) notation:
/// `Or(a, b)` is written `OR a b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages with \Flagged flag.
    Flagged,
    /// Messages without \Seen flag.
    Unseen,
    /// Messages with \Seen flag.
    Seen,
    /// UID set.
    UidSet(UidSet),
    /// Subject contains text.
    Subject(String),
    /// From contains text.
    From(String),
    /// To contains text.
    To(String),
    /// Body contains text.
    Body(String),
    /// Text in header or body.
    Text(String),
    /// Messages since date (`d-Mon-yyyy`).
    Since(String),
    /// Messages before date (`d-Mon-yyyy`).
    Before(String),
    /// Provider-side raw search expression (Gmail `X-GM-RAW`).
    GmailRaw(String),
    /// AND of criteria.
    And(Vec<Self>),
    /// OR of criteria.
    Or(Box<Self>, Box<Self>),
    /// NOT of criteria.
    Not(Box<Self>),
}
