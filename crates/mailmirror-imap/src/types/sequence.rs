//! UID sets for message ranges.

use super::Uid;

/// UID-based sequence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidSet {
    /// Single UID.
    Single(Uid),
    /// Range of UIDs (inclusive).
    Range(Uid, Uid),
    /// Range from start to highest UID.
    RangeFrom(Uid),
    /// All messages.
    All,
    /// Multiple UID specifications.
    Set(Vec<Self>),
}

impl UidSet {
    /// Creates a UID set from a single UID.
    #[must_use]
    pub fn single(uid: Uid) -> Self {
        Self::Single(uid)
    }

    /// Creates a UID set from a range.
    #[must_use]
    pub fn range(start: Uid, end: Uid) -> Self {
        Self::Range(start, end)
    }

    /// Builds the most compact set covering exactly `uids`.
    ///
    /// Input order and duplicates don't matter; consecutive UIDs collapse
    /// into ranges (`1,2,3,7` becomes `1:3,7`).
    #[must_use]
    pub fn from_uids(uids: &[Uid]) -> Self {
        let mut sorted = uids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut runs: Vec<Self> = Vec::new();
        let mut iter = sorted.into_iter();
        let Some(first) = iter.next() else {
            return Self::Set(runs);
        };

        let (mut start, mut end) = (first, first);
        for uid in iter {
            if end.next() == Some(uid) {
                end = uid;
            } else {
                runs.push(Self::run(start, end));
                start = uid;
                end = uid;
            }
        }
        runs.push(Self::run(start, end));

        if runs.len() == 1 {
            runs.remove(0)
        } else {
            Self::Set(runs)
        }
    }

    fn run(start: Uid, end: Uid) -> Self {
        if start == end {
            Self::Single(start)
        } else {
            Self::Range(start, end)
        }
    }

    /// Returns true if `uid` falls inside this set.
    ///
    /// Ranges are inclusive and accept their bounds in either order, as
    /// servers do.
    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        match self {
            Self::Single(u) => *u == uid,
            Self::Range(a, b) => (*a.min(b)..=*a.max(b)).contains(&uid),
            Self::RangeFrom(start) => uid >= *start,
            Self::All => true,
            Self::Set(items) => items.iter().any(|item| item.contains(uid)),
        }
    }

    /// Returns true if the set names no UIDs at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Set(items) => items.iter().all(Self::is_empty),
            _ => false,
        }
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "1:*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}
