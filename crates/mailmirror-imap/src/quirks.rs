//! Server quirks and workarounds.
//!
//! Some servers (Outlook/Office 365 in particular) answer UID FETCH with
//! entries labelled by the wrong UID, or answer a SEARCH issued right after
//! new mail arrived with fewer UIDs than the mailbox now holds. The fixups
//! here realign those responses before any sync logic sees them.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::warn;

use crate::response::{FetchItem, FetchResponse};
use crate::types::Uid;

/// A fetch response that cannot be aligned onto the requested UIDs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// None of the returned UIDs were requested and the counts differ, so
    /// there is no safe way to relabel them.
    #[error("fetch response shares no UID with the request ({requested} requested, {returned} returned)")]
    NoOverlap {
        /// Number of UIDs requested.
        requested: usize,
        /// Number of entries returned.
        returned: usize,
    },
}

/// Aligns a FETCH response back onto exactly the requested UIDs.
///
/// Entries labelled with a requested UID are kept as-is. Entries labelled
/// with a UID that was never requested are relabelled, in ascending order,
/// onto the requested UIDs the response is missing; whatever is left over
/// is dropped. Requested UIDs with no data simply stay absent.
///
/// # Errors
///
/// Returns [`ReconcileError::NoOverlap`] when every returned entry is
/// unrequested and their number differs from the request.
pub fn reconcile_fetch_response(
    requested: &[Uid],
    response: FetchResponse,
) -> Result<FetchResponse, ReconcileError> {
    let wanted: BTreeSet<Uid> = requested.iter().copied().collect();
    let returned = response.len();

    let (mut aligned, stray): (FetchResponse, FetchResponse) = response
        .into_iter()
        .partition(|(uid, _)| wanted.contains(uid));

    if stray.is_empty() {
        return Ok(aligned);
    }

    if aligned.is_empty() && stray.len() != wanted.len() {
        return Err(ReconcileError::NoOverlap {
            requested: wanted.len(),
            returned,
        });
    }

    let missing: Vec<Uid> = wanted
        .iter()
        .filter(|uid| !aligned.contains_key(uid))
        .copied()
        .collect();

    warn!(
        stray = stray.len(),
        missing = missing.len(),
        "Server returned unrequested UIDs, relabelling"
    );

    let dropped = stray.len().saturating_sub(missing.len());
    for ((_, items), uid) in stray.into_iter().zip(missing) {
        aligned.insert(uid, relabel(items, uid));
    }
    if dropped > 0 {
        warn!(dropped, "Dropped fetch entries with no requested UID left to map onto");
    }

    Ok(aligned)
}

fn relabel(items: Vec<FetchItem>, uid: Uid) -> Vec<FetchItem> {
    items
        .into_iter()
        .map(|item| match item {
            FetchItem::Uid(_) => FetchItem::Uid(uid),
            other => other,
        })
        .collect()
}

/// Pads a "new UIDs" search result up to the count the server announced.
///
/// When fewer UIDs than `expected` were reported, consecutive UIDs above
/// the highest reported one are added until `expected` is reached. UIDs
/// are assigned in ascending order, so the unreported messages are the
/// newest ones. An empty result has nothing to anchor on and is returned
/// unchanged.
#[must_use]
pub fn pad_new_uids(expected: usize, mut uids: BTreeSet<Uid>) -> BTreeSet<Uid> {
    let Some(mut highest) = uids.last().copied() else {
        return uids;
    };

    let missing = expected.saturating_sub(uids.len());
    if missing > 0 {
        warn!(
            reported = uids.len(),
            expected, "Server under-reported new UIDs, padding"
        );
    }

    for _ in 0..missing {
        let Some(next) = highest.next() else {
            break;
        };
        uids.insert(next);
        highest = next;
    }

    uids
}
