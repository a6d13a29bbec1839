//! Folder sync engine.
//!
//! A [`Folder`] mirrors one mailbox, or one search over it, as an ordered
//! UID set plus cached headers. It also remembers how many of the newest
//! messages have already been handed out, so that repeated [`Folder::page`]
//! calls walk the mailbox newest-first without the caller tracking a
//! cursor, and so that mail arriving or disappearing between calls does not
//! make the cursor jump.
//!
//! # Concurrency
//!
//! Operations that touch the UID set or the offset ([`Folder::sync`],
//! [`Folder::page`], the deleting and flagging mutations) are serialized by
//! a per-view lock. Header and part fetches do not take it; their cache
//! writes are per-UID and idempotent.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use mailmirror_imap::{
    FetchAttribute, FetchItem, FetchResponse, Flag, SearchCriteria, StatusAttribute, StatusItem,
    Uid, UidSet, pad_new_uids, reconcile_fetch_response,
};
use mailmirror_mime::TransferEncoding;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::cache::{CacheStore, FolderCache, HeaderRecord, PartMeta};
use crate::connection::Connection;
use crate::headers::{assemble_header, header_fetch_attributes};
use crate::{Error, Result};

/// Result of one [`Folder::sync`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Headers of messages that appeared since the last pass.
    pub new_headers: Vec<HeaderRecord>,
    /// UIDs that disappeared (or were invalidated) since the last pass.
    pub deleted: Vec<Uid>,
    /// Watched UIDs the server now reports as `\Seen`.
    pub read: Vec<Uid>,
}

/// One page of headers from [`Folder::page`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Headers of the page.
    pub headers: Vec<HeaderRecord>,
    /// Offset before this page was taken.
    pub previous_offset: usize,
    /// Offset after this page was taken.
    pub offset: usize,
}

#[derive(Debug)]
struct FolderState {
    exists: bool,
    uids: BTreeSet<Uid>,
    offset: usize,
}

/// A synchronized view over one mailbox, optionally narrowed by a search.
#[derive(Debug)]
pub struct Folder<C, S> {
    name: String,
    alias: String,
    query: Option<String>,
    account: Arc<Account<C, S>>,
    cache: Arc<FolderCache<S>>,
    state: Mutex<FolderState>,
}

impl<C: Connection, S: CacheStore> Folder<C, S> {
    /// Opens a view over `name`.
    ///
    /// Views over the same mailbox share one header cache; only the view
    /// without a `query` persists its UID set. When the mailbox exists the
    /// UID set is loaded, from the cache if possible.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check or the UID search fails.
    pub async fn open(
        name: impl Into<String>,
        alias: impl Into<String>,
        account: Arc<Account<C, S>>,
        query: Option<String>,
    ) -> Result<Self> {
        let name = name.into();
        let cache = account.folder_cache(&name).await;
        let folder = Self {
            name,
            alias: alias.into(),
            query,
            account,
            cache,
            state: Mutex::new(FolderState {
                exists: false,
                uids: BTreeSet::new(),
                offset: 0,
            }),
        };

        {
            let mut state = folder.state.lock().await;
            state.exists = folder.check_exists().await?;
            if state.exists {
                state.uids = folder.resolve_uids(true).await?;
            }
        }

        Ok(folder)
    }

    /// Server name of the mailbox.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name of the mailbox.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Search narrowing this view, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Whether this view is a search over the mailbox.
    #[must_use]
    pub const fn is_query(&self) -> bool {
        self.query.is_some()
    }

    /// Whether the mailbox existed when last checked.
    pub async fn exists(&self) -> bool {
        self.state.lock().await.exists
    }

    /// Number of UIDs in the view; 0 when the mailbox does not exist.
    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        if state.exists { state.uids.len() } else { 0 }
    }

    /// Whether the view holds no UIDs.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of newest messages already handed out by [`Folder::page`].
    pub async fn offset(&self) -> usize {
        self.state.lock().await.offset
    }

    /// Snapshot of the UID set.
    pub async fn uids(&self) -> BTreeSet<Uid> {
        self.state.lock().await.uids.clone()
    }

    async fn check_exists(&self) -> Result<bool> {
        Ok(self.account.connection().folder_exists(&self.name).await?)
    }

    /// Determines the UIDs this view covers.
    ///
    /// With `use_cache`, a canonical view returns its persisted set when one
    /// is stored and non-empty. Otherwise the server is searched: query
    /// views with the server's raw search extension when available, else by
    /// subject or body; canonical views over the configured day window.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache or the search fails.
    pub async fn resolve_uids(&self, use_cache: bool) -> Result<BTreeSet<Uid>> {
        if use_cache
            && !self.is_query()
            && let Some(cached) = self.cache.get_uids().await?
            && !cached.is_empty()
        {
            debug!(
                account = %self.account.name(),
                folder = %self.name,
                count = cached.len(),
                "Loaded cached message UIDs"
            );
            return Ok(cached);
        }

        let criteria = match &self.query {
            Some(query) => query_criteria(query, self.account.supports_raw_search().await?),
            None => canonical_criteria(self.account.config().sync_days, Local::now().date_naive()),
        };

        debug!(
            account = %self.account.name(),
            folder = %self.name,
            %criteria,
            "Searching message UIDs"
        );
        let uids: BTreeSet<Uid> = self
            .account
            .connection()
            .search(&self.name, &criteria)
            .await?
            .into_iter()
            .collect();
        debug!(
            account = %self.account.name(),
            folder = %self.name,
            count = uids.len(),
            "Fetched message UIDs"
        );

        Ok(uids)
    }

    /// Compares the server's UIDVALIDITY with the stored token.
    ///
    /// Returns `true` when they match. On a mismatch the mailbox cache is
    /// dropped (if a token was stored), the new token stored, and `false`
    /// returned. The mailbox is not selected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentServerState`] when STATUS lacks
    /// UIDVALIDITY, or the underlying connection or cache error.
    pub async fn check_cache_validity(&self) -> Result<bool> {
        let status = self
            .account
            .connection()
            .folder_status(&self.name, &[StatusAttribute::UidValidity])
            .await?;
        let remote = StatusItem::uid_validity(&status).ok_or_else(|| {
            Error::InconsistentServerState(format!("STATUS for {} lacks UIDVALIDITY", self.name))
        })?;
        let local = self.cache.get_uid_validity().await?;

        if local == Some(remote) {
            return Ok(true);
        }

        if let Some(local) = local {
            warn!(
                account = %self.account.name(),
                folder = %self.name,
                %local,
                %remote,
                "UIDVALIDITY changed, dropping cache"
            );
            self.cache.invalidate().await?;
        }
        self.cache.set_uid_validity(remote).await?;
        Ok(false)
    }

    /// Brings the view up to date with the server.
    ///
    /// `expected_new` is the number of new messages the caller was told
    /// about; when the server reports fewer, the newest are filled in.
    /// `watch` lists UIDs whose read state the caller wants rechecked.
    ///
    /// # Errors
    ///
    /// Returns an error if any server or cache operation fails.
    pub async fn sync(
        &self,
        expected_new: Option<usize>,
        watch: Option<&[Uid]>,
    ) -> Result<SyncOutcome> {
        let mut state = self.state.lock().await;

        if !state.exists {
            state.exists = self.check_exists().await?;
            if !state.exists {
                return Ok(SyncOutcome::default());
            }
        }

        let live = self.resolve_uids(false).await?;
        let valid = self.check_cache_validity().await?;

        let (mut new, deleted) = if valid {
            let new: BTreeSet<Uid> = live.difference(&state.uids).copied().collect();
            let deleted: BTreeSet<Uid> = state.uids.difference(&live).copied().collect();
            state.offset = corrected_offset(&state.uids, state.offset, &deleted);
            (new, deleted)
        } else {
            let deleted = std::mem::take(&mut state.uids);
            let new = if live.len() > state.offset {
                if state.offset == 0 {
                    state.offset = self.account.config().batch_size.min(live.len());
                }
                live.iter().rev().take(state.offset).copied().collect()
            } else {
                state.offset = live.len();
                live.clone()
            };
            (new, deleted)
        };
        let changed = !valid || !new.is_empty() || !deleted.is_empty();

        state.uids = live;
        if changed {
            self.persist_uids(&state.uids).await?;
        }

        for &uid in &deleted {
            self.cache.delete_header(uid).await?;
        }

        if let Some(expected) = expected_new
            && new.len() < expected
        {
            new = pad_new_uids(expected, new);
        }

        debug!(
            account = %self.account.name(),
            folder = %self.name,
            new = new.len(),
            deleted = deleted.len(),
            "Synced message UIDs"
        );

        let new_headers = if new.is_empty() {
            Vec::new()
        } else {
            let newest_first: Vec<Uid> = new.iter().rev().copied().collect();
            self.fetch_headers(&newest_first).await?
        };

        let read = match watch {
            Some(watch) => {
                let watched: Vec<Uid> = watch
                    .iter()
                    .filter(|uid| state.uids.contains(*uid))
                    .copied()
                    .collect();
                self.refresh_read(&watched).await?
            }
            None => Vec::new(),
        };

        Ok(SyncOutcome {
            new_headers,
            deleted: deleted.into_iter().collect(),
            read,
        })
    }

    /// Fetches FLAGS for `uids` and returns those now `\Seen`, marking them
    /// read in the cache.
    async fn refresh_read(&self, uids: &[Uid]) -> Result<Vec<Uid>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            account = %self.account.name(),
            folder = %self.name,
            count = uids.len(),
            "Fetching flags"
        );
        let response = self
            .account
            .connection()
            .fetch(&self.name, &UidSet::from_uids(uids), &[FetchAttribute::Flags])
            .await?;

        let mut read = Vec::new();
        for (uid, items) in self.reconcile(uids, response)? {
            if FetchItem::flags(&items).is_some_and(mailmirror_imap::Flags::is_seen) {
                self.cache.add_flag(uid, Flag::Seen).await?;
                read.push(uid);
            }
        }
        Ok(read)
    }

    /// Adjusts the offset for UIDs about to leave the set.
    ///
    /// The offset drops by the number of removed UIDs ranked above the first
    /// not-yet-shown message, so what the caller has already seen does not
    /// shift. Removing UIDs that are not in the set changes nothing.
    pub async fn correct_offset_for_removal(&self, removed: &BTreeSet<Uid>) {
        let mut state = self.state.lock().await;
        state.offset = corrected_offset(&state.uids, state.offset, removed);
    }

    /// Returns the next page of headers, newest first.
    ///
    /// `reset` restarts from the newest message. `batch_size` defaults to
    /// the configured size. The offset advances by the number of headers
    /// actually returned.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching headers fails.
    pub async fn page(&self, reset: bool, batch_size: Option<usize>) -> Result<Page> {
        let mut state = self.state.lock().await;

        if !state.exists {
            return Ok(Page::default());
        }

        if reset {
            debug!(account = %self.account.name(), folder = %self.name, "Resetting offset");
            state.offset = 0;
        }

        let batch_size = batch_size
            .filter(|&size| size > 0)
            .unwrap_or(self.account.config().batch_size);
        let slice: Vec<Uid> = state
            .uids
            .iter()
            .rev()
            .skip(state.offset)
            .take(batch_size)
            .copied()
            .collect();

        if slice.is_empty() {
            return Ok(Page {
                headers: Vec::new(),
                previous_offset: state.offset,
                offset: state.offset,
            });
        }

        let headers = self.fetch_headers(&slice).await?;
        let previous_offset = state.offset;
        state.offset += headers.len();

        Ok(Page {
            headers,
            previous_offset,
            offset: state.offset,
        })
    }

    /// Returns headers for `uids`: cached ones first, then the rest fetched
    /// in one round trip and cached, each group in request order.
    ///
    /// UIDs the server has no data for are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails, cannot be aligned with the
    /// request, or lacks body structures.
    pub async fn fetch_headers(&self, uids: &[Uid]) -> Result<Vec<HeaderRecord>> {
        let mut headers = Vec::with_capacity(uids.len());
        let mut missing = Vec::new();

        for &uid in uids {
            match self.cache.get_header(uid).await? {
                Some(header) => headers.push(header),
                None => missing.push(uid),
            }
        }

        debug!(
            account = %self.account.name(),
            folder = %self.name,
            fetching = missing.len(),
            cached = headers.len(),
            "Fetching message headers"
        );

        if missing.is_empty() {
            return Ok(headers);
        }

        let response = self
            .account
            .connection()
            .fetch(&self.name, &UidSet::from_uids(&missing), &header_fetch_attributes())
            .await?;

        let mut response = self.reconcile(&missing, response)?;
        for uid in missing {
            let Some(items) = response.remove(&uid) else {
                continue;
            };
            let header = assemble_header(&self.name, uid, &items)?;
            self.cache.set_header(&header).await?;
            headers.push(header);
        }

        Ok(headers)
    }

    /// Returns the body parts of a message, fetching its header if needed.
    ///
    /// Returns `None` when the server has no such message.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching the header fails.
    pub async fn header_parts(&self, uid: Uid) -> Result<Option<BTreeMap<String, PartMeta>>> {
        Ok(self
            .fetch_headers(&[uid])
            .await?
            .into_iter()
            .next()
            .map(|header| header.parts))
    }

    /// Fetches body part `part` of every message in `uids`, transfer-decoded.
    ///
    /// Messages the server answers without data are asked for again, up to
    /// the configured number of retries. Every message returned is marked
    /// `\Seen` in the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentServerState`] when a message has no
    /// part `part`, and [`Error::MissingProtocolData`] when the server still
    /// withholds a part after the last retry.
    pub async fn fetch_part(&self, uids: &[Uid], part: &str) -> Result<BTreeMap<Uid, Vec<u8>>> {
        let attributes = [FetchAttribute::section(part)];
        let max_attempts = self.account.config().max_fetch_attempts;
        let mut pending: Vec<Uid> = uids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut parts = BTreeMap::new();

        for attempt in 0..=max_attempts {
            if pending.is_empty() {
                break;
            }

            debug!(
                account = %self.account.name(),
                folder = %self.name,
                count = pending.len(),
                part,
                attempt,
                "Fetching message parts"
            );
            let response = self
                .account
                .connection()
                .fetch(&self.name, &UidSet::from_uids(&pending), &attributes)
                .await?;
            let response = self.reconcile(&pending, response)?;

            let mut still_missing = Vec::new();
            for uid in pending {
                let meta = self
                    .header_parts(uid)
                    .await?
                    .and_then(|mut meta| meta.remove(part))
                    .ok_or_else(|| {
                        Error::InconsistentServerState(format!(
                            "message {uid} in {} has no part {part}",
                            self.name
                        ))
                    })?;

                let Some(data) = response
                    .get(&uid)
                    .and_then(|items| FetchItem::section_data(items, part))
                else {
                    still_missing.push(uid);
                    continue;
                };

                let decoded = TransferEncoding::parse(&meta.encoding).decode(data)?;
                parts.insert(uid, decoded);
                self.cache.add_flag(uid, Flag::Seen).await?;
            }

            if !still_missing.is_empty() {
                warn!(
                    account = %self.account.name(),
                    folder = %self.name,
                    missing = still_missing.len(),
                    part,
                    attempt,
                    "Server omitted part data"
                );
            }
            pending = still_missing;
        }

        if let Some(&uid) = pending.first() {
            return Err(Error::MissingProtocolData {
                uid,
                part: part.to_string(),
            });
        }

        Ok(parts)
    }

    /// Deletes messages on the server and drops them from the view.
    ///
    /// # Errors
    ///
    /// Returns an error if the server or the cache fails.
    pub async fn delete_messages(&self, uids: &[Uid]) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;

        debug!(
            account = %self.account.name(),
            folder = %self.name,
            count = uids.len(),
            "Deleting messages"
        );
        self.account
            .connection()
            .delete_messages(&self.name, &UidSet::from_uids(uids))
            .await?;

        self.remove_uids(&mut state, uids).await
    }

    /// Moves messages to `destination` (a folder name or alias), creating
    /// it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the server or the cache fails.
    pub async fn move_messages(&self, uids: &[Uid], destination: &str) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }
        let destination = self.account.ensure_folder_exists(destination).await?;
        let mut state = self.state.lock().await;

        info!(
            account = %self.account.name(),
            folder = %self.name,
            count = uids.len(),
            destination = %destination,
            "Moving messages"
        );
        let set = UidSet::from_uids(uids);
        let connection = self.account.connection();
        connection.copy(&self.name, &set, &destination).await?;
        connection.delete_messages(&self.name, &set).await?;

        self.remove_uids(&mut state, uids).await
    }

    /// Copies messages to `destination` (a folder name or alias), creating
    /// it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn copy_messages(&self, uids: &[Uid], destination: &str) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }
        let destination = self.account.ensure_folder_exists(destination).await?;

        debug!(
            account = %self.account.name(),
            folder = %self.name,
            count = uids.len(),
            destination = %destination,
            "Copying messages"
        );
        self.account
            .connection()
            .copy(&self.name, &UidSet::from_uids(uids), &destination)
            .await?;
        Ok(())
    }

    /// Stars messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the server or the cache fails.
    pub async fn star_messages(&self, uids: &[Uid]) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }
        let _state = self.state.lock().await;

        debug!(
            account = %self.account.name(),
            folder = %self.name,
            count = uids.len(),
            "Starring messages"
        );
        self.account
            .connection()
            .add_flags(&self.name, &UidSet::from_uids(uids), &[Flag::Flagged])
            .await?;
        for &uid in uids {
            self.cache.add_flag(uid, Flag::Flagged).await?;
        }
        Ok(())
    }

    /// Unstars messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the server or the cache fails.
    pub async fn unstar_messages(&self, uids: &[Uid]) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }
        let _state = self.state.lock().await;

        debug!(
            account = %self.account.name(),
            folder = %self.name,
            count = uids.len(),
            "Unstarring messages"
        );
        self.account
            .connection()
            .remove_flags(&self.name, &UidSet::from_uids(uids), &[Flag::Flagged])
            .await?;
        for &uid in uids {
            self.cache.remove_flag(uid, &Flag::Flagged).await?;
        }
        Ok(())
    }

    /// Corrects the offset, then drops `uids` from the set and the cache.
    async fn remove_uids(&self, state: &mut FolderState, uids: &[Uid]) -> Result<()> {
        let removed: BTreeSet<Uid> = uids.iter().copied().collect();
        state.offset = corrected_offset(&state.uids, state.offset, &removed);

        for uid in &removed {
            state.uids.remove(uid);
            self.cache.delete_header(*uid).await?;
        }
        self.persist_uids(&state.uids).await
    }

    async fn persist_uids(&self, uids: &BTreeSet<Uid>) -> Result<()> {
        if self.is_query() {
            return Ok(());
        }
        self.cache.set_uids(uids).await
    }

    fn reconcile(&self, requested: &[Uid], response: FetchResponse) -> Result<FetchResponse> {
        reconcile_fetch_response(requested, response)
            .map_err(|e| Error::InconsistentServerState(format!("{e} in {}", self.name)))
    }
}

/// Offset after `removed` leaves `uids`, keeping the shown messages stable.
///
/// The boundary is the first message not yet shown (rank `offset` in
/// descending order); each removed member of `uids` above it lowers the
/// offset by one. With everything shown, the offset becomes the size of
/// what remains.
#[must_use]
pub fn corrected_offset(uids: &BTreeSet<Uid>, offset: usize, removed: &BTreeSet<Uid>) -> usize {
    let removed_present = removed.iter().filter(|uid| uids.contains(*uid)).count();
    if removed_present == 0 {
        return offset;
    }

    match uids.iter().rev().nth(offset) {
        Some(&boundary) => {
            let above = removed
                .iter()
                .filter(|&&uid| uid > boundary && uids.contains(&uid))
                .count();
            offset.saturating_sub(above)
        }
        None => uids.len() - removed_present,
    }
}

/// Search for a query view.
#[must_use]
pub fn query_criteria(query: &str, raw_search: bool) -> SearchCriteria {
    if raw_search {
        SearchCriteria::GmailRaw(query.to_string())
    } else {
        SearchCriteria::Or(
            Box::new(SearchCriteria::Subject(query.to_string())),
            Box::new(SearchCriteria::Body(query.to_string())),
        )
    }
}

/// Search for a canonical view: the last `sync_days` days before `today`,
/// or everything when `sync_days` is 0.
#[must_use]
pub fn canonical_criteria(sync_days: u32, today: NaiveDate) -> SearchCriteria {
    if sync_days == 0 {
        return SearchCriteria::All;
    }
    match today.checked_sub_days(Days::new(u64::from(sync_days))) {
        Some(since) => SearchCriteria::Since(since.format("%-d-%b-%Y").to_string()),
        None => SearchCriteria::All,
    }
}
