//! Cache port.
//!
//! [`CacheStore`] is the storage backend seen by the engine; every call is
//! keyed by mailbox name. [`FolderCache`] binds a store to one mailbox and
//! is shared by all views over it.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use mailmirror_imap::{Flag, Uid, UidValidity};
use tracing::debug;

use super::model::HeaderRecord;
use crate::Result;

/// Storage backend for mirrored folder state.
///
/// Implementations must tolerate concurrent calls; the engine only relies
/// on each individual call being atomic.
pub trait CacheStore: Send + Sync {
    /// Returns the cached header of `uid` in `folder`.
    fn get_header(
        &self,
        folder: &str,
        uid: Uid,
    ) -> impl Future<Output = Result<Option<HeaderRecord>>> + Send;

    /// Stores a header, replacing any previous copy.
    fn set_header(
        &self,
        folder: &str,
        header: &HeaderRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Drops the cached header of `uid`, if any.
    fn delete_header(&self, folder: &str, uid: Uid) -> impl Future<Output = Result<()>> + Send;

    /// Returns the persisted UID set, or `None` when never stored.
    fn get_uids(&self, folder: &str)
    -> impl Future<Output = Result<Option<BTreeSet<Uid>>>> + Send;

    /// Persists the UID set of `folder`.
    fn set_uids(
        &self,
        folder: &str,
        uids: &BTreeSet<Uid>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Returns the stored UIDVALIDITY token.
    fn get_uid_validity(
        &self,
        folder: &str,
    ) -> impl Future<Output = Result<Option<UidValidity>>> + Send;

    /// Stores the UIDVALIDITY token.
    fn set_uid_validity(
        &self,
        folder: &str,
        validity: UidValidity,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Drops every header, the UID set and the token of `folder`.
    fn invalidate(&self, folder: &str) -> impl Future<Output = Result<()>> + Send;
}

/// A [`CacheStore`] bound to one mailbox.
#[derive(Debug)]
pub struct FolderCache<S> {
    folder: String,
    store: Arc<S>,
}

impl<S: CacheStore> FolderCache<S> {
    /// Binds `store` to `folder`.
    #[must_use]
    pub fn new(folder: impl Into<String>, store: Arc<S>) -> Self {
        Self {
            folder: folder.into(),
            store,
        }
    }

    /// Mailbox this cache belongs to.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Returns the cached header of `uid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn get_header(&self, uid: Uid) -> Result<Option<HeaderRecord>> {
        self.store.get_header(&self.folder, uid).await
    }

    /// Stores a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn set_header(&self, header: &HeaderRecord) -> Result<()> {
        self.store.set_header(&self.folder, header).await
    }

    /// Drops the cached header of `uid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn delete_header(&self, uid: Uid) -> Result<()> {
        self.store.delete_header(&self.folder, uid).await
    }

    /// Returns the persisted UID set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn get_uids(&self) -> Result<Option<BTreeSet<Uid>>> {
        self.store.get_uids(&self.folder).await
    }

    /// Persists the UID set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn set_uids(&self, uids: &BTreeSet<Uid>) -> Result<()> {
        debug!(folder = %self.folder, count = uids.len(), "Persisting UID set");
        self.store.set_uids(&self.folder, uids).await
    }

    /// Returns the stored UIDVALIDITY token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn get_uid_validity(&self) -> Result<Option<UidValidity>> {
        self.store.get_uid_validity(&self.folder).await
    }

    /// Stores the UIDVALIDITY token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn set_uid_validity(&self, validity: UidValidity) -> Result<()> {
        self.store.set_uid_validity(&self.folder, validity).await
    }

    /// Drops everything cached for this mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn invalidate(&self) -> Result<()> {
        self.store.invalidate(&self.folder).await
    }

    /// Adds `flag` to the cached header of `uid`.
    ///
    /// Returns `false` when no header is cached for `uid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn add_flag(&self, uid: Uid, flag: Flag) -> Result<bool> {
        let Some(mut header) = self.get_header(uid).await? else {
            return Ok(false);
        };
        if header.flags.insert(flag) {
            self.set_header(&header).await?;
        }
        Ok(true)
    }

    /// Removes `flag` from the cached header of `uid`.
    ///
    /// Returns `false` when no header is cached for `uid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn remove_flag(&self, uid: Uid, flag: &Flag) -> Result<bool> {
        let Some(mut header) = self.get_header(uid).await? else {
            return Ok(false);
        };
        if header.flags.remove(flag) {
            self.set_header(&header).await?;
        }
        Ok(true)
    }
}
