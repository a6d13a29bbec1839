//! In-process cache backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use mailmirror_imap::{Uid, UidValidity};
use tokio::sync::Mutex;

use super::model::HeaderRecord;
use super::store::CacheStore;
use crate::Result;

#[derive(Debug, Default)]
struct FolderEntry {
    headers: BTreeMap<Uid, HeaderRecord>,
    uids: Option<BTreeSet<Uid>>,
    uid_validity: Option<UidValidity>,
}

/// Cache backend that keeps everything in memory.
///
/// Nothing survives the process; useful for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    folders: Mutex<HashMap<String, FolderEntry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of headers cached for `folder`.
    pub async fn header_count(&self, folder: &str) -> usize {
        self.folders
            .lock()
            .await
            .get(folder)
            .map_or(0, |entry| entry.headers.len())
    }
}

impl CacheStore for MemoryCache {
    async fn get_header(&self, folder: &str, uid: Uid) -> Result<Option<HeaderRecord>> {
        let folders = self.folders.lock().await;
        Ok(folders
            .get(folder)
            .and_then(|entry| entry.headers.get(&uid))
            .cloned())
    }

    async fn set_header(&self, folder: &str, header: &HeaderRecord) -> Result<()> {
        let mut folders = self.folders.lock().await;
        folders
            .entry(folder.to_string())
            .or_default()
            .headers
            .insert(header.uid, header.clone());
        Ok(())
    }

    async fn delete_header(&self, folder: &str, uid: Uid) -> Result<()> {
        if let Some(entry) = self.folders.lock().await.get_mut(folder) {
            entry.headers.remove(&uid);
        }
        Ok(())
    }

    async fn get_uids(&self, folder: &str) -> Result<Option<BTreeSet<Uid>>> {
        let folders = self.folders.lock().await;
        Ok(folders.get(folder).and_then(|entry| entry.uids.clone()))
    }

    async fn set_uids(&self, folder: &str, uids: &BTreeSet<Uid>) -> Result<()> {
        let mut folders = self.folders.lock().await;
        folders.entry(folder.to_string()).or_default().uids = Some(uids.clone());
        Ok(())
    }

    async fn get_uid_validity(&self, folder: &str) -> Result<Option<UidValidity>> {
        let folders = self.folders.lock().await;
        Ok(folders.get(folder).and_then(|entry| entry.uid_validity))
    }

    async fn set_uid_validity(&self, folder: &str, validity: UidValidity) -> Result<()> {
        let mut folders = self.folders.lock().await;
        folders.entry(folder.to_string()).or_default().uid_validity = Some(validity);
        Ok(())
    }

    async fn invalidate(&self, folder: &str) -> Result<()> {
        self.folders.lock().await.remove(folder);
        Ok(())
    }
}
