//! Account collaborator.
//!
//! An [`Account`] owns what every folder view of one mailbox account
//! shares: the connection, the cache backend, the sync configuration,
//! folder aliases, the server's capability list and one [`FolderCache`]
//! per mailbox name.

use std::collections::HashMap;
use std::sync::Arc;

use mailmirror_imap::Capability;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::cache::{CacheStore, FolderCache};
use crate::config::SyncConfig;
use crate::connection::Connection;
use crate::Result;

/// A mail account as seen by the sync engine.
#[derive(Debug)]
pub struct Account<C, S> {
    name: String,
    connection: Arc<C>,
    store: Arc<S>,
    config: SyncConfig,
    aliases: HashMap<String, String>,
    capabilities: OnceCell<Vec<Capability>>,
    caches: Mutex<HashMap<String, Arc<FolderCache<S>>>>,
}

impl<C: Connection, S: CacheStore> Account<C, S> {
    /// Creates an account with no folder aliases.
    #[must_use]
    pub fn new(name: impl Into<String>, connection: Arc<C>, store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            name: name.into(),
            connection,
            store,
            config,
            aliases: HashMap::new(),
            capabilities: OnceCell::new(),
            caches: Mutex::new(HashMap::new()),
        }
    }

    /// Maps a display alias (`"trash"`, `"sent"`) to a server folder name.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, folder: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), folder.into());
        self
    }

    /// Account name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection to the account's server.
    #[must_use]
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Sync configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Resolves an alias to its server folder name; other names pass through.
    #[must_use]
    pub fn resolve_folder<'a>(&'a self, name_or_alias: &'a str) -> &'a str {
        self.aliases
            .get(name_or_alias)
            .map_or(name_or_alias, String::as_str)
    }

    /// Returns the cache for `folder`, creating it on first use.
    ///
    /// Every call with the same name returns the same instance.
    pub async fn folder_cache(&self, folder: &str) -> Arc<FolderCache<S>> {
        let mut caches = self.caches.lock().await;
        Arc::clone(caches.entry(folder.to_string()).or_insert_with(|| {
            debug!(account = %self.name, folder, "Creating folder cache");
            Arc::new(FolderCache::new(folder, Arc::clone(&self.store)))
        }))
    }

    /// Capabilities advertised by the server, fetched once.
    ///
    /// # Errors
    ///
    /// Returns an error if the capability request fails.
    pub async fn capabilities(&self) -> Result<&[Capability]> {
        let capabilities = self
            .capabilities
            .get_or_try_init(|| self.connection.capabilities())
            .await?;
        Ok(capabilities)
    }

    /// Whether the server accepts `X-GM-RAW` search terms.
    ///
    /// # Errors
    ///
    /// Returns an error if the capability request fails.
    pub async fn supports_raw_search(&self) -> Result<bool> {
        Ok(self
            .capabilities()
            .await?
            .iter()
            .any(Capability::supports_raw_search))
    }

    /// Makes sure a folder exists on the server, creating it if needed.
    ///
    /// Returns the server folder name `name_or_alias` resolves to.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check or the creation fails.
    pub async fn ensure_folder_exists(&self, name_or_alias: &str) -> Result<String> {
        let folder = self.resolve_folder(name_or_alias).to_string();
        if !self.connection.folder_exists(&folder).await? {
            info!(account = %self.name, folder = %folder, "Creating missing folder");
            self.connection.create_folder(&folder).await?;
        }
        Ok(folder)
    }
}
