//! Connection port.
//!
//! The engine never drives sockets itself. A [`Connection`] wraps whatever
//! transport talks to the server and exposes folder-scoped operations;
//! implementations select or examine the mailbox as each call requires.

use std::future::Future;

use mailmirror_imap::{
    Capability, FetchAttribute, FetchResponse, Flag, Result, SearchCriteria, StatusAttribute,
    StatusItem, Uid, UidSet,
};

/// Folder-scoped IMAP operations consumed by the sync engine.
pub trait Connection: Send + Sync {
    /// Capabilities advertised by the server.
    fn capabilities(&self) -> impl Future<Output = Result<Vec<Capability>>> + Send;

    /// Whether `folder` exists on the server.
    fn folder_exists(&self, folder: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Creates `folder`.
    fn create_folder(&self, folder: &str) -> impl Future<Output = Result<()>> + Send;

    /// Issues STATUS for `folder`. Must not change the selected mailbox.
    fn folder_status(
        &self,
        folder: &str,
        attributes: &[StatusAttribute],
    ) -> impl Future<Output = Result<Vec<StatusItem>>> + Send;

    /// Runs UID SEARCH in `folder`.
    fn search(
        &self,
        folder: &str,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = Result<Vec<Uid>>> + Send;

    /// Runs UID FETCH in `folder`, keyed by the UID each entry was labelled with.
    fn fetch(
        &self,
        folder: &str,
        uids: &UidSet,
        attributes: &[FetchAttribute],
    ) -> impl Future<Output = Result<FetchResponse>> + Send;

    /// Copies messages from `folder` to `destination`.
    fn copy(
        &self,
        folder: &str,
        uids: &UidSet,
        destination: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Flags messages `\Deleted` and expunges them.
    fn delete_messages(
        &self,
        folder: &str,
        uids: &UidSet,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Adds `flags` to messages.
    fn add_flags(
        &self,
        folder: &str,
        uids: &UidSet,
        flags: &[Flag],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Removes `flags` from messages.
    fn remove_flags(
        &self,
        folder: &str,
        uids: &UidSet,
        flags: &[Flag],
    ) -> impl Future<Output = Result<()>> + Send;
}
