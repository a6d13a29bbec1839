//! Scripted in-memory IMAP server for driving folder views in tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use mailmirror_core::{Account, Connection, MemoryCache, SyncConfig};
use mailmirror_imap::{
    Address, BodyStructure, Capability, Envelope, Error, FetchAttribute, FetchItem,
    FetchResponse, Flag, Flags, Result, SearchCriteria, StatusAttribute, StatusItem, Uid, UidSet,
    UidValidity,
};

/// Installs a test log writer once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn uid(n: u32) -> Uid {
    Uid::new(n).unwrap()
}

#[derive(Debug, Clone)]
struct MockMessage {
    flags: Flags,
    subject: String,
    body: Vec<u8>,
}

#[derive(Debug)]
struct MockFolder {
    uid_validity: u32,
    next_uid: u32,
    messages: BTreeMap<Uid, MockMessage>,
}

impl MockFolder {
    fn new(uid_validity: u32) -> Self {
        Self {
            uid_validity,
            next_uid: 1,
            messages: BTreeMap::new(),
        }
    }

    fn deliver(&mut self, message: MockMessage) -> Uid {
        let uid = uid(self.next_uid);
        self.next_uid += 1;
        self.messages.insert(uid, message);
        uid
    }
}

#[derive(Debug, Default)]
struct ServerState {
    folders: HashMap<String, MockFolder>,
    capabilities: Vec<Capability>,
    searches: Vec<SearchCriteria>,
    fetch_calls: usize,
    part_fetch_calls: usize,
    withheld_parts: BTreeSet<Uid>,
    hidden_from_search: BTreeSet<Uid>,
    label_shift: Option<u32>,
    status_without_validity: bool,
}

/// An IMAP server that keeps its mailboxes in memory.
#[derive(Debug, Default)]
pub struct MockServer {
    state: Mutex<ServerState>,
}

impl MockServer {
    /// A server with an empty `INBOX` (UIDVALIDITY 1).
    pub fn new() -> Self {
        let server = Self::default();
        server.add_folder("INBOX", 1);
        server
    }

    pub fn add_folder(&self, name: &str, uid_validity: u32) {
        self.state
            .lock()
            .unwrap()
            .folders
            .insert(name.to_string(), MockFolder::new(uid_validity));
    }

    /// Delivers a message and returns its UID.
    pub fn deliver(&self, folder: &str, subject: &str, body: &str) -> Uid {
        let mut state = self.state.lock().unwrap();
        state.folders.get_mut(folder).unwrap().deliver(MockMessage {
            flags: Flags::new(),
            subject: subject.to_string(),
            body: body.as_bytes().to_vec(),
        })
    }

    /// Delivers `count` messages with subjects `Message 1`, `Message 2`, ...
    pub fn deliver_many(&self, folder: &str, count: u32) -> Vec<Uid> {
        (1..=count)
            .map(|n| self.deliver(folder, &format!("Message {n}"), &format!("Body of message {n}")))
            .collect()
    }

    /// Removes a message behind the client's back.
    pub fn expunge(&self, folder: &str, uid: Uid) {
        let mut state = self.state.lock().unwrap();
        state.folders.get_mut(folder).unwrap().messages.remove(&uid);
    }

    pub fn remove_folder(&self, folder: &str) {
        self.state.lock().unwrap().folders.remove(folder);
    }

    /// Replaces the mailbox with an empty one under a new UIDVALIDITY.
    pub fn reset_validity(&self, folder: &str, uid_validity: u32) {
        self.add_folder(folder, uid_validity);
    }

    pub fn set_flag(&self, folder: &str, uid: Uid, flag: Flag) {
        let mut state = self.state.lock().unwrap();
        let message = state
            .folders
            .get_mut(folder)
            .unwrap()
            .messages
            .get_mut(&uid)
            .unwrap();
        message.flags.insert(flag);
    }

    pub fn flags(&self, folder: &str, uid: Uid) -> Flags {
        let state = self.state.lock().unwrap();
        state.folders[folder].messages[&uid].flags.clone()
    }

    pub fn folder_uids(&self, folder: &str) -> BTreeSet<Uid> {
        let state = self.state.lock().unwrap();
        state
            .folders
            .get(folder)
            .map(|f| f.messages.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_folder(&self, folder: &str) -> bool {
        self.state.lock().unwrap().folders.contains_key(folder)
    }

    pub fn set_capabilities(&self, capabilities: Vec<Capability>) {
        self.state.lock().unwrap().capabilities = capabilities;
    }

    /// Makes every full fetch of part 1 of `uid` come back without data.
    pub fn withhold_part(&self, uid: Uid) {
        self.state.lock().unwrap().withheld_parts.insert(uid);
    }

    /// Leaves `uid` out of search results while still serving it.
    pub fn hide_from_search(&self, uid: Uid) {
        self.state.lock().unwrap().hidden_from_search.insert(uid);
    }

    /// Labels every fetched entry with its UID plus `shift`.
    pub fn shift_fetch_labels(&self, shift: u32) {
        self.state.lock().unwrap().label_shift = Some(shift);
    }

    pub fn omit_uid_validity(&self) {
        self.state.lock().unwrap().status_without_validity = true;
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.lock().unwrap().fetch_calls
    }

    pub fn part_fetch_calls(&self) -> usize {
        self.state.lock().unwrap().part_fetch_calls
    }

    pub fn searches(&self) -> Vec<SearchCriteria> {
        self.state.lock().unwrap().searches.clone()
    }

    fn folder<'a>(state: &'a ServerState, name: &str) -> Result<&'a MockFolder> {
        state
            .folders
            .get(name)
            .ok_or_else(|| Error::MailboxNotFound(name.to_string()))
    }

    fn folder_mut<'a>(state: &'a mut ServerState, name: &str) -> Result<&'a mut MockFolder> {
        state
            .folders
            .get_mut(name)
            .ok_or_else(|| Error::MailboxNotFound(name.to_string()))
    }
}

fn matches(criteria: &SearchCriteria, message: &MockMessage) -> bool {
    let body = String::from_utf8_lossy(&message.body);
    match criteria {
        SearchCriteria::Subject(q) => message.subject.contains(q.as_str()),
        SearchCriteria::Body(q) => body.contains(q.as_str()),
        SearchCriteria::GmailRaw(q) | SearchCriteria::Text(q) => {
            message.subject.contains(q.as_str()) || body.contains(q.as_str())
        }
        SearchCriteria::Or(a, b) => matches(a, message) || matches(b, message),
        SearchCriteria::And(all) => all.iter().all(|c| matches(c, message)),
        SearchCriteria::Not(c) => !matches(c, message),
        SearchCriteria::Seen => message.flags.is_seen(),
        SearchCriteria::Unseen => !message.flags.is_seen(),
        SearchCriteria::Flagged => message.flags.is_flagged(),
        _ => true,
    }
}

fn envelope(uid: Uid, message: &MockMessage) -> Envelope {
    Envelope {
        date: Some("Mon, 2 Feb 2026 09:00:00 +0000".to_string()),
        subject: Some(message.subject.clone()),
        from: vec![Address {
            name: Some("Alice".to_string()),
            adl: None,
            mailbox: Some("alice".to_string()),
            host: Some("example.com".to_string()),
        }],
        message_id: Some(format!("<{uid}@example.com>")),
        ..Envelope::default()
    }
}

fn body_structure(message: &MockMessage) -> BodyStructure {
    BodyStructure::Text {
        subtype: "PLAIN".to_string(),
        params: vec![("CHARSET".to_string(), "UTF-8".to_string())],
        id: None,
        description: None,
        encoding: "7BIT".to_string(),
        size: u32::try_from(message.body.len()).unwrap(),
        lines: 1,
    }
}

impl Connection for MockServer {
    async fn capabilities(&self) -> Result<Vec<Capability>> {
        Ok(self.state.lock().unwrap().capabilities.clone())
    }

    async fn folder_exists(&self, folder: &str) -> Result<bool> {
        Ok(self.has_folder(folder))
    }

    async fn create_folder(&self, folder: &str) -> Result<()> {
        self.add_folder(folder, 1);
        Ok(())
    }

    async fn folder_status(
        &self,
        folder: &str,
        _attributes: &[StatusAttribute],
    ) -> Result<Vec<StatusItem>> {
        let state = self.state.lock().unwrap();
        let mailbox = Self::folder(&state, folder)?;
        let mut items = vec![StatusItem::Messages(
            u32::try_from(mailbox.messages.len()).unwrap(),
        )];
        if !state.status_without_validity {
            items.push(StatusItem::UidValidity(
                UidValidity::new(mailbox.uid_validity).unwrap(),
            ));
        }
        Ok(items)
    }

    async fn search(&self, folder: &str, criteria: &SearchCriteria) -> Result<Vec<Uid>> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(criteria.clone());
        let mailbox = Self::folder(&state, folder)?;
        Ok(mailbox
            .messages
            .iter()
            .filter(|(uid, message)| {
                !state.hidden_from_search.contains(uid) && matches(criteria, message)
            })
            .map(|(uid, _)| *uid)
            .collect())
    }

    async fn fetch(
        &self,
        folder: &str,
        uids: &UidSet,
        attributes: &[FetchAttribute],
    ) -> Result<FetchResponse> {
        let mut state = self.state.lock().unwrap();
        state.fetch_calls += 1;
        if matches!(attributes, [FetchAttribute::Body { peek: false, .. }]) {
            state.part_fetch_calls += 1;
        }
        let withheld = state.withheld_parts.clone();
        let shift = state.label_shift;
        let mailbox = Self::folder_mut(&mut state, folder)?;

        let mut response = FetchResponse::new();
        for (&uid, message) in &mut mailbox.messages {
            if !uids.contains(uid) {
                continue;
            }
            let label = shift.map_or(uid, |shift| Uid::new(uid.get() + shift).unwrap());
            let mut items = vec![FetchItem::Uid(label)];

            for attribute in attributes {
                match attribute {
                    FetchAttribute::Flags => items.push(FetchItem::Flags(message.flags.clone())),
                    FetchAttribute::Rfc822Size => items.push(FetchItem::Rfc822Size(
                        u32::try_from(message.body.len()).unwrap() + 200,
                    )),
                    FetchAttribute::Envelope => {
                        items.push(FetchItem::Envelope(Box::new(envelope(uid, message))));
                    }
                    FetchAttribute::BodyStructure => {
                        items.push(FetchItem::BodyStructure(body_structure(message)));
                    }
                    FetchAttribute::Uid => {}
                    FetchAttribute::Body {
                        section,
                        peek,
                        partial,
                    } => {
                        let section = section.clone().unwrap_or_default();
                        let data = if section == "1" {
                            if partial.is_none() && withheld.contains(&uid) {
                                continue;
                            }
                            let end = partial.map_or(message.body.len(), |(_, len)| {
                                message.body.len().min(len as usize)
                            });
                            if !peek {
                                message.flags.insert(Flag::Seen);
                            }
                            message.body[..end].to_vec()
                        } else if section.starts_with("HEADER.FIELDS") {
                            format!("References: <thread-{uid}@example.com>\r\n\r\n").into_bytes()
                        } else {
                            continue;
                        };
                        items.push(FetchItem::Body {
                            section: Some(section),
                            origin: partial.map(|(start, _)| start),
                            data: Some(data),
                        });
                    }
                }
            }
            response.insert(label, items);
        }
        Ok(response)
    }

    async fn copy(&self, folder: &str, uids: &UidSet, destination: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let copied: Vec<MockMessage> = Self::folder(&state, folder)?
            .messages
            .iter()
            .filter(|(uid, _)| uids.contains(**uid))
            .map(|(_, message)| message.clone())
            .collect();
        let target = Self::folder_mut(&mut state, destination)?;
        for message in copied {
            target.deliver(message);
        }
        Ok(())
    }

    async fn delete_messages(&self, folder: &str, uids: &UidSet) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::folder_mut(&mut state, folder)?
            .messages
            .retain(|uid, _| !uids.contains(*uid));
        Ok(())
    }

    async fn add_flags(&self, folder: &str, uids: &UidSet, flags: &[Flag]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for (uid, message) in &mut Self::folder_mut(&mut state, folder)?.messages {
            if uids.contains(*uid) {
                for flag in flags {
                    message.flags.insert(flag.clone());
                }
            }
        }
        Ok(())
    }

    async fn remove_flags(&self, folder: &str, uids: &UidSet, flags: &[Flag]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for (uid, message) in &mut Self::folder_mut(&mut state, folder)?.messages {
            if uids.contains(*uid) {
                for flag in flags {
                    message.flags.remove(flag);
                }
            }
        }
        Ok(())
    }
}

pub type TestAccount = Account<MockServer, MemoryCache>;

/// An account over `server` with an in-memory cache.
pub fn account(server: &Arc<MockServer>, config: SyncConfig) -> Arc<TestAccount> {
    Arc::new(
        Account::new(
            "test",
            Arc::clone(server),
            Arc::new(MemoryCache::new()),
            config,
        )
        .with_alias("archive", "Archive"),
    )
}

pub fn config(batch_size: usize) -> SyncConfig {
    SyncConfig::builder().batch_size(batch_size).build().unwrap()
}
