//! Cookie-addressed session state.
//!
//! A session holds the single clipboard slot and the list of files the
//! user opened. Copy overwrites the clipboard (last copy wins); nothing in
//! the request path ever clears it. Expired sessions are swept by
//! `purge_expired`, which also reclaims the clipboard temp file the
//! handlers deliberately leave behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use xmlwright_editor::ClipboardEntry;

pub struct SessionData {
    pub clipboard: Option<ClipboardEntry>,
    pub opened_files: Vec<String>,
    last_seen: SystemTime,
}

impl SessionData {
    fn new() -> Self {
        Self {
            clipboard: None,
            opened_files: Vec::new(),
            last_seen: SystemTime::now(),
        }
    }
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionData>>,
    counter: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Mint a fresh session id and register it.
    pub fn create(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let serial = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = format!("s{nanos:x}-{serial}");
        self.sessions
            .lock()
            .unwrap()
            .insert(id.clone(), SessionData::new());
        id
    }

    pub fn clipboard(&self, id: &str) -> Option<ClipboardEntry> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(id)?;
        session.last_seen = SystemTime::now();
        session.clipboard.clone()
    }

    /// Overwrite the clipboard slot. A stale cookie revives its session.
    pub fn set_clipboard(&self, id: &str, entry: ClipboardEntry) {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(SessionData::new);
        session.last_seen = SystemTime::now();
        session.clipboard = Some(entry);
    }

    pub fn record_opened(&self, id: &str, path: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(SessionData::new);
        session.last_seen = SystemTime::now();
        if !session.opened_files.iter().any(|p| p == path) {
            session.opened_files.push(path.to_string());
        }
    }

    pub fn opened_files(&self, id: &str) -> Vec<String> {
        self.sessions
            .lock()
            .unwrap()
            .get(id)
            .map(|s| s.opened_files.clone())
            .unwrap_or_default()
    }

    /// Drop sessions idle for at least `max_age` and remove their
    /// clipboard temp files. Returns how many sessions were dropped.
    pub fn purge_expired(&self, max_age: Duration) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, data)| {
                data.last_seen
                    .elapsed()
                    .map(|idle| idle >= max_age)
                    .unwrap_or(true)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(data) = sessions.remove(id) {
                if let Some(entry) = data.clipboard {
                    if let Err(err) = std::fs::remove_file(&entry.path) {
                        tracing::warn!(
                            path = %entry.path.display(),
                            error = %err,
                            "clipboard file already gone"
                        );
                    }
                }
            }
        }
        expired.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
