//! In-memory session table.
//!
//! The map itself takes a short-lived `RwLock` for insert/lookup/
//! remove; each session carries its own `Mutex`, held for the whole
//! transition, which is what serializes event processing per call.
//! Nothing here survives a restart: in-flight calls are lost on crash
//! and the archival collaborator owns durable state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::session::CallSession;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session lock poisoned")]
    LockPoisoned,
}

/// Handle to one session's independently lockable record.
pub type SessionHandle = Arc<Mutex<CallSession>>;

/// Concurrent map of external call id → live session.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live session.
    pub fn get(&self, call_id: &str) -> Result<Option<SessionHandle>, StoreError> {
        let map = self.sessions.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(call_id).cloned())
    }

    /// Fetch the session for `call_id`, creating it if absent.
    ///
    /// Creation happens under the write lock, so exactly one session
    /// ever exists per id no matter how events race.
    pub fn get_or_create(
        &self,
        call_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(SessionHandle, bool), StoreError> {
        let mut map = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(existing) = map.get(call_id) {
            return Ok((existing.clone(), false));
        }
        let handle = Arc::new(Mutex::new(CallSession::new(call_id, now)));
        map.insert(call_id.to_string(), handle.clone());
        Ok((handle, true))
    }

    /// Retire a session. Returns the handle so a caller holding no
    /// other reference can still inspect the final state.
    pub fn remove(&self, call_id: &str) -> Result<Option<SessionHandle>, StoreError> {
        let mut map = self.sessions.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.remove(call_id))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn get_or_create_inserts_once() {
        let store = SessionStore::new();
        let (first, created) = store.get_or_create("cc-1", now()).unwrap();
        assert!(created);
        let (second, created) = store.get_or_create("cc-1", now()).unwrap();
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sessions_are_independent_per_id() {
        let store = SessionStore::new();
        store.get_or_create("cc-1", now()).unwrap();
        store.get_or_create("cc-2", now()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("cc-1").unwrap().is_some());
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn remove_retires_the_session() {
        let store = SessionStore::new();
        store.get_or_create("cc-1", now()).unwrap();
        let removed = store.remove("cc-1").unwrap();
        assert!(removed.is_some());
        assert!(store.get("cc-1").unwrap().is_none());
        assert!(store.remove("cc-1").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_creates_yield_one_session() {
        let store = Arc::new(SessionStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                store.get_or_create("cc-race", now()).unwrap().1
            }));
        }
        let created: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }
}
