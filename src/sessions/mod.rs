//! Session-scoped project storage.
//!
//! Each session owns its project exclusively. The store hands out clones, so
//! a caller never holds a reference into another session's tickets. Sessions
//! live in memory until deleted or until they sit idle longer than the
//! store's idle timeout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::*;

/// Idle time after which an untouched session is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

struct Entry {
    session: ProjectSession,
    /// Last read or write through the store.
    last_seen: DateTime<Utc>,
}

impl Entry {
    fn new(session: ProjectSession) -> Self {
        Self {
            last_seen: session.updated_at,
            session,
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Entry>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
        }
    }

    /// Start a new session. Idle sessions are swept first so abandoned
    /// projects do not accumulate.
    pub fn create(&self, input: CreateSessionInput) -> ProjectSession {
        self.evict_idle();

        let session = ProjectSession::new(input.client);
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.insert(session.id, Entry::new(session.clone()));
        tracing::debug!(session = %session.id, client = %session.client, "Created session");
        session
    }

    pub fn get(&self, id: Uuid) -> Option<ProjectSession> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Utc::now();
        Some(entry.session.clone())
    }

    pub fn set_client(&self, id: Uuid, client: String) -> Option<ProjectSession> {
        self.update(id, |session| session.client = client)
    }

    /// Append a ticket. Returns `None` if the session does not exist.
    pub fn add_ticket(&self, id: Uuid, record: TicketRecord) -> Option<Ticket> {
        let ticket = Ticket::new(record);
        let stored = ticket.clone();
        self.update(id, move |session| session.tickets.push(stored))?;
        Some(ticket)
    }

    pub fn list_tickets(&self, id: Uuid) -> Option<Vec<Ticket>> {
        self.get(id).map(|session| session.tickets)
    }

    /// Discard all tickets, keeping the session and its client.
    pub fn reset(&self, id: Uuid) -> Option<ProjectSession> {
        self.update(id, |session| session.tickets.clear())
    }

    pub fn delete(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.remove(&id).is_some()
    }

    /// Drop every session not seen within the idle timeout. Returns how many
    /// were removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Utc::now())
    }

    fn evict_idle_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let before = sessions.len();
        sessions.retain(|_, entry| {
            // A clock step backwards yields a negative age, which keeps the session.
            let idle = (now - entry.last_seen).to_std().unwrap_or_default();
            idle <= self.idle_timeout
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut ProjectSession)) -> Option<ProjectSession> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        let entry = sessions.get_mut(&id)?;
        f(&mut entry.session);
        entry.session.updated_at = Utc::now();
        entry.last_seen = entry.session.updated_at;
        Some(entry.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::NO_CLIENT;

    fn record(sqft: f64) -> TicketRecord {
        TicketRecord {
            crew_max: 1.0,
            crew_min: 1.0,
            crew_best_hours: 1.0,
            crew_worst_hours: 1.0,
            sqft,
            line_items: vec![LineItem::None; 8],
        }
    }

    #[test]
    fn new_session_defaults_to_no_client() {
        let store = SessionStore::new();
        let session = store.create(CreateSessionInput::default());
        assert_eq!(session.client, NO_CLIENT);
        assert!(session.tickets.is_empty());
    }

    #[test]
    fn tickets_are_scoped_to_their_session() {
        let store = SessionStore::new();
        let a = store.create(CreateSessionInput::default());
        let b = store.create(CreateSessionInput::default());

        store.add_ticket(a.id, record(10.0)).unwrap();
        store.add_ticket(a.id, record(20.0)).unwrap();

        assert_eq!(store.get(a.id).unwrap().ticket_count(), 2);
        assert_eq!(store.get(b.id).unwrap().ticket_count(), 0);
    }

    #[test]
    fn reset_clears_tickets_but_keeps_client() {
        let store = SessionStore::new();
        let session = store.create(CreateSessionInput {
            client: Some("Acme".to_string()),
        });
        store.add_ticket(session.id, record(10.0)).unwrap();

        let reset = store.reset(session.id).unwrap();
        assert!(reset.tickets.is_empty());
        assert_eq!(reset.client, "Acme");
    }

    #[test]
    fn evicts_idle_sessions_and_keeps_active_ones() {
        let store = SessionStore::with_idle_timeout(Duration::from_secs(30 * 60));
        let idle = store.create(CreateSessionInput::default());
        let active = store.create(CreateSessionInput::default());

        let later = Utc::now() + chrono::Duration::minutes(45);
        store
            .sessions
            .lock()
            .unwrap()
            .get_mut(&active.id)
            .unwrap()
            .last_seen = later;

        assert_eq!(store.evict_idle_at(later), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(idle.id).is_none());
        assert!(store.get(active.id).is_some());
    }

    #[test]
    fn create_sweeps_idle_sessions() {
        let store = SessionStore::with_idle_timeout(Duration::ZERO);
        let stale = store.create(CreateSessionInput::default());
        store
            .sessions
            .lock()
            .unwrap()
            .get_mut(&stale.id)
            .unwrap()
            .last_seen = Utc::now() - chrono::Duration::minutes(1);

        let fresh = store.create(CreateSessionInput::default());

        assert_eq!(store.len(), 1);
        assert!(store.get(fresh.id).is_some());
    }

    #[test]
    fn delete_empties_the_store() {
        let store = SessionStore::new();
        let session = store.create(CreateSessionInput::default());
        assert!(!store.is_empty());

        assert!(store.delete(session.id));
        assert!(store.is_empty());
    }

    #[test]
    fn missing_session_returns_none() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        assert!(store.get(id).is_none());
        assert!(store.add_ticket(id, record(1.0)).is_none());
        assert!(!store.delete(id));
    }
}
