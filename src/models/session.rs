use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ticket::{Ticket, TicketRecord};
use crate::lookup::NO_CLIENT;

/// A user's project: the client it is quoted for and the tickets added so far.
///
/// Sessions are **isolated**: tickets are only reachable through the owning
/// session's id. Tickets are appended and never edited individually; a reset
/// discards all of them at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSession {
    pub id: Uuid,
    /// Selected client identifier. Defaults to the "No client" sentinel.
    pub client: String,
    pub tickets: Vec<Ticket>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectSession {
    pub fn new(client: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client: client.unwrap_or_else(|| NO_CLIENT.to_string()),
            tickets: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &TicketRecord> + Clone {
        self.tickets.iter().map(|t| &t.record)
    }
}

/// Input for creating a new session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionInput {
    /// Initial client. `None` selects the "No client" sentinel.
    #[serde(default)]
    pub client: Option<String>,
}

/// Input for changing a session's client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetClientInput {
    pub client: String,
}
