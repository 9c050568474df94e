//! Session key and connection state of one live log buffer.

use logdeck_core::{ConnectionState, SessionKey};

/// Lifecycle bookkeeping for a live log connection
///
/// The session key lives from the first `start` until `stop` and is reused by
/// every restart in between, so the console always sees one logical session.
/// Each connection attempt gets a fresh generation; events tagged with an
/// older generation belong to a superseded attempt and must be ignored.
#[derive(Debug, Default)]
pub struct ConnectionSession {
    key: Option<SessionKey>,
    state: ConnectionState,
    filter: Option<String>,
    generation: u64,
}

impl ConnectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&SessionKey> {
        self.key.as_ref()
    }

    /// Current key, minting one if the session has none
    pub fn ensure_key(&mut self) -> SessionKey {
        self.key.get_or_insert_with(SessionKey::generate).clone()
    }

    pub fn take_key(&mut self) -> Option<SessionKey> {
        self.key.take()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Set the search filter; an empty string clears it
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = if filter.is_empty() {
            None
        } else {
            Some(filter.to_string())
        };
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin a new connection attempt and return its generation
    pub fn begin_attempt(&mut self) -> u64 {
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Orphan any in-flight attempt without starting a new one
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn mark_open(&mut self) {
        self.state = ConnectionState::Open;
    }

    pub fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
    }

    pub fn mark_idle(&mut self) {
        self.state = ConnectionState::Idle;
    }
}
