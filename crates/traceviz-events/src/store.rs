use traceviz_protocol::{SessionId, SessionStats, TraceEvent};

/// Ordered, append-only history of one session.
///
/// Unbounded: nothing is evicted for the lifetime of the daemon. Statistics
/// are recomputed from the full sequence on every [`EventStore::stats`]
/// call so they can never drift from the history.
#[derive(Debug, Clone)]
pub struct EventStore {
    session_id: SessionId,
    start_time: u64,
    events: Vec<TraceEvent>,
}

impl EventStore {
    pub fn new(session_id: SessionId) -> Self {
        Self::with_start_time(session_id, TraceEvent::now_millis())
    }

    pub fn with_start_time(session_id: SessionId, start_time: u64) -> Self {
        Self {
            session_id,
            start_time,
            events: Vec::new(),
        }
    }

    pub fn append(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    /// Owned copy of the history; later appends are not visible through it.
    pub fn all(&self) -> Vec<TraceEvent> {
        self.events.clone()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::from_events(self.session_id.clone(), self.start_time, &self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }
}
