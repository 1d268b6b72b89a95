use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};
use traceviz_events::{EventStore, SessionLogger};
use traceviz_ingest::{HookKind, normalize};
use traceviz_protocol::{AgentId, FeedMessage, SessionId, SessionStats, TraceEvent};

use crate::config::DaemonConfig;
use crate::hub::{FeedReceiver, SubscriberHub, SubscriberId};

/// Outcome of one submitted hook payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Accepted(TraceEvent),
    /// Unknown hook or unparseable fields; nothing was recorded.
    Rejected,
}

impl Submission {
    pub fn event(&self) -> Option<&TraceEvent> {
        match self {
            Self::Accepted(event) => Some(event),
            Self::Rejected => None,
        }
    }
}

/// A newly registered live subscriber.
///
/// The first message on `feed` is the snapshot; every later message is one
/// accepted event, in acceptance order.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub feed: FeedReceiver,
}

/// Store and subscriber set, mutated only under one lock.
#[derive(Debug)]
struct Pipeline {
    store: EventStore,
    subscribers: SubscriberHub,
}

struct Inner {
    session_id: SessionId,
    default_agent_id: AgentId,
    logger: SessionLogger,
    pipeline: Mutex<Pipeline>,
}

/// Per-daemon context shared by every request handler.
///
/// Ingestion and subscription handshakes are serialized by the pipeline
/// lock, so acceptance order, store order, log order and broadcast order
/// are all the same, and a snapshot never overlaps the live stream.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Start a fresh session: new session id, new log file.
    #[instrument(skip_all, fields(log_dir = %config.log_dir.display()))]
    pub async fn start(config: &DaemonConfig) -> Result<Self> {
        let session_id = SessionId::new_uuid();
        let logger = SessionLogger::open(&config.log_dir, &session_id).await?;
        info!(%session_id, "session started");
        Ok(Self::from_parts(
            EventStore::new(session_id),
            logger,
            config.default_agent_id.clone(),
        ))
    }

    pub fn from_parts(store: EventStore, logger: SessionLogger, default_agent_id: AgentId) -> Self {
        Self {
            inner: Arc::new(Inner {
                session_id: store.session_id().clone(),
                default_agent_id,
                logger,
                pipeline: Mutex::new(Pipeline {
                    store,
                    subscribers: SubscriberHub::default(),
                }),
            }),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    pub fn log_path(&self) -> &Path {
        self.inner.logger.path()
    }

    /// Normalize one payload and, if accepted, record and broadcast it.
    pub fn submit(&self, payload: &Value) -> Submission {
        let agent_id = self.resolve_agent(payload);

        let mut pipeline = self.inner.pipeline.lock();
        let Some(event) = normalize(payload, &agent_id) else {
            debug!(
                hook = ?HookKind::from_payload(payload),
                raw_hook = ?payload.get("hook"),
                "hook payload rejected"
            );
            return Submission::Rejected;
        };

        pipeline.store.append(event.clone());
        self.inner.logger.write(&event);

        let delivered = match serde_json::to_string(&event) {
            Ok(message) => pipeline.subscribers.broadcast(&Arc::from(message)),
            Err(error) => {
                warn!(%error, event_id = %event.id, "failed serializing event for subscribers");
                0
            }
        };
        debug!(
            event_id = %event.id,
            event_type = event.type_name(),
            agent_id = %event.agent_id,
            delivered,
            "event accepted"
        );

        Submission::Accepted(event)
    }

    /// Register a live subscriber. The snapshot is captured and queued under
    /// the same lock as ingestion.
    pub fn subscribe(&self) -> Subscription {
        let mut pipeline = self.inner.pipeline.lock();
        let snapshot = FeedMessage::Snapshot {
            events: pipeline.store.all(),
            stats: pipeline.store.stats(),
        };
        let first = serde_json::to_string(&snapshot).unwrap_or_else(|error| {
            json!({ "type": "snapshot", "error": error.to_string() }).to_string()
        });

        let (id, feed) = pipeline.subscribers.register(Arc::from(first));
        info!(
            subscriber = %id,
            snapshot_events = pipeline.store.len(),
            subscribers = pipeline.subscribers.len(),
            "subscriber connected"
        );
        Subscription { id, feed }
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut pipeline = self.inner.pipeline.lock();
        if pipeline.subscribers.remove(id) {
            info!(
                subscriber = %id,
                subscribers = pipeline.subscribers.len(),
                "subscriber disconnected"
            );
        }
    }

    /// End every live feed, e.g. before shutting the listener down.
    pub fn disconnect_all(&self) {
        let mut pipeline = self.inner.pipeline.lock();
        let count = pipeline.subscribers.len();
        pipeline.subscribers.clear();
        debug!(count, "all subscribers disconnected");
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.inner.pipeline.lock().store.all()
    }

    pub fn stats(&self) -> SessionStats {
        self.inner.pipeline.lock().store.stats()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.pipeline.lock().subscribers.len()
    }

    /// Flush and close the session log.
    pub async fn shutdown(&self) {
        self.disconnect_all();
        match self.inner.logger.close().await {
            Ok(()) => info!(session_id = %self.inner.session_id, "session log closed"),
            Err(error) => warn!(%error, "session log already closed"),
        }
    }

    fn resolve_agent(&self, payload: &Value) -> AgentId {
        payload
            .get("agent_id")
            .and_then(Value::as_str)
            .map(AgentId::from_string)
            .unwrap_or_else(|| self.inner.default_agent_id.clone())
    }
}
