//! Messages pushed to live subscribers.
//!
//! A subscriber first receives one [`FeedMessage::Snapshot`]; every later
//! message is a bare [`TraceEvent`](crate::TraceEvent) object.

use crate::event::TraceEvent;
use crate::stats::SessionStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Snapshot {
        events: Vec<TraceEvent>,
        stats: SessionStats,
    },
}
