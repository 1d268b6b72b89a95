//! Canonical trace events.
//!
//! Every accepted hook becomes one [`TraceEvent`]: a shared base record
//! (id, session, agent, capture time) plus an [`EventKind`] tagged by `type`.
//! The JSON shape is a compatibility contract with dashboards and recorded
//! session logs: camelCase fields, snake_case `type` tags, optional fields
//! omitted when absent.

use crate::error::TraceResult;
use crate::ids::*;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A normalized, immutable trace event.
///
/// `extra` holds top-level fields no variant describes. It is empty for
/// events built from hooks; a replayed record keeps whatever it carried.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub id: EventId,
    pub session_id: SessionId,
    pub agent_id: AgentId,
    /// Milliseconds since UNIX epoch, stamped at acceptance.
    pub timestamp: u64,
    pub kind: EventKind,
    pub extra: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRef<'a> {
    id: &'a EventId,
    session_id: &'a SessionId,
    agent_id: &'a AgentId,
    timestamp: u64,
    #[serde(flatten)]
    kind: &'a EventKind,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Wire {
    id: EventId,
    session_id: SessionId,
    agent_id: AgentId,
    timestamp: u64,
    #[serde(flatten)]
    kind: EventKind,
}

impl Serialize for TraceEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.wire(&self.extra).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TraceEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::Object(Map::deserialize(deserializer)?);
        let wire = Wire::deserialize(&value).map_err(de::Error::custom)?;
        let event = TraceEvent {
            id: wire.id,
            session_id: wire.session_id,
            agent_id: wire.agent_id,
            timestamp: wire.timestamp,
            kind: wire.kind,
            extra: Map::new(),
        };
        match value {
            Value::Object(raw) => event.carry_unknown_fields(raw).map_err(de::Error::custom),
            _ => Ok(event),
        }
    }
}

impl TraceEvent {
    /// Create an event with a fresh id and the current capture time.
    pub fn new(session_id: SessionId, agent_id: AgentId, kind: EventKind) -> Self {
        Self {
            id: EventId::new_uuid(),
            session_id,
            agent_id,
            timestamp: Self::now_millis(),
            kind,
            extra: Map::new(),
        }
    }

    /// Keep every entry of `raw` that the typed fields do not already cover.
    ///
    /// Replaces any previously carried fields.
    pub fn carry_unknown_fields(mut self, raw: Map<String, Value>) -> TraceResult<Self> {
        let empty = Map::new();
        let Value::Object(known) = serde_json::to_value(self.wire(&empty))? else {
            return Ok(self);
        };
        self.extra = raw
            .into_iter()
            .filter(|(key, _)| !known.contains_key(key))
            .collect();
        Ok(self)
    }

    fn wire<'a>(&'a self, extra: &'a Map<String, Value>) -> WireRef<'a> {
        WireRef {
            id: &self.id,
            session_id: &self.session_id,
            agent_id: &self.agent_id,
            timestamp: self.timestamp,
            kind: &self.kind,
            extra,
        }
    }

    /// Current time in milliseconds since UNIX epoch.
    pub fn now_millis() -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
    }

    /// Wire name of this event's `type` tag.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

// ─── EventKind ─────────────────────────────────────────────────────

/// Discriminated union of trace event variants.
///
/// Every field defaults when absent so that recorded logs and replayed
/// payloads from older producers still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EventKind {
    ToolStart {
        #[serde(default)]
        tool_name: String,
        #[serde(default)]
        tool_type: ToolCategory,
    },
    ToolEnd {
        #[serde(default)]
        tool_name: String,
        #[serde(default)]
        tool_type: ToolCategory,
        #[serde(default)]
        duration_ms: u64,
        #[serde(default = "default_success")]
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_size: Option<u64>,
    },
    Notification {
        #[serde(default)]
        message: String,
        #[serde(default)]
        level: NotificationLevel,
    },
    SessionEnd {
        #[serde(default)]
        total_input_tokens: u64,
        #[serde(default)]
        total_output_tokens: u64,
        #[serde(default = "default_model")]
        model: String,
    },
    CompactStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens_before: Option<u64>,
    },
    CompactEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens_after: Option<u64>,
    },
    AgentSpawn {
        #[serde(default)]
        parent_agent_id: AgentId,
        #[serde(default)]
        child_agent_id: AgentId,
    },
    AgentComplete {
        #[serde(default)]
        parent_agent_id: AgentId,
        #[serde(default)]
        child_agent_id: AgentId,
    },
}

fn default_success() -> bool {
    true
}

fn default_model() -> String {
    "unknown".to_owned()
}

impl EventKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::Notification { .. } => "notification",
            Self::SessionEnd { .. } => "session_end",
            Self::CompactStart { .. } => "compact_start",
            Self::CompactEnd { .. } => "compact_end",
            Self::AgentSpawn { .. } => "agent_spawn",
            Self::AgentComplete { .. } => "agent_complete",
        }
    }
}

// ─── ToolCategory ──────────────────────────────────────────────────

/// Closed classification of tool names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Bash,
    File,
    Web,
    Task,
    #[default]
    Other,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 5] = [
        ToolCategory::Bash,
        ToolCategory::File,
        ToolCategory::Web,
        ToolCategory::Task,
        ToolCategory::Other,
    ];

    /// Classify a tool by its exact name. Unknown names are `Other`.
    pub fn from_tool_name(name: &str) -> Self {
        match name {
            "Read" | "Write" | "Edit" | "Glob" | "Grep" | "NotebookEdit" => Self::File,
            "Bash" => Self::Bash,
            "WebFetch" | "WebSearch" => Self::Web,
            "Task" => Self::Task,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::File => "file",
            Self::Web => "web",
            Self::Task => "task",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    Info,
    Warning,
    Error,
}
