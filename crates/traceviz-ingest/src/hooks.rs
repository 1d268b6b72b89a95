//! Per-hook extraction records.
//!
//! Each hook kind has its own record. Every field is optional so absent
//! fields fall back to zero-values; a present field with the wrong JSON
//! type fails deserialization and the payload is dropped. Counters accept
//! any JSON number and are truncated and clamped into `u64`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use traceviz_protocol::{AgentId, EventKind, SessionId};

/// The `hook` discriminator values understood by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    PreToolUse,
    PostToolUse,
    Notification,
    Stop,
    PreCompact,
    PostCompact,
    SubagentStop,
    /// An already-normalized event re-submitted from a recorded log.
    Replay,
}

impl HookKind {
    pub const REPLAY_TAG: &'static str = "__replay__";

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "PreToolUse" => Self::PreToolUse,
            "PostToolUse" => Self::PostToolUse,
            "Notification" => Self::Notification,
            "Stop" => Self::Stop,
            "PreCompact" => Self::PreCompact,
            "PostCompact" => Self::PostCompact,
            "SubagentStop" => Self::SubagentStop,
            Self::REPLAY_TAG => Self::Replay,
            _ => return None,
        };
        Some(kind)
    }

    pub fn from_payload(payload: &Value) -> Option<Self> {
        payload
            .get("hook")
            .and_then(Value::as_str)
            .and_then(Self::from_name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::Notification => "Notification",
            Self::Stop => "Stop",
            Self::PreCompact => "PreCompact",
            Self::PostCompact => "PostCompact",
            Self::SubagentStop => "SubagentStop",
            Self::Replay => Self::REPLAY_TAG,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolUseBegin {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<Value>,
}

impl ToolUseBegin {
    pub fn subagent_id(&self) -> Option<&str> {
        self.tool_input
            .as_ref()?
            .get("subagent_id")
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolUseEnd {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default, deserialize_with = "counter")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub tool_response: Option<Value>,
}

impl ToolUseEnd {
    pub fn reports_error(&self) -> bool {
        self.tool_response
            .as_ref()
            .and_then(|response| response.get("error"))
            .is_some_and(is_truthy)
    }

    /// Length of the tool output in UTF-16 code units, only when it is text.
    pub fn output_size(&self) -> Option<u64> {
        let output = self.tool_response.as_ref()?.get("output")?.as_str()?;
        u64::try_from(output.encode_utf16().count()).ok()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Notification {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionStop {
    #[serde(default, deserialize_with = "counter")]
    pub total_input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "counter")]
    pub total_output_tokens: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompactBegin {
    #[serde(default, deserialize_with = "counter")]
    pub tokens_before: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompactEnd {
    #[serde(default, deserialize_with = "counter")]
    pub tokens_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubagentStop {
    #[serde(default)]
    pub parent_agent_id: Option<AgentId>,
}

/// A recorded event in its canonical wire shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplayedEvent {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    #[serde(flatten)]
    pub kind: EventKind,
}

fn counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let count = match (number.as_u64(), number.as_i64()) {
        (Some(count), _) => count,
        (None, Some(_)) => 0,
        // Float-to-int casts saturate and map NaN to zero.
        (None, None) => number.as_f64().map_or(0, |n| n as u64),
    };
    Ok(Some(count))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
