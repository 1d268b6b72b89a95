//! Hook payload normalization.
//!
//! The agent runtime emits loosely-shaped JSON at fixed lifecycle points.
//! [`normalize`] turns one payload into at most one [`TraceEvent`]; anything
//! it does not recognize is dropped by returning `None`.

mod hooks;

pub use hooks::HookKind;

use serde::Deserialize;
use serde_json::{Map, Value};
use traceviz_protocol::{
    AgentId, EventId, EventKind, NotificationLevel, SessionId, ToolCategory, TraceEvent,
    TraceResult,
};

use crate::hooks::{
    CompactBegin, CompactEnd, Notification, ReplayedEvent, SessionStop, SubagentStop,
    ToolUseBegin, ToolUseEnd,
};

/// Tool name the runtime uses to launch a sub-agent.
pub const SUBAGENT_TOOL: &str = "Task";

/// Normalize one hook payload on behalf of `agent_id`.
///
/// Returns `None` for a missing or unknown `hook` discriminator and for
/// payloads whose fields have the wrong JSON type. Never panics.
pub fn normalize(payload: &Value, agent_id: &AgentId) -> Option<TraceEvent> {
    let hook = HookKind::from_payload(payload)?;
    let base = Base::stamp(payload, agent_id)?;

    match hook {
        HookKind::PreToolUse => tool_use_begin(payload, base),
        HookKind::PostToolUse => tool_use_end(payload, base),
        HookKind::Notification => notification(payload, base),
        HookKind::Stop => session_stop(payload, base),
        HookKind::PreCompact => compact_begin(payload, base),
        HookKind::PostCompact => compact_end(payload, base),
        HookKind::SubagentStop => subagent_stop(payload, base),
        HookKind::Replay => replay(payload, base),
    }
}

/// Identity and capture time shared by every event built from one payload.
struct Base {
    id: EventId,
    session_id: SessionId,
    agent_id: AgentId,
    timestamp: u64,
}

impl Base {
    fn stamp(payload: &Value, agent_id: &AgentId) -> Option<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            session_id: Option<SessionId>,
        }

        let envelope = Envelope::deserialize(payload).ok()?;
        Some(Self {
            id: EventId::new_uuid(),
            session_id: envelope.session_id.unwrap_or_else(SessionId::unknown),
            agent_id: agent_id.clone(),
            timestamp: TraceEvent::now_millis(),
        })
    }

    fn into_event(self, kind: EventKind) -> TraceEvent {
        TraceEvent {
            id: self.id,
            session_id: self.session_id,
            agent_id: self.agent_id,
            timestamp: self.timestamp,
            kind,
            extra: Map::new(),
        }
    }
}

fn tool_use_begin(payload: &Value, base: Base) -> Option<TraceEvent> {
    let hook = ToolUseBegin::deserialize(payload).ok()?;
    let subagent_id = hook.subagent_id().map(AgentId::from_string);
    let tool_name = hook.tool_name.unwrap_or_default();

    // A sub-agent launch is reported as a spawn, never as a tool start.
    if tool_name == SUBAGENT_TOOL {
        let child = subagent_id.unwrap_or_else(|| synthesized_child(&base.id));
        let parent = base.agent_id.clone();
        return Some(base.into_event(EventKind::AgentSpawn {
            parent_agent_id: parent,
            child_agent_id: child,
        }));
    }

    let tool_type = ToolCategory::from_tool_name(&tool_name);
    Some(base.into_event(EventKind::ToolStart {
        tool_name,
        tool_type,
    }))
}

fn tool_use_end(payload: &Value, base: Base) -> Option<TraceEvent> {
    let hook = ToolUseEnd::deserialize(payload).ok()?;
    let success = !hook.reports_error();
    let output_size = hook.output_size();
    let tool_name = hook.tool_name.unwrap_or_default();
    let tool_type = ToolCategory::from_tool_name(&tool_name);

    Some(base.into_event(EventKind::ToolEnd {
        tool_name,
        tool_type,
        duration_ms: hook.duration_ms.unwrap_or(0),
        success,
        output_size,
    }))
}

fn notification(payload: &Value, base: Base) -> Option<TraceEvent> {
    let hook = Notification::deserialize(payload).ok()?;
    Some(base.into_event(EventKind::Notification {
        message: hook.message.unwrap_or_default(),
        level: NotificationLevel::Info,
    }))
}

fn session_stop(payload: &Value, base: Base) -> Option<TraceEvent> {
    let hook = SessionStop::deserialize(payload).ok()?;
    Some(base.into_event(EventKind::SessionEnd {
        total_input_tokens: hook.total_input_tokens.unwrap_or(0),
        total_output_tokens: hook.total_output_tokens.unwrap_or(0),
        model: hook.model.unwrap_or_else(|| "unknown".to_owned()),
    }))
}

fn compact_begin(payload: &Value, base: Base) -> Option<TraceEvent> {
    let hook = CompactBegin::deserialize(payload).ok()?;
    Some(base.into_event(EventKind::CompactStart {
        tokens_before: hook.tokens_before,
    }))
}

fn compact_end(payload: &Value, base: Base) -> Option<TraceEvent> {
    let hook = CompactEnd::deserialize(payload).ok()?;
    Some(base.into_event(EventKind::CompactEnd {
        tokens_after: hook.tokens_after,
    }))
}

fn subagent_stop(payload: &Value, base: Base) -> Option<TraceEvent> {
    let hook = SubagentStop::deserialize(payload).ok()?;
    let child = base.agent_id.clone();
    Some(base.into_event(EventKind::AgentComplete {
        parent_agent_id: hook.parent_agent_id.unwrap_or_default(),
        child_agent_id: child,
    }))
}

/// Forward a previously normalized event. Only `id` and `timestamp` are
/// re-stamped; every other field is kept as recorded, including ones no
/// variant describes.
fn replay(payload: &Value, base: Base) -> Option<TraceEvent> {
    let replayed = ReplayedEvent::deserialize(payload).ok()?;
    let event = TraceEvent {
        id: base.id,
        session_id: replayed.session_id.unwrap_or(base.session_id),
        agent_id: replayed.agent_id.unwrap_or(base.agent_id),
        timestamp: base.timestamp,
        kind: replayed.kind,
        extra: Map::new(),
    };
    match payload {
        Value::Object(raw) => event.carry_unknown_fields(raw.clone()).ok(),
        _ => Some(event),
    }
}

/// Submission body that re-ingests a recorded event through [`normalize`].
pub fn replay_payload(event: &TraceEvent) -> TraceResult<Value> {
    let mut payload = serde_json::to_value(event)?;
    if let Some(fields) = payload.as_object_mut() {
        fields.insert("hook".to_owned(), Value::from(HookKind::REPLAY_TAG));
    }
    Ok(payload)
}

fn synthesized_child(id: &EventId) -> AgentId {
    let raw = id.as_str();
    let prefix = raw.get(..6).unwrap_or(raw);
    AgentId::from_string(format!("agent-{prefix}"))
}
