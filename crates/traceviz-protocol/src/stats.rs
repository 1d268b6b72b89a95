//! Aggregate session statistics.
//!
//! [`SessionStats`] is derived from the event sequence and nothing else:
//! given the session id, the process start time and the ordered events,
//! [`SessionStats::from_events`] always produces the same value.

use crate::event::{EventKind, ToolCategory, TraceEvent};
use crate::ids::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Completed tool calls per category. Unseen categories stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallsByType {
    pub bash: u64,
    pub file: u64,
    pub web: u64,
    pub task: u64,
    pub other: u64,
}

impl ToolCallsByType {
    pub fn record(&mut self, category: ToolCategory) {
        *self.slot_mut(category) += 1;
    }

    pub fn get(&self, category: ToolCategory) -> u64 {
        match category {
            ToolCategory::Bash => self.bash,
            ToolCategory::File => self.file,
            ToolCategory::Web => self.web,
            ToolCategory::Task => self.task,
            ToolCategory::Other => self.other,
        }
    }

    pub fn total(&self) -> u64 {
        ToolCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }

    fn slot_mut(&mut self, category: ToolCategory) -> &mut u64 {
        match category {
            ToolCategory::Bash => &mut self.bash,
            ToolCategory::File => &mut self.file,
            ToolCategory::Web => &mut self.web,
            ToolCategory::Task => &mut self.task,
            ToolCategory::Other => &mut self.other,
        }
    }
}

/// Statistics for the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_id: SessionId,
    /// Daemon start, milliseconds since UNIX epoch.
    pub start_time: u64,
    /// Timestamp of the first `session_end` event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub tool_call_count: u64,
    pub tool_calls_by_type: ToolCallsByType,
    pub agent_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl SessionStats {
    /// Fold the full event sequence into statistics.
    pub fn from_events(session_id: SessionId, start_time: u64, events: &[TraceEvent]) -> Self {
        let mut tool_calls_by_type = ToolCallsByType::default();
        let mut agents = HashSet::new();
        let mut session_end = None;

        for event in events {
            agents.insert(event.agent_id.as_str());
            match &event.kind {
                EventKind::ToolEnd { tool_type, .. } => tool_calls_by_type.record(*tool_type),
                EventKind::SessionEnd {
                    total_input_tokens,
                    total_output_tokens,
                    model,
                } if session_end.is_none() => {
                    session_end = Some((
                        event.timestamp,
                        *total_input_tokens,
                        *total_output_tokens,
                        model.clone(),
                    ));
                }
                _ => {}
            }
        }

        let (end_time, total_input_tokens, total_output_tokens, model) = match session_end {
            Some((at, input, output, model)) => (Some(at), input, output, Some(model)),
            None => (None, 0, 0, None),
        };

        Self {
            session_id,
            start_time,
            end_time,
            total_input_tokens,
            total_output_tokens,
            tool_call_count: tool_calls_by_type.total(),
            tool_calls_by_type,
            agent_count: agents.len(),
            model,
        }
    }
}
