//! Typed ID wrappers.
//!
//! IDs are opaque String wrappers (serde-transparent). Event and session ids
//! are generated as UUID v4; agent ids come from the hook emitter verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from any string value.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Create a new ID using UUID v4 (random).
            pub fn new_uuid() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// View as string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(
    /// Unique identifier for a trace event.
    EventId
);
typed_id!(
    /// Identifier for one run of the external agent.
    SessionId
);
typed_id!(
    /// Identifier of the agent (or sub-agent) that emitted a hook.
    AgentId
);

impl SessionId {
    /// Placeholder used when a hook payload carries no session id.
    pub fn unknown() -> Self {
        Self("unknown".to_owned())
    }
}

impl AgentId {
    /// The root agent of a session.
    pub fn root() -> Self {
        Self("agent-0".to_owned())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::root()
    }
}
