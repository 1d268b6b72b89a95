//! # traceviz-protocol: canonical trace schema
//!
//! Shared contract between the hook normalizer, the event store, the
//! session logger and the daemon. Dependency-light on purpose: no tokio,
//! no axum, so presentation layers can depend on it as a pure schema crate.
//!
//! ## Module Overview
//!
//! - [`ids`]: Typed ID wrappers (EventId, SessionId, AgentId)
//! - [`event`]: TraceEvent + EventKind (tagged by `type`), ToolCategory
//! - [`stats`]: SessionStats, ToolCallsByType
//! - [`feed`]: Messages pushed to live subscribers
//! - [`error`]: TraceError, TraceResult

pub mod error;
pub mod event;
pub mod feed;
pub mod ids;
pub mod stats;

pub use error::{TraceError, TraceResult};
pub use event::{EventKind, NotificationLevel, ToolCategory, TraceEvent};
pub use feed::FeedMessage;
pub use ids::{AgentId, EventId, SessionId};
pub use stats::{SessionStats, ToolCallsByType};
