mod logger;
mod store;

pub use logger::{SessionLogger, parse_session_log, read_session_log};
pub use store::EventStore;
