use std::net::SocketAddr;
use std::path::PathBuf;

use traceviz_protocol::AgentId;

pub const DEFAULT_PORT: u16 = 7823;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub listen: SocketAddr,
    /// Directory holding `<session_id>.jsonl` logs.
    pub log_dir: PathBuf,
    /// Built dashboard assets served for non-API paths.
    pub web_dist: Option<PathBuf>,
    /// Agent id used when a submission carries no `agent_id`.
    pub default_agent_id: AgentId,
}

impl DaemonConfig {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            log_dir: log_dir.into(),
            web_dist: None,
            default_agent_id: AgentId::root(),
        }
    }

    pub fn listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    pub fn web_dist(mut self, web_dist: Option<PathBuf>) -> Self {
        self.web_dist = web_dist;
        self
    }

    pub fn default_agent_id(mut self, agent_id: AgentId) -> Self {
        self.default_agent_id = agent_id;
        self
    }

    /// `~/.trace-viz/sessions`, relative to the working directory when no
    /// home directory can be resolved.
    pub fn default_log_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trace-viz")
            .join("sessions")
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::new(Self::default_log_dir())
    }
}
