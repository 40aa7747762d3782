//! Dispatcher lifecycle phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `Startup → Running → Killed`. `Frozen` is reserved; nothing transitions into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Startup,
    Running,
    Frozen,
    Killed,
}

impl NodeStatus {
    /// Routes may only be registered (and the node renamed) in this phase.
    pub fn accepts_registration(self) -> bool {
        self == NodeStatus::Startup
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Startup => "Startup",
            NodeStatus::Running => "Running",
            NodeStatus::Frozen => "Frozen",
            NodeStatus::Killed => "Killed",
        };
        f.write_str(s)
    }
}
