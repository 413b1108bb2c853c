use std::fmt;

use crate::stores::Access;

/// What a single invocation does to the proxy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Report the current state, change nothing.
    Read,
    /// Flip the current state.
    Update,
    Enable,
    Disable,
}

impl Operation {
    /// Access level needed on the system proxy store.
    pub fn access(self) -> Access {
        match self {
            Operation::Read => Access::ReadOnly,
            Operation::Update | Operation::Enable | Operation::Disable => Access::ReadWrite,
        }
    }

    pub fn needs_uri(self) -> bool {
        matches!(self, Operation::Update | Operation::Enable)
    }

    /// Whether the current state is read (and reported) before anything is
    /// written.
    pub fn reads_first(self) -> bool {
        matches!(self, Operation::Read | Operation::Update)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Enable => "enable",
            Operation::Disable => "disable",
        })
    }
}

/// The proxy state as seen by the system proxy store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enablement {
    Disabled,
    /// Enabled, with the active `host:port`.
    Enabled(String),
}

impl Enablement {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Enablement::Enabled(_))
    }

    pub fn netloc(&self) -> Option<&str> {
        match self {
            Enablement::Enabled(netloc) => Some(netloc),
            Enablement::Disabled => None,
        }
    }
}

impl fmt::Display for Enablement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Enablement::Enabled(netloc) => f.write_str(netloc),
            Enablement::Disabled => f.write_str("disabled"),
        }
    }
}

/// What [`ServiceManager::operate_proxy`](super::ServiceManager::operate_proxy)
/// observed and did.
///
/// `previous` is only filled for `Read` / `Update`, `applied` only for
/// operations that write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyOutcome {
    pub previous: Option<Enablement>,
    pub applied: Option<Enablement>,
}

impl ProxyOutcome {
    /// The reported states in order: zero, one or two of them.
    pub fn emitted(&self) -> Vec<&Enablement> {
        self.previous.iter().chain(self.applied.iter()).collect()
    }
}
