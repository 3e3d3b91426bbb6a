//! Per-unit configuration carried by every transform unit instance.
//!
//! The engine reads these fields once at batch start, so callers may change them between
//! calls (for example to toggle verbosity) without affecting a batch already running.

use serde::Deserialize;

/// How concurrent workers may reach an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorAccess {
    /// Any number of workers may call the collaborator at once.
    Shared,
    /// One call at a time.
    Serialized,
    /// At most `n` concurrent calls.
    Pooled(usize),
}

impl CollaboratorAccess {
    /// Maximum number of concurrent calls, or `None` when unlimited.
    pub fn permits(&self) -> Option<usize> {
        match self {
            CollaboratorAccess::Shared => None,
            CollaboratorAccess::Serialized => Some(1),
            CollaboratorAccess::Pooled(n) => Some((*n).max(1)),
        }
    }
}

/// Engine-facing settings shared by all unit kinds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitConfig {
    /// Report progress after every item.
    pub verbose: bool,
    /// Worker count hint: `0` uses every available core, `1` runs sequentially.
    pub parallelism: usize,
    /// Overrides the collaborator's preferred access policy.
    pub collaborator_access: Option<CollaboratorAccess>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            parallelism: 1,
            collaborator_access: None,
        }
    }
}

impl UnitConfig {
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_collaborator_access(mut self, access: CollaboratorAccess) -> Self {
        self.collaborator_access = Some(access);
        self
    }

    /// Resolved worker count, never zero.
    pub fn worker_count(&self) -> usize {
        match self.parallelism {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}
