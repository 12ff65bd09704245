//! Outbound action launching and merging
//!
//! One-touch-play and the active-source broadcast are multi-step bus
//! sequences driven outside the engine. The launcher's job is small but
//! load-bearing: at most one instance of each action kind is in flight,
//! concurrent requests merge onto the running instance, and every
//! registered waiter receives exactly one terminal result.

use std::collections::HashMap;

use tokio::sync::oneshot;
use tracing::debug;

/// The action kinds this core can launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Power on the TV and claim active-source status
    OneTouchPlay,
    /// Re-broadcast the current active-source claim
    ActiveSourceBroadcast,
}

/// Terminal result delivered to each waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    /// Action completed
    Success,
    /// The target never reached the required state
    Timeout,
    /// The target device is not reachable
    TargetNotAvailable,
    /// Preconditions failed; nothing was started
    Failed,
}

/// A completion channel registered for a launched action
pub type ActionWaiter = oneshot::Sender<ActionResult>;

/// Outcome of a launch request
#[derive(Debug, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// No equivalent action was running; the caller must start one
    Started,
    /// An equivalent action was running; the waiter was attached to it
    Merged,
}

/// Registry of in-flight actions and their waiters
///
/// Lives on the serialized message path, so the merge check is
/// naturally atomic with the launch decision.
#[derive(Debug, Default)]
pub struct ActionLauncher {
    in_flight: HashMap<ActionKind, Vec<ActionWaiter>>,
}

impl ActionLauncher {
    /// Create an empty launcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an action of `kind` is currently running
    pub fn is_in_flight(&self, kind: ActionKind) -> bool {
        self.in_flight.contains_key(&kind)
    }

    /// Launch `kind` or merge onto the running instance
    pub fn launch_if_absent(&mut self, kind: ActionKind, waiter: ActionWaiter) -> LaunchOutcome {
        match self.in_flight.entry(kind) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                debug!(?kind, "merging onto in-flight action");
                entry.get_mut().push(waiter);
                LaunchOutcome::Merged
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(vec![waiter]);
                LaunchOutcome::Started
            }
        }
    }

    /// Launch `kind` with no waiter attached
    ///
    /// For actions started on behalf of a bus peer rather than a local
    /// caller; later waiters can still merge onto it.
    pub fn launch_internal(&mut self, kind: ActionKind) -> LaunchOutcome {
        match self.in_flight.entry(kind) {
            std::collections::hash_map::Entry::Occupied(_) => LaunchOutcome::Merged,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(Vec::new());
                LaunchOutcome::Started
            }
        }
    }

    /// Complete a waiter synchronously without launching anything
    ///
    /// Used for precondition failures. A dropped receiver is fine; the
    /// caller simply no longer cares.
    pub fn fail_waiter(waiter: ActionWaiter, result: ActionResult) {
        let _ = waiter.send(result);
    }

    /// Terminate `kind`, delivering `result` to every waiter exactly once
    ///
    /// Returns false if no such action was in flight (stale completion,
    /// ignored).
    pub fn complete(&mut self, kind: ActionKind, result: ActionResult) -> bool {
        let Some(waiters) = self.in_flight.remove(&kind) else {
            return false;
        };
        debug!(?kind, ?result, waiters = waiters.len(), "action complete");
        for waiter in waiters {
            let _ = waiter.send(result);
        }
        true
    }
}
