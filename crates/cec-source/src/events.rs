//! Unified event stream for the source device
//!
//! Everything observable about the engine (state transitions, outbound
//! traffic, action lifecycle) is emitted through a single event type,
//! drained in order by whatever owns the engine.

use cec_protocol::{AbortReason, AddressPair, CecMessage, Opcode};

use crate::actions::{ActionKind, ActionResult};
use crate::state::InputPort;

/// Events emitted by the source device engine
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// The active-source belief changed
    ActiveSourceChanged {
        /// Previous belief
        from: AddressPair,
        /// New belief
        to: AddressPair,
    },

    /// The local device was the active source and no longer is
    ActiveSourceLost,

    /// A hotplug connect requires the owning device to wake up
    WakeupRequested,

    /// A frame was queued for the transport layer
    MessageOut {
        /// The outbound frame
        message: CecMessage,
    },

    /// An inbound routing message was refused with <Feature Abort>
    FeatureAborted {
        /// The refused opcode
        opcode: Opcode,
        /// The reason sent back
        reason: AbortReason,
    },

    /// An action was launched
    ActionStarted {
        /// Which action
        kind: ActionKind,
    },

    /// An action reached its terminal result
    ActionCompleted {
        /// Which action
        kind: ActionKind,
        /// The result delivered to all waiters
        result: ActionResult,
    },

    /// The Routing Control feature was toggled
    RoutingEnabledChanged {
        /// New state
        enabled: bool,
    },

    /// The local active input changed
    LocalInputChanged {
        /// Newly selected input
        port: InputPort,
    },
}

impl SourceEvent {
    /// Whether this event describes outbound bus traffic
    pub fn is_traffic(&self) -> bool {
        matches!(self, SourceEvent::MessageOut { .. })
    }

    /// Whether this event describes an active-source transition
    pub fn is_active_source(&self) -> bool {
        matches!(
            self,
            SourceEvent::ActiveSourceChanged { .. } | SourceEvent::ActiveSourceLost
        )
    }

    /// Whether this event belongs to the action lifecycle
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            SourceEvent::ActionStarted { .. } | SourceEvent::ActionCompleted { .. }
        )
    }
}
