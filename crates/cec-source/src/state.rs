//! Routing and active-source state
//!
//! Two pieces of state live here with different sharing disciplines.
//! `RoutingState` is read by diagnostic callers on arbitrary threads,
//! so it sits behind a mutex with narrow getters and setters.
//! `ActiveSourceRegistry` is only ever touched from the serialized
//! message-processing path and needs no lock.

use std::sync::{Arc, Mutex};

use cec_protocol::AddressPair;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An input of the local device
///
/// `Home` and `Hdmi` ports participate in CEC Routing Control. `Arc`
/// (audio return channel) is a selectable input but not a routing port,
/// so it updates the local active port without disturbing the recorded
/// routing port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputPort {
    /// The built-in home screen / internal source
    #[default]
    Home,
    /// A numbered HDMI input
    Hdmi(u8),
    /// Audio return channel input
    Arc,
}

impl InputPort {
    /// Whether this port participates in Routing Control
    pub fn is_routing(&self) -> bool {
        !matches!(self, InputPort::Arc)
    }
}

#[derive(Debug, Default)]
struct RoutingInner {
    /// Last valid routing-control port; fallback target when
    /// re-entering a routing context
    routing_port: InputPort,
    /// The input actually selected right now, routing or not
    local_active_port: InputPort,
    /// Whether the Routing Control feature is enabled
    routing_enabled: bool,
}

/// Shared routing state of the local device
///
/// Cloneable handle; all access goes through the methods below. Writers
/// are confined to the serialized message path, readers may be any
/// thread, so each method takes the lock for a single field copy.
#[derive(Debug, Clone, Default)]
pub struct RoutingState {
    inner: Arc<Mutex<RoutingInner>>,
}

impl RoutingState {
    /// Create with defaults: Home input, routing control disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new routing-control port
    ///
    /// Non-routing ports (ARC) are ignored; the previous valid routing
    /// port must survive an ARC switch.
    pub fn set_routing_port(&self, port: InputPort) {
        if !port.is_routing() {
            warn!("ignoring non-routing port {:?} as routing port", port);
            return;
        }
        self.inner.lock().expect("routing state lock poisoned").routing_port = port;
    }

    /// Last valid routing-control port
    pub fn routing_port(&self) -> InputPort {
        self.inner.lock().expect("routing state lock poisoned").routing_port
    }

    /// Record the currently selected input (routing or not)
    pub fn set_local_active_port(&self, port: InputPort) {
        self.inner
            .lock()
            .expect("routing state lock poisoned")
            .local_active_port = port;
    }

    /// The currently selected input
    pub fn local_active_port(&self) -> InputPort {
        self.inner
            .lock()
            .expect("routing state lock poisoned")
            .local_active_port
    }

    /// Whether `port` is already the selected input
    ///
    /// Switch implementations call this to elide redundant hardware
    /// toggles.
    pub fn is_switching_to_same_input(&self, port: InputPort) -> bool {
        self.local_active_port() == port
    }

    /// Enable or disable the Routing Control feature
    pub fn set_routing_enabled(&self, enabled: bool) {
        self.inner
            .lock()
            .expect("routing state lock poisoned")
            .routing_enabled = enabled;
    }

    /// Whether Routing Control is enabled
    pub fn is_routing_enabled(&self) -> bool {
        self.inner.lock().expect("routing state lock poisoned").routing_enabled
    }
}

/// The local device's belief about who currently drives the display
///
/// This is a belief, not a bus-enforced truth; peers may transiently
/// disagree until broadcasts converge. Holds exactly one value, default
/// invalid, only reset and never destroyed.
#[derive(Debug)]
pub struct ActiveSourceRegistry {
    current: AddressPair,
}

impl ActiveSourceRegistry {
    /// Start with no known active source
    pub fn new() -> Self {
        ActiveSourceRegistry {
            current: AddressPair::INVALID,
        }
    }

    /// Current belief
    pub fn get(&self) -> AddressPair {
        self.current
    }

    /// Replace the belief
    ///
    /// No deduplication happens here; call sites that must treat an
    /// equal value as a no-op check equality first. Loss detection
    /// (self was active, now is not) belongs to the engine wrapper.
    pub fn set(&mut self, new: AddressPair, reason: &str) {
        debug!(from = %self.current, to = %new, reason, "active source updated");
        self.current = new;
    }

    /// Whether `own` is the believed active source
    pub fn is_self(&self, own: AddressPair) -> bool {
        self.current == own
    }
}

impl Default for ActiveSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
