//! Switch-capability extension hooks
//!
//! A plain source device ignores all of these. A device that also acts
//! as a CEC switch (multiple downstream inputs) injects an
//! implementation to perform the physical input changes and downstream
//! bookkeeping the routing handlers trigger.

use cec_protocol::{CecMessage, LogicalAddress, PhysicalAddress, PowerStatus};

use crate::state::RoutingState;

/// Capability set for switch-capable local devices
///
/// Every method has a no-op default, so a plain source device can use
/// [`NoSwitch`]. Implementations of [`switch_input`] must consult
/// [`RoutingState::is_switching_to_same_input`] themselves to avoid
/// redundant hardware toggles.
///
/// [`switch_input`]: SwitchBehavior::switch_input
pub trait SwitchBehavior: Send {
    /// A new active path was observed; change the physical input to
    /// follow it if this device routes that path
    fn switch_input(&mut self, routing: &RoutingState, path: PhysicalAddress) {
        let _ = (routing, path);
    }

    /// A <Routing Change> or <Routing Information> arrived while
    /// routing control is enabled
    fn handle_routing(&mut self, path: PhysicalAddress, msg: &CecMessage) {
        let _ = (path, msg);
    }

    /// Power status learned for a device connected through this switch
    fn update_power_status(&mut self, logical: LogicalAddress, status: PowerStatus) {
        let _ = (logical, status);
    }

    /// The local device stopped being the active source
    fn on_active_source_lost(&mut self) {}
}

/// The default no-op behavior for devices without switch functionality
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSwitch;

impl SwitchBehavior for NoSwitch {}
