//! Source device engine
//!
//! The message-handling core of a CEC source device: interprets inbound
//! routing and active-source traffic, maintains the active-source
//! belief and routing state, triggers the switch hooks, and launches
//! outbound actions. Everything here runs on a single serialized path;
//! outbound frames and events accumulate in buffers the owner drains
//! after each call.

use std::collections::HashMap;

use cec_protocol::{
    physical_address_param, AbortReason, AddressPair, CecMessage, DeviceType, LogicalAddress,
    Opcode, PhysicalAddress, PowerStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actions::{ActionKind, ActionLauncher, ActionResult, ActionWaiter, LaunchOutcome};
use crate::events::SourceEvent;
use crate::state::{ActiveSourceRegistry, InputPort, RoutingState};
use crate::switch::SwitchBehavior;

/// Power-status queries sent before a one-touch-play attempt times out
const POWER_QUERY_RETRIES: u8 = 10;

/// Static configuration of the local source device
///
/// `is_switch_device` is resolved once by the owning service layer (it
/// was a system property in earlier incarnations of this logic) and
/// passed in explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// CEC device type of the local device
    pub device_type: DeviceType,
    /// Whether the local device also has CEC switch functionality
    pub is_switch_device: bool,
    /// Initial state of the Routing Control feature
    pub routing_control_enabled: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::PlaybackDevice,
            is_switch_device: false,
            routing_control_enabled: false,
        }
    }
}

/// Direction of a physical HDMI port, as reported by the port inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    /// Downstream input into this device
    Input,
    /// Upstream output toward the display
    Output,
}

/// The active-source / routing-control engine
pub struct SourceDevice {
    config: SourceConfig,
    /// Own logical+physical allocation, supplied by the service layer
    own: AddressPair,
    registry: ActiveSourceRegistry,
    routing: RoutingState,
    switch: Box<dyn SwitchBehavior>,
    launcher: ActionLauncher,
    /// Power-status queries remaining for the in-flight one-touch-play
    otp_retries_left: u8,
    /// Last inbound message per sender and opcode; stale entries must
    /// not survive an upstream re-connect
    message_cache: HashMap<(LogicalAddress, Opcode), CecMessage>,
    outbound: Vec<CecMessage>,
    events: Vec<SourceEvent>,
}

impl SourceDevice {
    /// Create an engine for the device described by `config`
    ///
    /// `own` may still be `AddressPair::INVALID` if allocation has not
    /// finished; operations that need a real address fail gracefully
    /// until [`update_addresses`](Self::update_addresses) is called.
    pub fn new(config: SourceConfig, own: AddressPair, switch: Box<dyn SwitchBehavior>) -> Self {
        info!(
            device_type = ?config.device_type,
            is_switch = config.is_switch_device,
            routing = config.routing_control_enabled,
            "source device created"
        );
        let routing = RoutingState::new();
        routing.set_routing_enabled(config.routing_control_enabled);
        Self {
            config,
            own,
            registry: ActiveSourceRegistry::new(),
            routing,
            switch,
            launcher: ActionLauncher::new(),
            otp_retries_left: 0,
            message_cache: HashMap::new(),
            outbound: Vec::new(),
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The engine's configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Own logical+physical address pair
    pub fn own_address(&self) -> AddressPair {
        self.own
    }

    /// Current active-source belief
    pub fn active_source(&self) -> AddressPair {
        self.registry.get()
    }

    /// Whether the local device believes itself the active source
    pub fn is_active_source(&self) -> bool {
        self.registry.is_self(self.own)
    }

    /// A shared handle to the routing state, safe to read from any thread
    pub fn routing_state(&self) -> RoutingState {
        self.routing.clone()
    }

    /// The last message received from `sender` with `opcode`, if cached
    pub fn cached_message(&self, sender: LogicalAddress, opcode: Opcode) -> Option<&CecMessage> {
        self.message_cache.get(&(sender, opcode))
    }

    /// Adopt a fresh address allocation from the service layer
    pub fn update_addresses(&mut self, own: AddressPair) {
        info!(%own, "own addresses updated");
        self.own = own;
    }

    // ------------------------------------------------------------------
    // State mutation
    // ------------------------------------------------------------------

    /// Replace the active-source belief, firing change/loss notifications
    pub fn set_active_source(&mut self, new: AddressPair, reason: &str) {
        let old = self.registry.get();
        let was_self = self.registry.is_self(self.own);
        self.registry.set(new, reason);

        if old != new {
            self.events
                .push(SourceEvent::ActiveSourceChanged { from: old, to: new });
        }
        if was_self && !self.registry.is_self(self.own) {
            info!(reason, "active source lost");
            self.switch.on_active_source_lost();
            self.events.push(SourceEvent::ActiveSourceLost);
        }
    }

    /// Invalidate the logical owner while retaining the observed path
    ///
    /// The path stays relevant if this device routes traffic along it;
    /// the owner is unknown until further messages arrive.
    fn invalidate_active_source(&mut self, path: PhysicalAddress, reason: &str) {
        self.set_active_source(AddressPair::new(LogicalAddress::INVALID, path), reason);
    }

    /// Claim active-source status and broadcast the claim
    ///
    /// Single-device-type assumption: a playback device claims for
    /// itself directly instead of arbitrating across co-hosted types.
    fn set_and_broadcast_active_source(&mut self, reason: &str) {
        self.set_active_source(self.own, reason);
        self.send(CecMessage::active_source(self.own.logical, self.own.physical));
        self.events.push(SourceEvent::WakeupRequested);
    }

    /// Toggle the Routing Control feature
    pub fn set_routing_enabled(&mut self, enabled: bool) {
        self.routing.set_routing_enabled(enabled);
        self.events
            .push(SourceEvent::RoutingEnabledChanged { enabled });
    }

    /// Record a routing-control port selection
    pub fn set_routing_port(&mut self, port: InputPort) {
        self.routing.set_routing_port(port);
    }

    /// Record the currently selected input
    pub fn set_local_active_port(&mut self, port: InputPort) {
        self.routing.set_local_active_port(port);
        self.events.push(SourceEvent::LocalInputChanged { port });
    }

    // ------------------------------------------------------------------
    // Message dispatch
    // ------------------------------------------------------------------

    /// Process one inbound frame
    ///
    /// Returns true if the message was consumed by this engine. The
    /// caller drains [`drain_outbound`](Self::drain_outbound) and
    /// [`drain_events`](Self::drain_events) afterwards.
    pub fn handle_message(&mut self, msg: &CecMessage) -> bool {
        self.message_cache
            .insert((msg.source, msg.opcode), msg.clone());

        match msg.opcode {
            Opcode::ActiveSource => self.handle_active_source(msg),
            Opcode::RequestActiveSource => self.handle_request_active_source(msg),
            Opcode::SetStreamPath => self.handle_set_stream_path(msg),
            Opcode::RoutingChange | Opcode::RoutingInformation => self.handle_routing(msg),
            Opcode::ReportPowerStatus => self.handle_report_power_status(msg),
            _ => false,
        }
    }

    /// <Active Source>: adopt the broadcast claim
    ///
    /// Informational; never refused. The sender is evidently powered
    /// on, so the power-status hook fires even for duplicate claims.
    fn handle_active_source(&mut self, msg: &CecMessage) -> bool {
        let path = match physical_address_param(msg) {
            Ok(path) => path,
            Err(e) => {
                warn!(%e, "dropping malformed <Active Source>");
                return true;
            }
        };
        let claimed = AddressPair::new(msg.source, path);
        if self.registry.get() != claimed {
            self.set_active_source(claimed, "handle_active_source");
        }
        self.switch.update_power_status(msg.source, PowerStatus::On);
        if self.routing.is_routing_enabled() {
            self.switch.switch_input(&self.routing, path);
        }
        true
    }

    /// <Request Active Source>: answer only if we are the source
    fn handle_request_active_source(&mut self, _msg: &CecMessage) -> bool {
        if self.is_active_source() {
            self.start_active_source_broadcast();
        }
        true
    }

    /// <Set Stream Path>: selection, or evidence of routing elsewhere
    fn handle_set_stream_path(&mut self, msg: &CecMessage) -> bool {
        let path = match physical_address_param(msg) {
            Ok(path) => path,
            Err(e) => {
                warn!(%e, "dropping malformed <Set Stream Path>");
                return true;
            }
        };

        if path == self.own.physical && self.config.device_type == DeviceType::PlaybackDevice {
            // Being targeted is, for a playback device, being selected.
            self.set_and_broadcast_active_source("handle_set_stream_path");
        } else if path != self.own.physical || !self.is_active_source() {
            // Routing moved elsewhere, or references our path while we
            // were not active; either way we must not (keep) claiming.
            self.invalidate_active_source(path, "handle_set_stream_path");
        }
        self.switch.switch_input(&self.routing, path);
        true
    }

    /// <Routing Change> / <Routing Information>
    ///
    /// Same invalidation rule as <Set Stream Path>, but these two are
    /// meaningful only to routing-capable devices: with the feature
    /// disabled they are refused with <Feature Abort> instead of acted
    /// on.
    fn handle_routing(&mut self, msg: &CecMessage) -> bool {
        let path = match physical_address_param(msg) {
            Ok(path) => path,
            Err(e) => {
                warn!(%e, opcode = ?msg.opcode, "dropping malformed routing message");
                return true;
            }
        };

        if path != self.own.physical || !self.is_active_source() {
            self.invalidate_active_source(path, "handle_routing");
        }
        if !self.routing.is_routing_enabled() {
            self.send(CecMessage::feature_abort(
                self.own.logical,
                msg.source,
                msg.opcode,
                AbortReason::Refused,
            ));
            self.events.push(SourceEvent::FeatureAborted {
                opcode: msg.opcode,
                reason: AbortReason::Refused,
            });
            return true;
        }
        self.switch.handle_routing(path, msg);
        true
    }

    /// <Report Power Status>: feeds the one-touch-play settlement
    fn handle_report_power_status(&mut self, msg: &CecMessage) -> bool {
        let Some(&raw) = msg.params.first() else {
            warn!("dropping <Report Power Status> without status byte");
            return true;
        };
        let status = PowerStatus::from_u8(raw);
        self.switch.update_power_status(msg.source, status);

        if msg.source == LogicalAddress::TV
            && self.launcher.is_in_flight(ActionKind::OneTouchPlay)
        {
            match status {
                PowerStatus::On => {
                    self.set_and_broadcast_active_source("one_touch_play");
                    self.complete_action(ActionKind::OneTouchPlay, ActionResult::Success);
                }
                PowerStatus::Standby | PowerStatus::TransientToOn => {
                    // Still coming up; the retry timer keeps querying.
                    debug!(?status, "TV not ready, one-touch-play pending");
                }
                PowerStatus::TransientToStandby | PowerStatus::Unknown => {
                    debug!(?status, "TV heading down, one-touch-play pending");
                }
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Local operations
    // ------------------------------------------------------------------

    /// Hotplug on a physical port
    ///
    /// An output-port event invalidates the message cache (stale
    /// discovery data must not survive a physical reconnect). A connect
    /// asks the owning device to wake. The active-source belief is
    /// deliberately left alone: re-plugging a cable is not a loss of
    /// source status, and treating it as one causes re-negotiation
    /// storms.
    pub fn on_hotplug(&mut self, port_type: PortType, connected: bool) {
        if port_type == PortType::Output {
            debug!("output hotplug, flushing message cache");
            self.message_cache.clear();
        }
        if connected {
            self.events.push(SourceEvent::WakeupRequested);
        }
    }

    /// Queue a <Standby> to the TV; fire-and-forget
    pub fn send_standby(&mut self) {
        self.send(CecMessage::standby(self.own.logical, LogicalAddress::TV));
    }

    /// Start (or join) a one-touch-play attempt
    ///
    /// If an attempt is already running the waiter merges onto it.
    /// Precondition failures complete the waiter synchronously with
    /// `Failed` and leave all state untouched.
    pub fn one_touch_play(&mut self, waiter: ActionWaiter) {
        if self.launcher.is_in_flight(ActionKind::OneTouchPlay) {
            info!("one-touch-play already in progress, merging");
            self.launcher.launch_if_absent(ActionKind::OneTouchPlay, waiter);
            return;
        }
        if !self.own.is_valid() {
            warn!("cannot start one-touch-play without an address allocation");
            ActionLauncher::fail_waiter(waiter, ActionResult::Failed);
            return;
        }

        let outcome = self.launcher.launch_if_absent(ActionKind::OneTouchPlay, waiter);
        debug_assert_eq!(outcome, LaunchOutcome::Started);
        self.otp_retries_left = POWER_QUERY_RETRIES;
        self.send(CecMessage::image_view_on(self.own.logical, LogicalAddress::TV));
        self.send(CecMessage::give_device_power_status(
            self.own.logical,
            LogicalAddress::TV,
        ));
        self.events.push(SourceEvent::ActionStarted {
            kind: ActionKind::OneTouchPlay,
        });
    }

    /// Broadcast the active-source claim on behalf of a requester
    fn start_active_source_broadcast(&mut self) {
        // The broadcast needs no follow-up traffic, so it completes in
        // the same dispatch; merge never observes it in flight.
        let _ = self.launcher.launch_internal(ActionKind::ActiveSourceBroadcast);
        self.events.push(SourceEvent::ActionStarted {
            kind: ActionKind::ActiveSourceBroadcast,
        });
        self.send(CecMessage::active_source(self.own.logical, self.own.physical));
        self.complete_action(ActionKind::ActiveSourceBroadcast, ActionResult::Success);
    }

    /// Periodic tick from the owner; drives one-touch-play retries
    pub fn on_retry_tick(&mut self) {
        if !self.launcher.is_in_flight(ActionKind::OneTouchPlay) {
            return;
        }
        if self.otp_retries_left == 0 {
            warn!("one-touch-play timed out waiting for TV power-on");
            self.complete_action(ActionKind::OneTouchPlay, ActionResult::Timeout);
            return;
        }
        self.otp_retries_left -= 1;
        self.send(CecMessage::give_device_power_status(
            self.own.logical,
            LogicalAddress::TV,
        ));
    }

    fn complete_action(&mut self, kind: ActionKind, result: ActionResult) {
        if self.launcher.complete(kind, result) {
            self.events.push(SourceEvent::ActionCompleted { kind, result });
        }
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    fn send(&mut self, msg: CecMessage) {
        self.events.push(SourceEvent::MessageOut {
            message: msg.clone(),
        });
        self.outbound.push(msg);
    }

    /// Take all frames queued for the transport layer
    pub fn drain_outbound(&mut self) -> Vec<CecMessage> {
        std::mem::take(&mut self.outbound)
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<SourceEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for SourceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDevice")
            .field("config", &self.config)
            .field("own", &self.own)
            .field("active_source", &self.registry.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::NoSwitch;
    use cec_protocol::PhysicalAddress;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;

    const OWN_PHYS: PhysicalAddress = PhysicalAddress(0x1000);

    fn own_pair() -> AddressPair {
        AddressPair::new(LogicalAddress::PLAYBACK_1, OWN_PHYS)
    }

    fn playback_device() -> SourceDevice {
        SourceDevice::new(SourceConfig::default(), own_pair(), Box::new(NoSwitch))
    }

    /// Switch hook recorder for asserting side effects
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        SwitchInput(PhysicalAddress),
        HandleRouting(PhysicalAddress),
        PowerStatus(LogicalAddress, PowerStatus),
        SourceLost,
    }

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl SwitchBehavior for Recorder {
        fn switch_input(&mut self, _routing: &RoutingState, path: PhysicalAddress) {
            self.calls.lock().unwrap().push(Call::SwitchInput(path));
        }
        fn handle_routing(&mut self, path: PhysicalAddress, _msg: &CecMessage) {
            self.calls.lock().unwrap().push(Call::HandleRouting(path));
        }
        fn update_power_status(&mut self, logical: LogicalAddress, status: PowerStatus) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::PowerStatus(logical, status));
        }
        fn on_active_source_lost(&mut self) {
            self.calls.lock().unwrap().push(Call::SourceLost);
        }
    }

    fn recorded_device(config: SourceConfig) -> (SourceDevice, Recorder) {
        let recorder = Recorder::default();
        let device = SourceDevice::new(config, own_pair(), Box::new(recorder.clone()));
        (device, recorder)
    }

    fn make_self_active(device: &mut SourceDevice) {
        device.set_active_source(device.own_address(), "test setup");
        device.drain_events();
        device.drain_outbound();
    }

    #[test]
    fn active_source_broadcast_adopted() {
        let mut device = playback_device();
        let msg = CecMessage::active_source(LogicalAddress::PLAYBACK_2, PhysicalAddress(0x2000));

        assert!(device.handle_message(&msg));
        assert_eq!(
            device.active_source(),
            AddressPair::new(LogicalAddress::PLAYBACK_2, PhysicalAddress(0x2000))
        );
        assert!(!device.is_active_source());
    }

    #[test]
    fn duplicate_active_source_sets_once_but_marks_power_each_time() {
        let config = SourceConfig::default();
        let (mut device, recorder) = recorded_device(config);
        let msg = CecMessage::active_source(LogicalAddress::PLAYBACK_2, PhysicalAddress(0x2000));

        device.handle_message(&msg);
        let events: Vec<_> = device
            .drain_events()
            .into_iter()
            .filter(|e| e.is_active_source())
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(
            recorder.take(),
            vec![Call::PowerStatus(LogicalAddress::PLAYBACK_2, PowerStatus::On)]
        );

        // Identical re-affirmation: no state event, power hook again
        device.handle_message(&msg);
        assert!(device.drain_events().iter().all(|e| !e.is_active_source()));
        assert_eq!(
            recorder.take(),
            vec![Call::PowerStatus(LogicalAddress::PLAYBACK_2, PowerStatus::On)]
        );
    }

    #[test]
    fn active_source_switches_input_only_when_routing_enabled() {
        let (mut device, recorder) = recorded_device(SourceConfig::default());
        let msg = CecMessage::active_source(LogicalAddress::PLAYBACK_2, PhysicalAddress(0x2000));

        device.handle_message(&msg);
        assert!(!recorder.take().contains(&Call::SwitchInput(PhysicalAddress(0x2000))));

        device.set_routing_enabled(true);
        device.handle_message(&msg);
        assert!(recorder.take().contains(&Call::SwitchInput(PhysicalAddress(0x2000))));
    }

    #[test]
    fn set_stream_path_to_self_claims_and_broadcasts() {
        let mut device = playback_device();
        let msg = CecMessage::set_stream_path(LogicalAddress::TV, OWN_PHYS);

        assert!(device.handle_message(&msg));
        assert!(device.is_active_source());

        let out = device.drain_outbound();
        assert!(out
            .iter()
            .any(|m| m.opcode == Opcode::ActiveSource && m.is_broadcast()));
    }

    #[test]
    fn set_stream_path_to_self_does_not_claim_for_non_playback() {
        let config = SourceConfig {
            device_type: DeviceType::RecordingDevice,
            ..Default::default()
        };
        let mut device = SourceDevice::new(config, own_pair(), Box::new(NoSwitch));
        let msg = CecMessage::set_stream_path(LogicalAddress::TV, OWN_PHYS);

        device.handle_message(&msg);
        assert!(!device.is_active_source());
        // Belief invalidated but the observed path retained
        assert_eq!(device.active_source().physical, OWN_PHYS);
        assert_eq!(device.active_source().logical, LogicalAddress::INVALID);
    }

    #[test]
    fn set_stream_path_elsewhere_invalidates() {
        let mut device = playback_device();
        make_self_active(&mut device);

        let msg = CecMessage::set_stream_path(LogicalAddress::TV, PhysicalAddress(0x2000));
        device.handle_message(&msg);

        assert!(!device.is_active_source());
        assert_eq!(device.active_source().physical, PhysicalAddress(0x2000));
    }

    #[test]
    fn set_stream_path_always_fires_switch_hook() {
        let (mut device, recorder) = recorded_device(SourceConfig::default());
        let msg = CecMessage::set_stream_path(LogicalAddress::TV, PhysicalAddress(0x2000));
        device.handle_message(&msg);
        assert!(recorder.take().contains(&Call::SwitchInput(PhysicalAddress(0x2000))));
    }

    #[test]
    fn losing_active_source_fires_loss_hook() {
        let (mut device, recorder) = recorded_device(SourceConfig::default());
        make_self_active(&mut device);
        recorder.take();

        let msg = CecMessage::active_source(LogicalAddress::PLAYBACK_2, PhysicalAddress(0x2000));
        device.handle_message(&msg);

        assert!(recorder.take().contains(&Call::SourceLost));
        assert!(device
            .drain_events()
            .iter()
            .any(|e| matches!(e, SourceEvent::ActiveSourceLost)));
    }

    #[test]
    fn routing_change_refused_when_disabled() {
        let (mut device, recorder) = recorded_device(SourceConfig::default());
        let msg = CecMessage::routing_change(
            LogicalAddress::TV,
            PhysicalAddress(0x1000),
            PhysicalAddress(0x2000),
        );

        assert!(device.handle_message(&msg));

        let out = device.drain_outbound();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].opcode, Opcode::FeatureAbort);
        assert_eq!(out[0].destination, LogicalAddress::TV);
        assert_eq!(out[0].params, vec![0x80, AbortReason::Refused.as_u8()]);
        // Routing hook never called
        assert!(!recorder
            .take()
            .contains(&Call::HandleRouting(PhysicalAddress(0x2000))));
    }

    #[test]
    fn routing_change_delegates_when_enabled() {
        let (mut device, recorder) = recorded_device(SourceConfig {
            routing_control_enabled: true,
            ..Default::default()
        });
        let msg = CecMessage::routing_change(
            LogicalAddress::TV,
            PhysicalAddress(0x1000),
            PhysicalAddress(0x2000),
        );

        device.handle_message(&msg);
        assert!(device.drain_outbound().is_empty());
        // Uses the "to" address from offset 2
        assert!(recorder
            .take()
            .contains(&Call::HandleRouting(PhysicalAddress(0x2000))));
    }

    #[test]
    fn routing_information_invalidates_on_mismatch() {
        let mut device = playback_device();
        make_self_active(&mut device);

        let msg = CecMessage::routing_information(LogicalAddress::TV, PhysicalAddress(0x3000));
        device.handle_message(&msg);

        assert!(!device.is_active_source());
        assert_eq!(device.active_source().physical, PhysicalAddress(0x3000));
    }

    #[test]
    fn routing_to_own_path_while_active_keeps_claim() {
        let mut device = playback_device();
        device.set_routing_enabled(true);
        make_self_active(&mut device);

        let msg = CecMessage::routing_information(LogicalAddress::TV, OWN_PHYS);
        device.handle_message(&msg);
        assert!(device.is_active_source());
    }

    #[test]
    fn routing_to_own_path_while_not_active_does_not_claim() {
        let mut device = playback_device();
        device.set_routing_enabled(true);

        let msg = CecMessage::routing_information(LogicalAddress::TV, OWN_PHYS);
        device.handle_message(&msg);
        // Traffic referencing our path is not an affirmative claim
        assert!(!device.is_active_source());
    }

    #[test]
    fn request_active_source_answered_only_when_active() {
        let mut device = playback_device();
        let req = CecMessage::request_active_source(LogicalAddress::TV);

        device.handle_message(&req);
        assert!(device.drain_outbound().is_empty());

        make_self_active(&mut device);
        device.handle_message(&req);
        let out = device.drain_outbound();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].opcode, Opcode::ActiveSource);
    }

    #[test]
    fn hotplug_never_changes_active_source() {
        let mut device = playback_device();
        make_self_active(&mut device);

        for connected in [true, false, true] {
            device.on_hotplug(PortType::Input, connected);
            device.on_hotplug(PortType::Output, connected);
            assert!(device.is_active_source());
        }
    }

    #[test]
    fn output_hotplug_flushes_message_cache() {
        let mut device = playback_device();
        let msg = CecMessage::active_source(LogicalAddress::PLAYBACK_2, PhysicalAddress(0x2000));
        device.handle_message(&msg);
        assert!(device
            .cached_message(LogicalAddress::PLAYBACK_2, Opcode::ActiveSource)
            .is_some());

        device.on_hotplug(PortType::Input, false);
        assert!(device
            .cached_message(LogicalAddress::PLAYBACK_2, Opcode::ActiveSource)
            .is_some());

        device.on_hotplug(PortType::Output, false);
        assert!(device
            .cached_message(LogicalAddress::PLAYBACK_2, Opcode::ActiveSource)
            .is_none());
    }

    #[test]
    fn hotplug_connect_requests_wakeup() {
        let mut device = playback_device();
        device.on_hotplug(PortType::Input, true);
        assert!(device
            .drain_events()
            .iter()
            .any(|e| matches!(e, SourceEvent::WakeupRequested)));

        device.on_hotplug(PortType::Input, false);
        assert!(!device
            .drain_events()
            .iter()
            .any(|e| matches!(e, SourceEvent::WakeupRequested)));
    }

    #[test]
    fn send_standby_targets_tv() {
        let mut device = playback_device();
        device.send_standby();
        let out = device.drain_outbound();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].opcode, Opcode::Standby);
        assert_eq!(out[0].destination, LogicalAddress::TV);
        // No state change
        assert_eq!(device.active_source(), AddressPair::INVALID);
    }

    #[test]
    fn one_touch_play_sends_wake_and_power_query() {
        let mut device = playback_device();
        let (tx, _rx) = oneshot::channel();
        device.one_touch_play(tx);

        let out = device.drain_outbound();
        let opcodes: Vec<_> = out.iter().map(|m| m.opcode).collect();
        assert_eq!(
            opcodes,
            vec![Opcode::ImageViewOn, Opcode::GiveDevicePowerStatus]
        );
        assert!(!device.is_active_source());
    }

    #[test]
    fn one_touch_play_merges_concurrent_requests() {
        let mut device = playback_device();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, mut rx2) = oneshot::channel();
        let (tx3, mut rx3) = oneshot::channel();

        device.one_touch_play(tx1);
        let first_traffic = device.drain_outbound().len();
        device.one_touch_play(tx2);
        device.one_touch_play(tx3);
        // No extra bus traffic from merged requests
        assert_eq!(device.drain_outbound().len(), 0);
        assert_eq!(first_traffic, 2);

        // TV reports ON once; all three waiters complete
        let report = CecMessage::report_power_status(
            LogicalAddress::TV,
            LogicalAddress::PLAYBACK_1,
            PowerStatus::On,
        );
        device.handle_message(&report);

        assert_eq!(rx1.try_recv().unwrap(), ActionResult::Success);
        assert_eq!(rx2.try_recv().unwrap(), ActionResult::Success);
        assert_eq!(rx3.try_recv().unwrap(), ActionResult::Success);
        assert!(device.is_active_source());
    }

    #[test]
    fn one_touch_play_fails_synchronously_without_address() {
        let mut device = SourceDevice::new(
            SourceConfig::default(),
            AddressPair::INVALID,
            Box::new(NoSwitch),
        );
        let (tx, mut rx) = oneshot::channel();
        device.one_touch_play(tx);

        assert_eq!(rx.try_recv().unwrap(), ActionResult::Failed);
        assert!(device.drain_outbound().is_empty());
        assert_eq!(device.active_source(), AddressPair::INVALID);
    }

    #[test]
    fn one_touch_play_waits_through_transient_power() {
        let mut device = playback_device();
        let (tx, mut rx) = oneshot::channel();
        device.one_touch_play(tx);
        device.drain_outbound();

        let transient = CecMessage::report_power_status(
            LogicalAddress::TV,
            LogicalAddress::PLAYBACK_1,
            PowerStatus::TransientToOn,
        );
        device.handle_message(&transient);
        assert!(rx.try_recv().is_err());
        assert!(!device.is_active_source());

        let on = CecMessage::report_power_status(
            LogicalAddress::TV,
            LogicalAddress::PLAYBACK_1,
            PowerStatus::On,
        );
        device.handle_message(&on);
        assert_eq!(rx.try_recv().unwrap(), ActionResult::Success);
        assert!(device.is_active_source());
    }

    #[test]
    fn one_touch_play_times_out_after_retries() {
        let mut device = playback_device();
        let (tx, mut rx) = oneshot::channel();
        device.one_touch_play(tx);
        device.drain_outbound();

        for _ in 0..POWER_QUERY_RETRIES {
            device.on_retry_tick();
            assert!(rx.try_recv().is_err());
            // Each tick re-queries the TV
            let out = device.drain_outbound();
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].opcode, Opcode::GiveDevicePowerStatus);
        }

        device.on_retry_tick();
        assert_eq!(rx.try_recv().unwrap(), ActionResult::Timeout);
        assert!(!device.is_active_source());
    }

    #[test]
    fn power_report_from_non_tv_does_not_settle_claim() {
        let mut device = playback_device();
        let (tx, mut rx) = oneshot::channel();
        device.one_touch_play(tx);
        device.drain_outbound();

        let report = CecMessage::report_power_status(
            LogicalAddress::AUDIO_SYSTEM,
            LogicalAddress::PLAYBACK_1,
            PowerStatus::On,
        );
        device.handle_message(&report);
        assert!(rx.try_recv().is_err());
        assert!(!device.is_active_source());
    }

    #[test]
    fn unrelated_opcode_is_unhandled() {
        let mut device = playback_device();
        let msg = CecMessage::new(
            LogicalAddress::TV,
            LogicalAddress::PLAYBACK_1,
            Opcode::Other(0x46),
            Vec::new(),
        );
        assert!(!device.handle_message(&msg));
    }

    #[test]
    fn malformed_routing_params_consumed_without_state_change() {
        let mut device = playback_device();
        make_self_active(&mut device);

        let msg = CecMessage::new(
            LogicalAddress::TV,
            LogicalAddress::BROADCAST,
            Opcode::SetStreamPath,
            vec![0x10],
        );
        assert!(device.handle_message(&msg));
        assert!(device.is_active_source());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // A playback device claims on <Set Stream Path> exactly when
            // the path is its own, regardless of prior belief.
            #[test]
            fn stream_path_claim_matches_own_path(path: u16, active_before: bool) {
                let mut device = playback_device();
                if active_before {
                    make_self_active(&mut device);
                }

                let msg = CecMessage::set_stream_path(
                    LogicalAddress::TV,
                    PhysicalAddress(path),
                );
                device.handle_message(&msg);

                prop_assert_eq!(device.is_active_source(), path == OWN_PHYS.0);
                prop_assert_eq!(device.active_source().physical, PhysicalAddress(path));
            }

            // The observed path is always adopted from a claim, and only
            // a claim naming us makes us active.
            #[test]
            fn peer_claims_never_leave_us_active(sender in 0u8..16, path: u16) {
                let mut device = playback_device();
                make_self_active(&mut device);

                let msg = CecMessage::active_source(
                    LogicalAddress(sender),
                    PhysicalAddress(path),
                );
                device.handle_message(&msg);

                let still_self = LogicalAddress(sender) == device.own_address().logical
                    && PhysicalAddress(path) == OWN_PHYS;
                prop_assert_eq!(device.is_active_source(), still_self);
            }
        }
    }
}
