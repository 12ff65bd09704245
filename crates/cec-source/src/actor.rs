//! Source device actor
//!
//! Wraps the [`SourceDevice`] engine in a single async task so that all
//! message handling happens on one serialized path, in arrival order.
//! Commands come in through a channel; outbound frames go to the
//! transport channel and all observable activity to the event channel.
//!
//! # Architecture
//!
//! The actor owns the engine. After every engine call it drains the
//! engine's outbound and event buffers, so ordering on the channels
//! matches processing order exactly. A one-second interval drives the
//! one-touch-play power-status retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use cec_source::actor::{run_source_actor, SourceActorCommand};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(256);
//! let (bus_tx, bus_rx) = mpsc::channel(256);
//! let (event_tx, event_rx) = mpsc::channel(256);
//!
//! tokio::spawn(run_source_actor(device, cmd_rx, bus_tx, event_tx));
//! ```

use cec_protocol::{AddressPair, CecMessage};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::actions::ActionResult;
use crate::engine::{PortType, SourceDevice};
use crate::events::SourceEvent;
use crate::state::InputPort;

/// Snapshot of the device's externally interesting state
#[derive(Debug, Clone)]
pub struct SourceStatusSummary {
    /// Own logical+physical addresses
    pub own: AddressPair,
    /// Current active-source belief
    pub active_source: AddressPair,
    /// Whether the local device is the active source
    pub is_active_source: bool,
    /// Last valid routing-control port
    pub routing_port: InputPort,
    /// Currently selected input
    pub local_active_port: InputPort,
    /// Whether Routing Control is enabled
    pub routing_enabled: bool,
}

/// Commands sent to the source actor
#[derive(Debug)]
pub enum SourceActorCommand {
    /// A parsed frame arrived from the transport layer
    BusMessage {
        /// The inbound frame
        message: CecMessage,
    },

    /// Raw frame bytes arrived from the transport layer
    RawFrame {
        /// Header + opcode + params
        data: Vec<u8>,
    },

    /// A physical port connected or disconnected
    Hotplug {
        /// Which direction the port faces
        port_type: PortType,
        /// True on connect
        connected: bool,
    },

    /// Start (or join) a one-touch-play attempt
    OneTouchPlay {
        /// Completed exactly once with the terminal result
        response: oneshot::Sender<ActionResult>,
    },

    /// Send <Standby> to the TV
    SendStandby,

    /// Enable or disable the Routing Control feature
    SetRoutingEnabled {
        /// New state
        enabled: bool,
    },

    /// Record a routing-control port selection
    SetRoutingPort {
        /// The newly routed port
        port: InputPort,
    },

    /// Record the currently selected input
    SetLocalActivePort {
        /// The newly selected input
        port: InputPort,
    },

    /// Query a state snapshot
    QueryStatus {
        /// Channel for the snapshot
        response: oneshot::Sender<SourceStatusSummary>,
    },

    /// Adopt a fresh address allocation
    UpdateAddresses {
        /// New own addresses
        own: AddressPair,
    },

    /// Shut the actor down
    Shutdown,
}

/// Run the source device actor
///
/// Processes commands strictly in arrival order. Returns when the
/// command channel closes or a `Shutdown` command arrives.
pub async fn run_source_actor(
    mut device: SourceDevice,
    mut cmd_rx: mpsc::Receiver<SourceActorCommand>,
    bus_tx: mpsc::Sender<CecMessage>,
    event_tx: mpsc::Sender<SourceEvent>,
) {
    info!(own = %device.own_address(), "source actor started");

    // Drives one-touch-play power-status retries. The first tick is
    // delayed a full period; a retry immediately after startup would
    // race the initial query.
    let period = Duration::from_secs(1);
    let mut retry_timer = interval_at(Instant::now() + period, period);
    retry_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break; };
                match cmd {
                    SourceActorCommand::BusMessage { message } => {
                        if !device.handle_message(&message) {
                            debug!(opcode = ?message.opcode, "unhandled message");
                        }
                    }

                    SourceActorCommand::RawFrame { data } => {
                        match CecMessage::from_bytes(&data) {
                            Ok(message) => {
                                if !device.handle_message(&message) {
                                    debug!(opcode = ?message.opcode, "unhandled message");
                                }
                            }
                            Err(e) => {
                                warn!(%e, len = data.len(), "dropping unparseable frame");
                            }
                        }
                    }

                    SourceActorCommand::Hotplug { port_type, connected } => {
                        device.on_hotplug(port_type, connected);
                    }

                    SourceActorCommand::OneTouchPlay { response } => {
                        device.one_touch_play(response);
                    }

                    SourceActorCommand::SendStandby => {
                        device.send_standby();
                    }

                    SourceActorCommand::SetRoutingEnabled { enabled } => {
                        device.set_routing_enabled(enabled);
                        info!(enabled, "routing control toggled");
                    }

                    SourceActorCommand::SetRoutingPort { port } => {
                        device.set_routing_port(port);
                    }

                    SourceActorCommand::SetLocalActivePort { port } => {
                        device.set_local_active_port(port);
                    }

                    SourceActorCommand::QueryStatus { response } => {
                        let routing = device.routing_state();
                        let _ = response.send(SourceStatusSummary {
                            own: device.own_address(),
                            active_source: device.active_source(),
                            is_active_source: device.is_active_source(),
                            routing_port: routing.routing_port(),
                            local_active_port: routing.local_active_port(),
                            routing_enabled: routing.is_routing_enabled(),
                        });
                    }

                    SourceActorCommand::UpdateAddresses { own } => {
                        device.update_addresses(own);
                    }

                    SourceActorCommand::Shutdown => {
                        info!("source actor shutting down");
                        break;
                    }
                }
                flush(&mut device, &bus_tx, &event_tx).await;
            }
            _ = retry_timer.tick() => {
                device.on_retry_tick();
                flush(&mut device, &bus_tx, &event_tx).await;
            }
        }
    }

    info!("source actor stopped");
}

/// Forward everything the engine buffered during the last call
async fn flush(
    device: &mut SourceDevice,
    bus_tx: &mpsc::Sender<CecMessage>,
    event_tx: &mpsc::Sender<SourceEvent>,
) {
    for msg in device.drain_outbound() {
        if let Err(e) = bus_tx.send(msg).await {
            warn!(%e, "transport channel closed, dropping outbound frame");
        }
    }
    for event in device.drain_events() {
        let _ = event_tx.send(event).await;
    }
}
