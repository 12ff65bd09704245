//! Client handle for the source actor
//!
//! A cheap, cloneable front for the actor's command channel. Callers
//! that only need to drive the device (service layers, diagnostics,
//! test harnesses) hold a `SourceHandle` instead of the raw channel,
//! and get typed results and errors back.

use cec_protocol::{AddressPair, CecMessage};
use tokio::sync::{mpsc, oneshot};

use crate::actions::ActionResult;
use crate::actor::{SourceActorCommand, SourceStatusSummary};
use crate::engine::PortType;
use crate::error::SourceError;
use crate::state::InputPort;

/// Handle to a running source actor
#[derive(Debug, Clone)]
pub struct SourceHandle {
    cmd_tx: mpsc::Sender<SourceActorCommand>,
}

impl SourceHandle {
    /// Wrap the actor's command channel
    pub fn new(cmd_tx: mpsc::Sender<SourceActorCommand>) -> Self {
        Self { cmd_tx }
    }

    async fn send(&self, cmd: SourceActorCommand) -> Result<(), SourceError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SourceError::ChannelClosed("actor command channel"))
    }

    /// Deliver a parsed frame from the transport layer
    pub async fn bus_message(&self, message: CecMessage) -> Result<(), SourceError> {
        self.send(SourceActorCommand::BusMessage { message }).await
    }

    /// Parse raw frame bytes and deliver them
    pub async fn inject_frame(&self, data: &[u8]) -> Result<(), SourceError> {
        let message = CecMessage::from_bytes(data)?;
        self.bus_message(message).await
    }

    /// Report a physical port connect or disconnect
    pub async fn hotplug(&self, port_type: PortType, connected: bool) -> Result<(), SourceError> {
        self.send(SourceActorCommand::Hotplug {
            port_type,
            connected,
        })
        .await
    }

    /// Run one-touch-play to completion
    ///
    /// Concurrent callers share a single bus sequence; each receives
    /// the same terminal result.
    pub async fn one_touch_play(&self) -> Result<ActionResult, SourceError> {
        let (tx, rx) = oneshot::channel();
        self.send(SourceActorCommand::OneTouchPlay { response: tx })
            .await?;
        rx.await
            .map_err(|_| SourceError::ChannelClosed("one-touch-play response"))
    }

    /// Send <Standby> to the TV
    pub async fn send_standby(&self) -> Result<(), SourceError> {
        self.send(SourceActorCommand::SendStandby).await
    }

    /// Enable or disable the Routing Control feature
    pub async fn set_routing_enabled(&self, enabled: bool) -> Result<(), SourceError> {
        self.send(SourceActorCommand::SetRoutingEnabled { enabled })
            .await
    }

    /// Record a routing-control port selection
    pub async fn set_routing_port(&self, port: InputPort) -> Result<(), SourceError> {
        self.send(SourceActorCommand::SetRoutingPort { port }).await
    }

    /// Record the currently selected input
    pub async fn set_local_active_port(&self, port: InputPort) -> Result<(), SourceError> {
        self.send(SourceActorCommand::SetLocalActivePort { port })
            .await
    }

    /// Adopt a fresh address allocation
    pub async fn update_addresses(&self, own: AddressPair) -> Result<(), SourceError> {
        self.send(SourceActorCommand::UpdateAddresses { own }).await
    }

    /// Fetch a state snapshot
    pub async fn status(&self) -> Result<SourceStatusSummary, SourceError> {
        let (tx, rx) = oneshot::channel();
        self.send(SourceActorCommand::QueryStatus { response: tx })
            .await?;
        rx.await
            .map_err(|_| SourceError::ChannelClosed("status response"))
    }

    /// Ask the actor to stop
    pub async fn shutdown(&self) -> Result<(), SourceError> {
        self.send(SourceActorCommand::Shutdown).await
    }
}
