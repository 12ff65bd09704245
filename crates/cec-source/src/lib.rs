//! CEC Source Device Core
//!
//! This crate implements the active-source and routing-control logic of
//! an HDMI-CEC source device: tracking which endpoint on the bus
//! currently owns the display, claiming that ownership for the local
//! device (one-touch-play), and reacting to routing-control traffic so
//! that topology changes stay consistent.
//!
//! # Architecture
//!
//! The synchronous [`SourceDevice`] engine does all protocol work and
//! buffers its outbound frames and events; [`actor::run_source_actor`]
//! wraps it in a single task so every message is handled on one
//! serialized path, in arrival order, and [`SourceHandle`] gives
//! callers a typed async API over the actor's command channel.
//! Routing state lives in a shared
//! [`RoutingState`] cell so diagnostics can read it from any thread.
//!
//! Switch-capable devices inject a [`SwitchBehavior`] implementation;
//! plain sources use [`NoSwitch`]. One-touch-play and the
//! active-source broadcast are launched through an [`ActionLauncher`]
//! that merges concurrent requests onto the in-flight action and
//! guarantees exactly one terminal result per waiter.
//!
//! # Example
//!
//! ```rust,no_run
//! use cec_protocol::{AddressPair, LogicalAddress, PhysicalAddress};
//! use cec_source::{NoSwitch, SourceConfig, SourceDevice};
//!
//! let own = AddressPair::new(LogicalAddress::PLAYBACK_1, PhysicalAddress::new(0x1000));
//! let mut device = SourceDevice::new(SourceConfig::default(), own, Box::new(NoSwitch));
//!
//! // Process inbound frames:
//! // device.handle_message(&msg);
//! // then drain device.drain_outbound() to the transport.
//! ```

pub mod actions;
pub mod actor;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod state;
pub mod switch;

// Re-export actor types
pub use actor::{run_source_actor, SourceActorCommand, SourceStatusSummary};
pub use handle::SourceHandle;

// Re-export action types
pub use actions::{ActionKind, ActionLauncher, ActionResult, ActionWaiter, LaunchOutcome};

// Re-export event types
pub use events::SourceEvent;

// Re-export engine types
pub use engine::{PortType, SourceConfig, SourceDevice};
pub use error::SourceError;
pub use state::{ActiveSourceRegistry, InputPort, RoutingState};
pub use switch::{NoSwitch, SwitchBehavior};
