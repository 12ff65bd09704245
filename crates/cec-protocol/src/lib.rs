//! HDMI-CEC Protocol Library
//!
//! This crate provides the addressing model, message construction, and
//! frame parsing for the Consumer Electronics Control (CEC) command set
//! used by source devices on the HDMI bus:
//!
//! - **Logical addresses**: 4-bit device-class addresses used for
//!   command addressing (TV = 0, broadcast = 15)
//! - **Physical addresses**: 16-bit port-tree positions encoded as four
//!   nibbles ("1.2.0.0")
//! - **Messages**: header + opcode + parameter frames with builder
//!   constructors for the routing-control feature set
//!
//! # Architecture
//!
//! A [`CecMessage`] is the parsed form of one bus frame. Builders
//! produce outbound frames; [`CecMessage::from_bytes`] parses inbound
//! ones. Routing-related parameter fields are extracted through typed
//! helpers rather than raw offsets, because two structurally similar
//! messages carry the destination path at different offsets:
//!
//! - `SetStreamPath` / `RoutingInformation`: `[path:2]`
//! - `RoutingChange`: `[original path:2][new path:2]`, where consumers
//!   want the *new* path
//!
//! # Example
//!
//! ```rust
//! use cec_protocol::{CecMessage, LogicalAddress, PhysicalAddress};
//!
//! let msg = CecMessage::active_source(LogicalAddress::PLAYBACK_1, PhysicalAddress::new(0x1000));
//! let parsed = CecMessage::from_bytes(&msg.to_bytes()).unwrap();
//! assert_eq!(cec_protocol::physical_address_param(&parsed).unwrap(), PhysicalAddress::new(0x1000));
//! ```

pub mod address;
pub mod error;
pub mod message;

pub use address::{AddressPair, DeviceType, LogicalAddress, PhysicalAddress};
pub use error::ParseError;
pub use message::{
    physical_address_param, routing_change_params, AbortReason, CecMessage, Opcode, PowerStatus,
};
