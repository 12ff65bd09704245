//! CEC message model
//!
//! A bus frame is one header byte (initiator and destination nibbles),
//! an opcode, and zero or more parameter bytes. This module provides
//! the parsed representation, builder constructors for the frames a
//! source device emits, and typed extraction of routing parameters.

use crate::address::{LogicalAddress, PhysicalAddress};
use crate::error::ParseError;

/// Opcodes relevant to the active-source / routing-control feature set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    /// <Feature Abort> 0x00
    FeatureAbort,
    /// <Image View On> 0x04
    ImageViewOn,
    /// <Text View On> 0x0D
    TextViewOn,
    /// <Standby> 0x36
    Standby,
    /// <Routing Change> 0x80
    RoutingChange,
    /// <Routing Information> 0x81
    RoutingInformation,
    /// <Active Source> 0x82
    ActiveSource,
    /// <Report Physical Address> 0x84
    ReportPhysicalAddress,
    /// <Request Active Source> 0x85
    RequestActiveSource,
    /// <Set Stream Path> 0x86
    SetStreamPath,
    /// <Give Device Power Status> 0x8F
    GiveDevicePowerStatus,
    /// <Report Power Status> 0x90
    ReportPowerStatus,
    /// Any opcode this subsystem does not interpret
    Other(u8),
}

impl Opcode {
    /// Wire value
    pub fn as_u8(&self) -> u8 {
        match self {
            Opcode::FeatureAbort => 0x00,
            Opcode::ImageViewOn => 0x04,
            Opcode::TextViewOn => 0x0D,
            Opcode::Standby => 0x36,
            Opcode::RoutingChange => 0x80,
            Opcode::RoutingInformation => 0x81,
            Opcode::ActiveSource => 0x82,
            Opcode::ReportPhysicalAddress => 0x84,
            Opcode::RequestActiveSource => 0x85,
            Opcode::SetStreamPath => 0x86,
            Opcode::GiveDevicePowerStatus => 0x8F,
            Opcode::ReportPowerStatus => 0x90,
            Opcode::Other(raw) => *raw,
        }
    }

    /// Parse a wire value
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0x00 => Opcode::FeatureAbort,
            0x04 => Opcode::ImageViewOn,
            0x0D => Opcode::TextViewOn,
            0x36 => Opcode::Standby,
            0x80 => Opcode::RoutingChange,
            0x81 => Opcode::RoutingInformation,
            0x82 => Opcode::ActiveSource,
            0x84 => Opcode::ReportPhysicalAddress,
            0x85 => Opcode::RequestActiveSource,
            0x86 => Opcode::SetStreamPath,
            0x8F => Opcode::GiveDevicePowerStatus,
            0x90 => Opcode::ReportPowerStatus,
            other => Opcode::Other(other),
        }
    }
}

/// Device power status as carried in <Report Power Status>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerStatus {
    /// Fully on
    On,
    /// In standby
    Standby,
    /// Transitioning standby -> on
    TransientToOn,
    /// Transitioning on -> standby
    TransientToStandby,
    /// Not yet reported
    Unknown,
}

impl PowerStatus {
    /// Wire value (Unknown has none; encodes as 0xFF by convention)
    pub fn as_u8(&self) -> u8 {
        match self {
            PowerStatus::On => 0x00,
            PowerStatus::Standby => 0x01,
            PowerStatus::TransientToOn => 0x02,
            PowerStatus::TransientToStandby => 0x03,
            PowerStatus::Unknown => 0xFF,
        }
    }

    /// Parse a wire value
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0x00 => PowerStatus::On,
            0x01 => PowerStatus::Standby,
            0x02 => PowerStatus::TransientToOn,
            0x03 => PowerStatus::TransientToStandby,
            _ => PowerStatus::Unknown,
        }
    }
}

/// Abort reasons carried in <Feature Abort>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbortReason {
    /// Opcode not recognized
    UnrecognizedOpcode,
    /// Device cannot act on the opcode in its current mode
    NotInCorrectMode,
    /// Cannot provide the requested source
    CannotProvideSource,
    /// Operand out of range
    InvalidOperand,
    /// Feature present but declined
    Refused,
    /// Unable to determine status
    UnableToDetermine,
}

impl AbortReason {
    /// Wire value
    pub fn as_u8(&self) -> u8 {
        match self {
            AbortReason::UnrecognizedOpcode => 0,
            AbortReason::NotInCorrectMode => 1,
            AbortReason::CannotProvideSource => 2,
            AbortReason::InvalidOperand => 3,
            AbortReason::Refused => 4,
            AbortReason::UnableToDetermine => 5,
        }
    }
}

/// One parsed CEC frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CecMessage {
    /// Initiator logical address
    pub source: LogicalAddress,
    /// Destination logical address (BROADCAST for broadcast frames)
    pub destination: LogicalAddress,
    /// Message opcode
    pub opcode: Opcode,
    /// Opcode parameters
    pub params: Vec<u8>,
}

impl CecMessage {
    /// Generic constructor; prefer the named builders below
    pub fn new(
        source: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        params: Vec<u8>,
    ) -> Self {
        CecMessage {
            source,
            destination,
            opcode,
            params,
        }
    }

    /// Whether this frame is addressed to everyone
    pub fn is_broadcast(&self) -> bool {
        self.destination == LogicalAddress::BROADCAST
    }

    // ------------------------------------------------------------------
    // Builders for frames a source device emits
    // ------------------------------------------------------------------

    /// <Active Source> broadcast claiming `path`
    pub fn active_source(source: LogicalAddress, path: PhysicalAddress) -> Self {
        CecMessage::new(
            source,
            LogicalAddress::BROADCAST,
            Opcode::ActiveSource,
            path.to_param_bytes().to_vec(),
        )
    }

    /// <Request Active Source> broadcast
    pub fn request_active_source(source: LogicalAddress) -> Self {
        CecMessage::new(
            source,
            LogicalAddress::BROADCAST,
            Opcode::RequestActiveSource,
            Vec::new(),
        )
    }

    /// <Set Stream Path> broadcast (normally TV-originated)
    pub fn set_stream_path(source: LogicalAddress, path: PhysicalAddress) -> Self {
        CecMessage::new(
            source,
            LogicalAddress::BROADCAST,
            Opcode::SetStreamPath,
            path.to_param_bytes().to_vec(),
        )
    }

    /// <Routing Change> broadcast from `from` to `to`
    pub fn routing_change(
        source: LogicalAddress,
        from: PhysicalAddress,
        to: PhysicalAddress,
    ) -> Self {
        let mut params = from.to_param_bytes().to_vec();
        params.extend_from_slice(&to.to_param_bytes());
        CecMessage::new(source, LogicalAddress::BROADCAST, Opcode::RoutingChange, params)
    }

    /// <Routing Information> broadcast for `path`
    pub fn routing_information(source: LogicalAddress, path: PhysicalAddress) -> Self {
        CecMessage::new(
            source,
            LogicalAddress::BROADCAST,
            Opcode::RoutingInformation,
            path.to_param_bytes().to_vec(),
        )
    }

    /// <Standby> to one destination
    pub fn standby(source: LogicalAddress, destination: LogicalAddress) -> Self {
        CecMessage::new(source, destination, Opcode::Standby, Vec::new())
    }

    /// <Image View On> (wake the TV and show the source's video)
    pub fn image_view_on(source: LogicalAddress, destination: LogicalAddress) -> Self {
        CecMessage::new(source, destination, Opcode::ImageViewOn, Vec::new())
    }

    /// <Text View On> (wake the TV and show the source's menu)
    pub fn text_view_on(source: LogicalAddress, destination: LogicalAddress) -> Self {
        CecMessage::new(source, destination, Opcode::TextViewOn, Vec::new())
    }

    /// <Feature Abort> replying to `refused`
    pub fn feature_abort(
        source: LogicalAddress,
        destination: LogicalAddress,
        refused: Opcode,
        reason: AbortReason,
    ) -> Self {
        CecMessage::new(
            source,
            destination,
            Opcode::FeatureAbort,
            vec![refused.as_u8(), reason.as_u8()],
        )
    }

    /// <Give Device Power Status> query
    pub fn give_device_power_status(source: LogicalAddress, destination: LogicalAddress) -> Self {
        CecMessage::new(source, destination, Opcode::GiveDevicePowerStatus, Vec::new())
    }

    /// <Report Power Status> reply
    pub fn report_power_status(
        source: LogicalAddress,
        destination: LogicalAddress,
        status: PowerStatus,
    ) -> Self {
        CecMessage::new(
            source,
            destination,
            Opcode::ReportPowerStatus,
            vec![status.as_u8()],
        )
    }

    // ------------------------------------------------------------------
    // Frame codec
    // ------------------------------------------------------------------

    /// Encode to wire bytes: header, opcode, params
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.params.len());
        bytes.push((self.source.as_u8() & 0xF) << 4 | (self.destination.as_u8() & 0xF));
        bytes.push(self.opcode.as_u8());
        bytes.extend_from_slice(&self.params);
        bytes
    }

    /// Parse wire bytes
    ///
    /// Opcode-less polling frames are rejected; they are a transport
    /// concern and carry no protocol payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        let (&header, rest) = data.split_first().ok_or(ParseError::EmptyFrame)?;
        let (&opcode, params) = rest.split_first().ok_or(ParseError::MissingOpcode)?;
        Ok(CecMessage {
            source: LogicalAddress(header >> 4),
            destination: LogicalAddress(header & 0xF),
            opcode: Opcode::from_u8(opcode),
            params: params.to_vec(),
        })
    }
}

/// Read the two big-endian bytes at `offset` as a physical address
fn two_bytes_at(msg: &CecMessage, offset: usize) -> Result<PhysicalAddress, ParseError> {
    if msg.params.len() < offset + 2 {
        return Err(ParseError::MissingParams {
            expected: offset + 2,
            actual: msg.params.len(),
        });
    }
    Ok(PhysicalAddress::from_param_bytes(
        msg.params[offset],
        msg.params[offset + 1],
    ))
}

/// Extract the routing-relevant physical address from a message
///
/// For <Routing Change> this is the *new* address (param offset 2); for
/// <Active Source>, <Set Stream Path>, <Routing Information>, and
/// <Report Physical Address> it sits at offset 0.
pub fn physical_address_param(msg: &CecMessage) -> Result<PhysicalAddress, ParseError> {
    match msg.opcode {
        Opcode::ActiveSource
        | Opcode::SetStreamPath
        | Opcode::RoutingInformation
        | Opcode::ReportPhysicalAddress => two_bytes_at(msg, 0),
        Opcode::RoutingChange => two_bytes_at(msg, 2),
        other => Err(ParseError::NoAddressParam(other)),
    }
}

/// Extract both addresses of a <Routing Change>: (original, new)
pub fn routing_change_params(
    msg: &CecMessage,
) -> Result<(PhysicalAddress, PhysicalAddress), ParseError> {
    match msg.opcode {
        Opcode::RoutingChange => Ok((two_bytes_at(msg, 0)?, two_bytes_at(msg, 2)?)),
        other => Err(ParseError::NoAddressParam(other)),
    }
}
