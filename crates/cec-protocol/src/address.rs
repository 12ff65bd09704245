//! CEC addressing
//!
//! Two address spaces coexist on the bus: a 4-bit logical address that
//! identifies a device *class* for command addressing, and a 16-bit
//! physical address that encodes where the device sits in the HDMI port
//! tree. A device's identity on the bus is the pair of both.

use std::fmt;

/// A 4-bit CEC logical address
///
/// Values 0..=15 are valid on the wire. The `INVALID` sentinel lives
/// outside that range and is only ever produced by local state
/// defaults, never by parsing a well-formed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogicalAddress(pub u8);

impl LogicalAddress {
    /// The TV (always logical address 0)
    pub const TV: LogicalAddress = LogicalAddress(0);
    /// First recording device
    pub const RECORDER_1: LogicalAddress = LogicalAddress(1);
    /// First tuner
    pub const TUNER_1: LogicalAddress = LogicalAddress(3);
    /// First playback device
    pub const PLAYBACK_1: LogicalAddress = LogicalAddress(4);
    /// Audio system (soundbar/AVR)
    pub const AUDIO_SYSTEM: LogicalAddress = LogicalAddress(5);
    /// Second playback device
    pub const PLAYBACK_2: LogicalAddress = LogicalAddress(8);
    /// Third playback device
    pub const PLAYBACK_3: LogicalAddress = LogicalAddress(11);
    /// Unregistered (as initiator) / broadcast (as destination)
    pub const BROADCAST: LogicalAddress = LogicalAddress(15);
    /// Sentinel for "no address allocated"
    pub const INVALID: LogicalAddress = LogicalAddress(0xFF);

    /// Whether this address fits in the 4-bit wire field
    pub fn is_valid(&self) -> bool {
        self.0 <= 0xF
    }

    /// Raw wire value
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

/// A 16-bit CEC physical address: four nibbles, one per tree level
///
/// `0.0.0.0` is the TV at the root. A device on TV input 1 is
/// `1.0.0.0`; a device behind a switch on that input is `1.x.0.0`.
/// `F.F.F.F` (0xFFFF) is the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicalAddress(pub u16);

impl PhysicalAddress {
    /// Sentinel for "no address assigned"
    pub const INVALID: PhysicalAddress = PhysicalAddress(0xFFFF);
    /// The root of the port tree (the TV itself)
    pub const ROOT: PhysicalAddress = PhysicalAddress(0x0000);

    /// Create from a raw 16-bit value
    pub fn new(raw: u16) -> Self {
        PhysicalAddress(raw)
    }

    /// Whether this is a real bus position
    pub fn is_valid(&self) -> bool {
        self.0 != 0xFFFF
    }

    /// Raw wire value
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// The nibble at tree depth `level` (0 = outermost / TV input)
    pub fn nibble(&self, level: usize) -> u8 {
        debug_assert!(level < 4);
        ((self.0 >> (12 - 4 * level)) & 0xF) as u8
    }

    /// The TV input number this path hangs off, if any
    ///
    /// Returns `None` for the root and for the invalid sentinel.
    pub fn top_port(&self) -> Option<u8> {
        if !self.is_valid() || self.0 == 0 {
            return None;
        }
        Some(self.nibble(0))
    }

    /// Dotted display form, e.g. "1.2.0.0"
    pub fn port_path(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.nibble(0),
            self.nibble(1),
            self.nibble(2),
            self.nibble(3)
        )
    }

    /// The two big-endian parameter bytes for this address
    pub fn to_param_bytes(&self) -> [u8; 2] {
        [(self.0 >> 8) as u8, (self.0 & 0xFF) as u8]
    }

    /// Build from two big-endian parameter bytes
    pub fn from_param_bytes(hi: u8, lo: u8) -> Self {
        PhysicalAddress(((hi as u16) << 8) | lo as u16)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.port_path())
    }
}

/// A logical + physical address pair identifying one CEC endpoint
///
/// Equality is structural; both fields must match. This is the value
/// type behind the "active source" belief: the endpoint the local
/// device currently thinks is driving the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressPair {
    /// Logical (device-class) address
    pub logical: LogicalAddress,
    /// Physical (port-tree) address
    pub physical: PhysicalAddress,
}

impl AddressPair {
    /// Both fields at their sentinels
    pub const INVALID: AddressPair = AddressPair {
        logical: LogicalAddress::INVALID,
        physical: PhysicalAddress::INVALID,
    };

    /// Create a pair
    pub fn new(logical: LogicalAddress, physical: PhysicalAddress) -> Self {
        AddressPair { logical, physical }
    }

    /// Whether both halves are valid wire values
    pub fn is_valid(&self) -> bool {
        self.logical.is_valid() && self.physical.is_valid()
    }
}

impl fmt::Display for AddressPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.logical, self.physical.port_path())
    }
}

/// CEC device types as carried in ReportPhysicalAddress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceType {
    /// Television (root display)
    Tv,
    /// Recording device (DVR)
    RecordingDevice,
    /// Broadcast tuner
    Tuner,
    /// Playback device (disc player, streaming stick)
    PlaybackDevice,
    /// Audio system (AVR, soundbar)
    AudioSystem,
    /// CEC switch with no other role
    PureCecSwitch,
}

impl DeviceType {
    /// Wire value per CEC table 26
    pub fn as_u8(&self) -> u8 {
        match self {
            DeviceType::Tv => 0,
            DeviceType::RecordingDevice => 1,
            DeviceType::Tuner => 3,
            DeviceType::PlaybackDevice => 4,
            DeviceType::AudioSystem => 5,
            DeviceType::PureCecSwitch => 6,
        }
    }

    /// Whether this type can drive the display (claim active source)
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            DeviceType::RecordingDevice
                | DeviceType::Tuner
                | DeviceType::PlaybackDevice
                | DeviceType::AudioSystem
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_address_validity() {
        assert!(LogicalAddress::TV.is_valid());
        assert!(LogicalAddress::BROADCAST.is_valid());
        assert!(!LogicalAddress::INVALID.is_valid());
        assert!(!LogicalAddress(16).is_valid());
    }

    #[test]
    fn physical_address_nibbles() {
        let addr = PhysicalAddress(0x1234);
        assert_eq!(addr.nibble(0), 1);
        assert_eq!(addr.nibble(1), 2);
        assert_eq!(addr.nibble(2), 3);
        assert_eq!(addr.nibble(3), 4);
        assert_eq!(addr.port_path(), "1.2.3.4");
    }

    #[test]
    fn physical_address_top_port() {
        assert_eq!(PhysicalAddress(0x2000).top_port(), Some(2));
        assert_eq!(PhysicalAddress::ROOT.top_port(), None);
        assert_eq!(PhysicalAddress::INVALID.top_port(), None);
    }

    #[test]
    fn param_byte_round_trip() {
        let addr = PhysicalAddress(0x1A2B);
        let [hi, lo] = addr.to_param_bytes();
        assert_eq!(hi, 0x1A);
        assert_eq!(lo, 0x2B);
        assert_eq!(PhysicalAddress::from_param_bytes(hi, lo), addr);
    }

    #[test]
    fn pair_equality_is_structural() {
        let a = AddressPair::new(LogicalAddress::PLAYBACK_1, PhysicalAddress(0x1000));
        let b = AddressPair::new(LogicalAddress::PLAYBACK_1, PhysicalAddress(0x1000));
        let c = AddressPair::new(LogicalAddress::PLAYBACK_2, PhysicalAddress(0x1000));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!AddressPair::INVALID.is_valid());
    }

    #[test]
    fn source_device_types() {
        assert!(DeviceType::PlaybackDevice.is_source());
        assert!(!DeviceType::Tv.is_source());
        assert!(!DeviceType::PureCecSwitch.is_source());
    }
}
