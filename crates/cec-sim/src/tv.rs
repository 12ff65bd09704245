//! Virtual TV simulation
//!
//! A minimal but protocol-accurate TV: answers power-status queries,
//! wakes on <Image View On>/<Text View On>, adopts <Active Source>
//! claims, and emits <Set Stream Path> when "the user" picks an input.

use std::collections::VecDeque;

use cec_protocol::{
    physical_address_param, AddressPair, CecMessage, LogicalAddress, Opcode, PhysicalAddress,
    PowerStatus,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for creating a virtual TV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualTvConfig {
    /// Initial power status
    pub initial_power: PowerStatus,
    /// Power-status queries the TV answers with a transient state
    /// before reporting ON (models slow panel wake-up)
    pub wakeup_query_delay: u8,
}

impl Default for VirtualTvConfig {
    fn default() -> Self {
        Self {
            initial_power: PowerStatus::Standby,
            wakeup_query_delay: 0,
        }
    }
}

/// A simulated TV on the bus
#[derive(Debug)]
pub struct VirtualTv {
    power: PowerStatus,
    /// Queries left to answer with TransientToOn while waking
    wakeup_queries_left: u8,
    wakeup_query_delay: u8,
    /// The TV's own view of who drives its display
    active_source: AddressPair,
    /// Pending replies, drained by the harness
    pending_output: VecDeque<CecMessage>,
}

impl VirtualTv {
    /// Create a TV with default settings (standby, instant wake)
    pub fn new() -> Self {
        Self::from_config(VirtualTvConfig::default())
    }

    /// Create a TV from configuration
    pub fn from_config(config: VirtualTvConfig) -> Self {
        Self {
            power: config.initial_power,
            wakeup_queries_left: 0,
            wakeup_query_delay: config.wakeup_query_delay,
            active_source: AddressPair::INVALID,
            pending_output: VecDeque::new(),
        }
    }

    /// Current power status
    pub fn power(&self) -> PowerStatus {
        self.power
    }

    /// The TV's active-source view
    pub fn active_source(&self) -> AddressPair {
        self.active_source
    }

    /// Consume one bus frame addressed to the TV or broadcast
    ///
    /// Frames for other destinations are ignored, as a real TV would.
    pub fn handle_message(&mut self, msg: &CecMessage) {
        if msg.destination != LogicalAddress::TV && !msg.is_broadcast() {
            return;
        }

        match msg.opcode {
            Opcode::ImageViewOn | Opcode::TextViewOn => {
                if self.power != PowerStatus::On {
                    debug!("TV waking up");
                    self.wakeup_queries_left = self.wakeup_query_delay;
                    self.power = if self.wakeup_query_delay > 0 {
                        PowerStatus::TransientToOn
                    } else {
                        PowerStatus::On
                    };
                }
            }

            Opcode::Standby => {
                debug!("TV entering standby");
                self.power = PowerStatus::Standby;
            }

            Opcode::GiveDevicePowerStatus => {
                if self.power == PowerStatus::TransientToOn {
                    if self.wakeup_queries_left == 0 {
                        self.power = PowerStatus::On;
                    } else {
                        self.wakeup_queries_left -= 1;
                    }
                }
                self.reply(CecMessage::report_power_status(
                    LogicalAddress::TV,
                    msg.source,
                    self.power,
                ));
            }

            Opcode::ActiveSource => {
                if let Ok(path) = physical_address_param(msg) {
                    self.active_source = AddressPair::new(msg.source, path);
                }
            }

            _ => {}
        }
    }

    /// Simulate the user selecting the input leading to `path`
    ///
    /// Broadcasts <Set Stream Path> the way a real TV does.
    pub fn select_input(&mut self, path: PhysicalAddress) {
        self.reply(CecMessage::set_stream_path(LogicalAddress::TV, path));
    }

    /// Ask the bus who is active (user pressed "info", roughly)
    pub fn request_active_source(&mut self) {
        self.reply(CecMessage::request_active_source(LogicalAddress::TV));
    }

    fn reply(&mut self, msg: CecMessage) {
        self.pending_output.push_back(msg);
    }

    /// Take the next pending reply
    pub fn take_output(&mut self) -> Option<CecMessage> {
        self.pending_output.pop_front()
    }

    /// Drain all pending replies
    pub fn drain_output(&mut self) -> Vec<CecMessage> {
        self.pending_output.drain(..).collect()
    }
}

impl Default for VirtualTv {
    fn default() -> Self {
        Self::new()
    }
}
