//! CEC Bus Simulation
//!
//! Simulated bus peers for exercising source-device logic without HDMI
//! hardware. The peers consume parsed frames and queue protocol-accurate
//! replies; a test harness shuttles the frames between peer and the
//! device under test.

pub mod tv;

pub use tv::{VirtualTv, VirtualTvConfig};
