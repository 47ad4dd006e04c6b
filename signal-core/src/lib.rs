//! Hardware-independent core of the LoRa traffic-signal controller.
//!
//! Two long-running loops share one piece of state:
//! - the telemetry ingest loop polls the radio channel, parses `+RCV=` frames
//!   and publishes lane counts into [`SharedCounts`];
//! - the signal controller snapshots those counts, decides which lane gets
//!   green and for how long, and looks one phase ahead.
//!
//! Everything touching pins, UARTs or USB lives in the firmware crate and
//! reaches this crate through the [`RadioChannel`] and [`SignalDisplay`]
//! traits.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod controller;
pub mod counts;
pub mod display;
pub mod error;
pub mod ingest;
pub mod link;
pub mod parser;

#[cfg(test)]
mod testing;

pub use config::{IngestConfig, LinkConfig, TimingConfig};
pub use controller::{perform, run_signal_controller, Action, Phase, PhaseDecision, SignalController};
pub use counts::{Lane, LaneCounts, SharedCounts};
pub use display::SignalDisplay;
pub use error::LinkError;
pub use ingest::{IngestStats, TelemetryIngest};
pub use link::{bring_up, BringUpReport, RadioChannel, RadioLink, Response};
pub use parser::{encode_payload, parse, parse_rcv, RcvFrame};
