//! Tunables for the radio link, the ingest loop and the signal timing.
//!
//! Every config has a `const` default so it can sit in a `static` or be
//! handed to a task without allocation.

use embassy_time::Duration;

/// LoRa module settings pushed with AT commands at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Our own node address (`AT+ADDRESS`).
    pub address: u16,
    /// Network id shared with the counting node (`AT+NETWORKID`).
    pub network_id: u8,
    /// Carrier frequency in Hz (`AT+BAND`).
    pub band_hz: u32,
    /// Spreading factor, bandwidth index, coding rate, preamble (`AT+PARAMETER`).
    pub spreading_factor: u8,
    pub bandwidth: u8,
    pub coding_rate: u8,
    pub preamble: u8,
    /// How long a command waits for its answer.
    pub command_timeout: Duration,
}

impl LinkConfig {
    pub const DEFAULT: Self = Self {
        address: 10,
        network_id: 6,
        band_hz: 433_000_000,
        spreading_factor: 12,
        bandwidth: 7,
        coding_rate: 1,
        preamble: 4,
        command_timeout: Duration::from_millis(500),
    };
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Polling cadence of the telemetry ingest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IngestConfig {
    /// Upper bound on one channel read.
    pub read_timeout: Duration,
    /// Sleep after every poll, data or not.
    pub poll_interval: Duration,
    /// Log the frame counters every this many polls; 0 turns it off.
    pub stats_every: u32,
}

impl IngestConfig {
    pub const DEFAULT: Self = Self {
        read_timeout: Duration::from_millis(1000),
        poll_interval: Duration::from_millis(100),
        // About once a minute at the default cadence.
        stats_every: 600,
    };
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Green-time rules and the controller's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Green time when the chosen lane is quiet.
    pub short_green_secs: u32,
    /// Green time when the chosen lane is busy.
    pub long_green_secs: u32,
    /// A lane is busy when its count is strictly above this.
    pub busy_threshold: i32,
    /// Remaining seconds at which the next phase is precomputed.
    pub look_ahead_secs: u32,
    /// Length of one countdown second.
    pub tick: Duration,
    /// Pause between the end of one outer cycle and the next decision.
    pub cycle_pause: Duration,
}

impl TimingConfig {
    pub const DEFAULT: Self = Self {
        short_green_secs: 20,
        long_green_secs: 30,
        busy_threshold: 5,
        look_ahead_secs: 5,
        tick: Duration::from_secs(1),
        cycle_pause: Duration::from_secs(1),
    };

    /// Green time for a lane carrying `count` vehicles.
    pub const fn green_secs(&self, count: i32) -> u32 {
        if count <= self.busy_threshold {
            self.short_green_secs
        } else {
            self.long_green_secs
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
