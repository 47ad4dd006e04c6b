//! Radio side of the controller: poll, parse, publish.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;

use crate::config::IngestConfig;
use crate::counts::{LaneCounts, SharedCounts};
use crate::error::LinkError;
use crate::link::{RadioChannel, FRAME_CAPACITY};
use crate::parser;

/// Frame counters, wrapping like the rest of the firmware's diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IngestStats {
    /// Reads attempted, data or not.
    pub polls: u32,
    /// Non-empty reads.
    pub frames: u32,
    /// Frames that produced a count update.
    pub updates: u32,
    /// Frames that did not parse.
    pub dropped: u32,
    /// Reads that failed for a reason other than a timeout.
    pub read_errors: u32,
}

pub struct TelemetryIngest<'a, M: RawMutex, C: RadioChannel> {
    channel: C,
    counts: &'a SharedCounts<M>,
    config: IngestConfig,
    buf: [u8; FRAME_CAPACITY],
    stats: IngestStats,
}

impl<'a, M: RawMutex, C: RadioChannel> TelemetryIngest<'a, M, C> {
    pub fn new(channel: C, counts: &'a SharedCounts<M>, config: IngestConfig) -> Self {
        Self {
            channel,
            counts,
            config,
            buf: [0; FRAME_CAPACITY],
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// One bounded read. A frame that parses replaces both counts at once;
    /// anything else is dropped and the previous counts stay in effect.
    pub async fn poll_once(&mut self) -> Option<LaneCounts> {
        self.stats.polls = self.stats.polls.wrapping_add(1);
        let n = match self
            .channel
            .read(&mut self.buf[..FRAME_CAPACITY - 1], self.config.read_timeout)
            .await
        {
            Ok(0) | Err(LinkError::Timeout) => return None,
            Ok(n) => n,
            Err(e) => {
                self.stats.read_errors = self.stats.read_errors.wrapping_add(1);
                warn!("radio read failed: {}", e);
                return None;
            }
        };
        self.stats.frames = self.stats.frames.wrapping_add(1);

        match parser::parse(&self.buf[..n]) {
            Some(counts) => {
                self.counts.update(counts);
                self.stats.updates = self.stats.updates.wrapping_add(1);
                info!(
                    "updated counts -> lane A: {} | lane B: {}",
                    counts.lane_a,
                    counts.lane_b
                );
                Some(counts)
            }
            None => {
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                debug!("dropped {} byte frame", n);
                None
            }
        }
    }

    /// Poll forever, sleeping `poll_interval` after every read and logging
    /// the counters every `stats_every` polls.
    pub async fn run(&mut self) -> ! {
        loop {
            self.poll_once().await;
            if self.config.stats_every != 0 && self.stats.polls % self.config.stats_every == 0 {
                info!("ingest stats: {}", self.stats);
            }
            Timer::after(self.config.poll_interval).await;
        }
    }
}
