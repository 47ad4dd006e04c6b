use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// One of the two approaches the controller arbitrates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lane {
    A,
    B,
}

impl Lane {
    pub const fn other(self) -> Lane {
        match self {
            Lane::A => Lane::B,
            Lane::B => Lane::A,
        }
    }

    /// Lane number as it appears on the wire (`LANE1`/`LANE2`) and in reports.
    pub const fn number(self) -> u8 {
        match self {
            Lane::A => 1,
            Lane::B => 2,
        }
    }
}

/// Vehicle counts for both lanes, always written as a pair.
///
/// Signed because the counting node's integers are taken as-is, sign
/// included; a negative count simply reads as "quiet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LaneCounts {
    pub lane_a: i32,
    pub lane_b: i32,
}

impl LaneCounts {
    pub const ZERO: Self = Self { lane_a: 0, lane_b: 0 };

    pub const fn new(lane_a: i32, lane_b: i32) -> Self {
        Self { lane_a, lane_b }
    }

    pub const fn get(&self, lane: Lane) -> i32 {
        match lane {
            Lane::A => self.lane_a,
            Lane::B => self.lane_b,
        }
    }
}

/// Lane counts shared between the ingest loop (writer) and the signal
/// controller (reader).
///
/// Both halves live in one `Cell` behind a blocking mutex, so a reader sees
/// either the whole previous pair or the whole new one. The lock is held
/// only for a `Copy` of eight bytes.
pub struct SharedCounts<M: RawMutex> {
    inner: Mutex<M, Cell<LaneCounts>>,
}

impl<M: RawMutex> SharedCounts<M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(LaneCounts::ZERO)),
        }
    }

    pub fn update(&self, counts: LaneCounts) {
        self.inner.lock(|cell| cell.set(counts));
    }

    pub fn snapshot(&self) -> LaneCounts {
        self.inner.lock(|cell| cell.get())
    }
}

impl<M: RawMutex> Default for SharedCounts<M> {
    fn default() -> Self {
        Self::new()
    }
}
