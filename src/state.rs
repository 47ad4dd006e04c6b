//! Process-wide state shared between the executor tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use signal_core::SharedCounts;

pub type LaneCountsCell = SharedCounts<CriticalSectionRawMutex>;

/// Latest vehicle counts: written by the ingest task, read by the signal task.
pub static LANE_COUNTS: LaneCountsCell = SharedCounts::new();
