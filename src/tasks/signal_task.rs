use embassy_executor::task;
use signal_core::{run_signal_controller, TimingConfig};

use crate::drivers::signal_heads::SignalHeads;
use crate::state::LANE_COUNTS;

/// Signal controller — runs the phase state machine against the shared
/// counts for the lifetime of the firmware.
#[task]
pub async fn signal_task(mut heads: SignalHeads, timing: TimingConfig) -> ! {
    run_signal_controller(&LANE_COUNTS, &mut heads, timing).await
}
