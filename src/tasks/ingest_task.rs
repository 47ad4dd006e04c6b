use embassy_executor::task;
use signal_core::{IngestConfig, TelemetryIngest};

use crate::drivers::lora::LoraUart;
use crate::state::LANE_COUNTS;

/// Telemetry ingest — polls the LoRa UART for `+RCV=` reports and publishes
/// each valid one into the shared lane counts.
#[task]
pub async fn ingest_task(lora: LoraUart, config: IngestConfig) -> ! {
    defmt::info!("telemetry ingest started");
    let mut ingest = TelemetryIngest::new(lora, &LANE_COUNTS, config);
    ingest.run().await
}
