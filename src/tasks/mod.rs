pub mod ingest_task;
pub mod signal_task;
