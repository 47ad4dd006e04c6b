pub mod lora;
pub mod signal_heads;
