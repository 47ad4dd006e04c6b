/// Failure reported by a [`RadioChannel`](crate::RadioChannel).
///
/// Neither variant is fatal anywhere in the core: a timeout reads as
/// "no data" and a transport fault is logged and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Nothing arrived within the read bound.
    Timeout,
    /// The UART (or whatever carries the bytes) reported a fault.
    Transport,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinkError::Timeout => f.write_str("timed out"),
            LinkError::Transport => f.write_str("transport fault"),
        }
    }
}
