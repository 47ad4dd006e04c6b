//! Command/response exchange with the LoRa module.

use core::fmt::Write;

use embassy_time::Duration;

use crate::config::LinkConfig;
use crate::error::LinkError;

/// Size of one channel read, matching the module's UART buffer.
pub const FRAME_CAPACITY: usize = 512;

const COMMAND_CAPACITY: usize = 96;

/// Byte channel to the radio module.
///
/// Implementations own the transport; the core only sees bytes.
#[allow(async_fn_in_trait)]
pub trait RadioChannel {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Read whatever arrives within `timeout` into `buf`.
    ///
    /// Returns the number of bytes read, or [`LinkError::Timeout`] if none
    /// arrived in time.
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, LinkError>;

    /// Discard anything already buffered on the receive side.
    async fn flush_input(&mut self);
}

/// Raw answer to one command. Empty when the module stayed silent.
#[derive(Clone)]
pub struct Response {
    buf: [u8; FRAME_CAPACITY],
    len: usize,
}

impl Response {
    pub const fn empty() -> Self {
        Self {
            buf: [0; FRAME_CAPACITY],
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The response as text, cut at the first invalid UTF-8 byte and trimmed.
    pub fn as_str(&self) -> &str {
        let bytes = self.as_bytes();
        let text = match core::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
        };
        text.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl core::fmt::Debug for Response {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Response").field(&self.as_str()).finish()
    }
}

/// Synchronous AT-command link over a [`RadioChannel`].
pub struct RadioLink<C> {
    channel: C,
    timeout: Duration,
}

impl<C: RadioChannel> RadioLink<C> {
    pub fn new(channel: C, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    /// Write `command` plus CRLF and wait up to the command timeout for an
    /// answer.
    ///
    /// A silent module gives an empty [`Response`]; only a failed write is an
    /// error. Nothing is retried.
    pub async fn send_command(&mut self, command: &str) -> Result<Response, LinkError> {
        self.channel.write(command.as_bytes()).await?;
        self.channel.write(b"\r\n").await?;

        let mut response = Response::empty();
        // One byte short of the buffer, like the module's own read size.
        match self
            .channel
            .read(&mut response.buf[..FRAME_CAPACITY - 1], self.timeout)
            .await
        {
            Ok(n) => response.len = n,
            Err(LinkError::Timeout) => {}
            Err(e) => warn!("read after command failed: {}", e),
        }
        Ok(response)
    }

    /// Send `payload` to `address` with `AT+SEND`.
    pub async fn transmit(&mut self, address: u16, payload: &str) -> Result<Response, LinkError> {
        let mut cmd = heapless::String::<COMMAND_CAPACITY>::new();
        write!(cmd, "AT+SEND={},{},{}", address, payload.len(), payload)
            .map_err(|_| LinkError::Transport)?;
        self.send_command(&cmd).await
    }

    pub async fn flush_input(&mut self) {
        self.channel.flush_input().await
    }

    /// Hand the channel back, typically to the ingest loop.
    pub fn into_inner(self) -> C {
        self.channel
    }
}

/// Outcome of [`bring_up`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BringUpReport {
    pub answered: u8,
    pub silent: u8,
    pub failed: u8,
}

impl BringUpReport {
    pub fn is_clean(&self) -> bool {
        self.silent == 0 && self.failed == 0
    }
}

/// The AT commands that configure the module, in the order they are sent.
pub fn bring_up_commands(config: &LinkConfig) -> [heapless::String<COMMAND_CAPACITY>; 6] {
    let mut cmds: [heapless::String<COMMAND_CAPACITY>; 6] = Default::default();
    // Capacity covers the longest command with u32::MAX fields.
    let _ = write!(cmds[0], "AT+RESET");
    let _ = write!(cmds[1], "AT+MODE=0");
    let _ = write!(cmds[2], "AT+ADDRESS={}", config.address);
    let _ = write!(cmds[3], "AT+NETWORKID={}", config.network_id);
    let _ = write!(cmds[4], "AT+BAND={}", config.band_hz);
    let _ = write!(
        cmds[5],
        "AT+PARAMETER={},{},{},{}",
        config.spreading_factor, config.bandwidth, config.coding_rate, config.preamble
    );
    cmds
}

/// Configure the module, best effort.
///
/// Every command is sent once; silence or a write failure is logged and the
/// sequence carries on. Ends by flushing whatever the module still has
/// queued so the ingest loop starts on a clean line.
pub async fn bring_up<C: RadioChannel>(
    link: &mut RadioLink<C>,
    config: &LinkConfig,
) -> BringUpReport {
    let mut report = BringUpReport::default();

    for cmd in bring_up_commands(config).iter() {
        match link.send_command(cmd).await {
            Ok(resp) if !resp.is_empty() => {
                report.answered += 1;
                info!("{} -> {}", cmd.as_str(), resp.as_str());
            }
            Ok(_) => {
                report.silent += 1;
                warn!("{} -> no response", cmd.as_str());
            }
            Err(e) => {
                report.failed += 1;
                warn!("{} -> {}", cmd.as_str(), e);
            }
        }
    }

    link.flush_input().await;
    report
}
