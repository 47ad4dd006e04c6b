use embassy_futures::select::{select, Either};
use embassy_stm32::peripherals::{DMA1_CH1, DMA1_CH3, USART3};
use embassy_stm32::usart::{RingBufferedUartRx, Uart, UartTx};
use embassy_time::{Duration, Timer};
use signal_core::{LinkError, RadioChannel};
use static_cell::StaticCell;

/// Silence on the line that ends one frame (about 50 characters at 115200).
const FRAME_QUIET: Duration = Duration::from_millis(5);
/// Silence that ends an input flush.
const FLUSH_QUIET: Duration = Duration::from_millis(50);

/// Circular DMA target. Holds well over one poll interval of traffic, so
/// packets landing while the ingest loop sleeps wait here.
static RX_RING: StaticCell<[u8; 1024]> = StaticCell::new();

pub type LoraUartPeripheral = Uart<'static, USART3, DMA1_CH3, DMA1_CH1>;

/// LoRa module on USART3: DMA writes, circular-DMA reads.
///
/// The module answers commands and reports received packets as CRLF
/// terminated text, so a quiet line marks the end of a frame.
pub struct LoraUart {
    tx: UartTx<'static, USART3, DMA1_CH3>,
    rx: RingBufferedUartRx<'static, USART3, DMA1_CH1>,
}

impl LoraUart {
    /// Take the UART and start receiving into the ring straight away. Call once.
    pub fn new(uart: LoraUartPeripheral) -> Self {
        let (tx, rx) = uart.split();
        let mut rx = rx.into_ring_buffered(RX_RING.init([0; 1024]));
        if let Err(e) = rx.start() {
            // `read` restarts the ring on its next call.
            defmt::warn!("lora rx ring start failed: {}", e);
        }
        Self { tx, rx }
    }
}

impl RadioChannel for LoraUart {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.tx.write(bytes).await.map_err(|e| {
            defmt::warn!("lora tx error: {}", e);
            LinkError::Transport
        })
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, LinkError> {
        // Wait up to `timeout` for the first bytes.
        let mut n = match select(self.rx.read(buf), Timer::after(timeout)).await {
            Either::First(Ok(n)) => n,
            Either::First(Err(e)) => {
                defmt::warn!("lora rx error: {}", e);
                return Err(LinkError::Transport);
            }
            Either::Second(_) => return Err(LinkError::Timeout),
        };

        // The ring hands data over in pieces; keep going until the line is quiet.
        while n < buf.len() {
            match select(self.rx.read(&mut buf[n..]), Timer::after(FRAME_QUIET)).await {
                Either::First(Ok(more)) => n += more,
                Either::First(Err(e)) => {
                    defmt::warn!("lora rx error mid-frame: {}", e);
                    break;
                }
                Either::Second(_) => break,
            }
        }
        Ok(n)
    }

    async fn flush_input(&mut self) {
        let mut scratch = [0u8; 64];
        let mut discarded = 0usize;
        loop {
            match select(self.rx.read(&mut scratch), Timer::after(FLUSH_QUIET)).await {
                Either::First(Ok(n)) => discarded += n,
                // An overrun while draining is as good as discarding.
                Either::First(Err(_)) => {}
                Either::Second(_) => break,
            }
        }
        defmt::debug!("flushed {} bytes of lora input", discarded);
    }
}
