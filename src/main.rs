#![no_std]
#![no_main]

mod board;
mod drivers;
mod state;
mod tasks;
mod usb;

use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Pin, Speed};
use embassy_stm32::usart::{Config as UsartConfig, Uart};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_time::{Duration, Timer};
use signal_core::{bring_up, IngestConfig, LinkConfig, RadioLink, TimingConfig};
use {defmt_rtt as _, panic_probe as _};

use crate::board::{Board, LORA_BAUD};
use crate::drivers::lora::LoraUart;
use crate::drivers::signal_heads::{SignalHead, SignalHeads};

/// Time the module needs after configuration before it reports packets.
const LINK_SETTLE: Duration = Duration::from_millis(2000);

// ── Interrupt bindings ────────────────────────────────────────────────────────
bind_interrupts!(struct Irqs {
    USART3 => embassy_stm32::usart::InterruptHandler<peripherals::USART3>;
});

// ── Main ──────────────────────────────────────────────────────────────────────
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Board init (168 MHz PLL)
    let board = Board::init();
    let p = board.p;

    // 2. USB console (CDC-ACM)
    let (usb_dev, console) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();

    // 3. Signal heads, both red until the first decision
    let lane_a = SignalHead::new(p.PC0.degrade(), p.PC1.degrade());
    let lane_b = SignalHead::new(p.PC2.degrade(), p.PC3.degrade());

    // 4. LoRa module on USART3 (TX=PB10, RX=PB11)
    let mut lora_config = UsartConfig::default();
    lora_config.baudrate = LORA_BAUD;
    let lora_uart = Uart::new(
        p.USART3, p.PB11, p.PB10,
        Irqs,
        p.DMA1_CH3, p.DMA1_CH1,
        lora_config,
    ).unwrap();

    // 5. Heartbeat LED (PC13)
    let mut led = Output::new(p.PC13, Level::High, Speed::Low);

    // 6. Link bring-up, best effort: a silent module is logged, not fatal
    let link_config = LinkConfig::DEFAULT;
    let mut link = RadioLink::new(LoraUart::new(lora_uart), link_config.command_timeout);
    let report = bring_up(&mut link, &link_config).await;
    if report.is_clean() {
        defmt::info!("lora link configured: {}", link_config);
    } else {
        defmt::warn!("lora link bring-up incomplete: {}", report);
    }
    Timer::after(LINK_SETTLE).await;

    // 7. Spawn the two long-running loops
    spawner.spawn(tasks::ingest_task::ingest_task(
        link.into_inner(),
        IngestConfig::DEFAULT,
    )).unwrap();

    spawner.spawn(tasks::signal_task::signal_task(
        SignalHeads::new(lane_a, lane_b, console),
        TimingConfig::DEFAULT,
    )).unwrap();

    // 8. Main task: LED heartbeat @ 1 Hz
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
