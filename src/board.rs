//! Clock tree and pin map of the controller board (STM32F405RG, 8 MHz HSE).
//!
//! | Function            | Pins / peripheral          |
//! |---------------------|----------------------------|
//! | LoRa module UART    | USART3 TX=PB10 RX=PB11     |
//! | Lane 1 signal head  | red=PC0 green=PC1          |
//! | Lane 2 signal head  | red=PC2 green=PC3          |
//! | USB console         | OTG_FS DM=PA11 DP=PA12     |
//! | Heartbeat LED       | PC13 (active low)          |

use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::Config;

/// The LoRa module ships at 115200 8N1.
pub const LORA_BAUD: u32 = 115_200;

pub struct Board {
    pub p: embassy_stm32::Peripherals,
}

impl Board {
    /// 168 MHz core from the PLL, with the 48 MHz Q output the USB FS core needs.
    ///
    /// Stock clock tree for this board, unchanged for the signal firmware.
    /// APB1 at 42 MHz clocks USART3, which reaches 115200 baud with
    /// negligible error.
    pub fn init() -> Self {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV2),
            divq: Some(PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;

        Self {
            p: embassy_stm32::init(config),
        }
    }
}
