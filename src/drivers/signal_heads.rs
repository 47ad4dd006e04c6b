use embassy_stm32::gpio::{AnyPin, Level, Output, Speed};
use signal_core::{Lane, SignalDisplay};

use crate::usb::UsbConsole;

/// Red and green lamp drivers for one approach. Both lamps are active high.
pub struct SignalHead {
    red: Output<'static, AnyPin>,
    green: Output<'static, AnyPin>,
}

impl SignalHead {
    /// Starts red.
    pub fn new(red: AnyPin, green: AnyPin) -> Self {
        Self {
            red: Output::new(red, Level::High, Speed::Low),
            green: Output::new(green, Level::Low, Speed::Low),
        }
    }

    fn set_green(&mut self, green: bool) {
        // Red off before green on, and the reverse, so both never light together.
        if green {
            self.red.set_low();
            self.green.set_high();
        } else {
            self.green.set_low();
            self.red.set_high();
        }
    }
}

/// Both signal heads plus the status console.
pub struct SignalHeads {
    lane_a: SignalHead,
    lane_b: SignalHead,
    console: UsbConsole,
}

impl SignalHeads {
    pub fn new(lane_a: SignalHead, lane_b: SignalHead, console: UsbConsole) -> Self {
        Self {
            lane_a,
            lane_b,
            console,
        }
    }
}

impl SignalDisplay for SignalHeads {
    async fn show_signals(&mut self, green: Lane) {
        // Stop the lane losing green first.
        match green {
            Lane::A => {
                self.lane_b.set_green(false);
                self.lane_a.set_green(true);
            }
            Lane::B => {
                self.lane_a.set_green(false);
                self.lane_b.set_green(true);
            }
        }
        defmt::info!(
            "lane {} RED, lane {} GREEN",
            green.other().number(),
            green.number()
        );
    }

    async fn report(&mut self, line: &str) {
        defmt::info!("{=str}", line);
        self.console.write_line(line).await;
    }
}
