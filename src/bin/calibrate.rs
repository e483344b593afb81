#![no_std]
#![no_main]

//! # Battery divider calibration
//!
//! Powers the battery divider permanently and streams averaged ADC readings
//! as CSV over the USB console, together with the millivolts and percentage
//! the beacon would broadcast for them.
//!
//! ## Usage
//! ```sh
//! cargo flash --release --features firmware --bin calibrate --chip STM32F405RG
//! cat /dev/ttyACM0 > divider.csv
//! ```
//!
//! Compare `mv` against a bench meter on the cell terminals and adjust
//! `DIVIDER_RATIO` in `drivers/battery_adc.rs` if they disagree.
//!
//! ## Format CSV
//! `ts_ms,raw,mv,pct`

#[path = "../board.rs"]
mod board;
#[path = "../usb.rs"]
#[allow(dead_code)]
mod usb;
#[path = "../drivers/mod.rs"]
mod drivers {
    #[path = "battery_adc.rs"]
    pub mod battery_adc;
}

use core::fmt::Write;

use defmt::info;
use embassy_executor::Spawner;
use embassy_stm32::gpio::Pin;
use embassy_time::{Duration, Instant, Ticker};
use {defmt_rtt as _, panic_probe as _};

use occupancy_beacon::battery::LIPO_2000MAH;
use occupancy_beacon::hal::VoltageSampler;

use crate::board::Board;
use crate::drivers::battery_adc::{raw_to_mv, BatteryAdc};

const SAMPLE_RATE_HZ: u64 = 10;
/// Header is repeated so a late `cat` still sees the column names.
const HEADER_EVERY: u32 = 100;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let board = Board::init();
    let p = board.p;

    let (usb_dev, usb_serial) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();
    spawner.spawn(usb::console_task(usb_serial)).unwrap();

    let mut adc = BatteryAdc::new(p.ADC1, p.PC0, p.PC1.degrade());
    if adc.set_enabled(true).await.is_err() {
        usb::write_line("# divider enable failed");
    }
    info!("Calibration stream running at {} Hz", SAMPLE_RATE_HZ);

    let start = Instant::now();
    let mut ticker = Ticker::every(Duration::from_hz(SAMPLE_RATE_HZ));
    let mut n: u32 = 0;

    loop {
        ticker.next().await;

        if n % HEADER_EVERY == 0 {
            usb::write_line("# ts_ms,raw,mv,pct");
        }
        n = n.wrapping_add(1);

        let raw = adc.read_raw();
        let mv = raw_to_mv(raw);
        let pct = LIPO_2000MAH.percentage_of(mv);

        let mut line = heapless::String::<48>::new();
        let _ = write!(line, "{},{},{},{}", start.elapsed().as_millis(), raw, mv, pct);
        usb::write_line(&line);
    }
}
