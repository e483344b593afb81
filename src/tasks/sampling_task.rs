use core::fmt::Write;

use embassy_executor::task;
use heapless::String;

use occupancy_beacon::SamplingWorker;

use crate::drivers::battery_adc::BatteryAdc;
use crate::drivers::ble_module::BleModule;
use crate::drivers::lines::NodeLines;
use crate::usb;

pub type Worker = SamplingWorker<'static, NodeLines, BatteryAdc<'static>, BleModule>;

/// Sampling worker: one iteration per trigger, status echoed to the console.
#[task]
pub async fn sampling_task(mut worker: Worker) -> ! {
    worker
        .run(|result, f| {
            let mut line: String<64> = String::new();
            let _ = match result {
                Ok(()) => write!(
                    line,
                    "occ={} mv={} pct={} chg={}",
                    f.occupied as u8, f.millivolts, f.battery_pct, f.charging as u8
                ),
                Err(e) => write!(line, "sample failed: {}", e),
            };
            usb::write_line(&line);
        })
        .await
}
