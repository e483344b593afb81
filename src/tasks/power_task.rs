use defmt::error;
use embassy_executor::task;
use embassy_time::Duration;

use occupancy_beacon::PowerManager;

use crate::drivers::lines::Shutdown;

/// Idle timer: armed at spawn, powers the node off when it runs out.
#[task]
pub async fn power_task(power: &'static PowerManager, timeout: Duration, mut control: Shutdown) {
    let edge = power.run(timeout, &mut control).await;
    // power_off resets the core, so this only shows up if stop mode was refused
    error!("Still running after power off (armed {})", edge);
}
