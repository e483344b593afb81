use embassy_executor::task;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::AnyPin;

use occupancy_beacon::SampleTrigger;

/// Occupancy switch: every edge restarts the debounce window.
#[task]
pub async fn occupancy_edge_task(
    mut input: ExtiInput<'static, AnyPin>,
    trigger: &'static SampleTrigger,
) -> ! {
    loop {
        input.wait_for_any_edge().await;
        trigger.on_occupancy_edge();
    }
}

/// Charger STAT and VBUS: sampled immediately, no debounce.
#[task(pool_size = 2)]
pub async fn power_edge_task(
    mut input: ExtiInput<'static, AnyPin>,
    trigger: &'static SampleTrigger,
) -> ! {
    loop {
        input.wait_for_any_edge().await;
        trigger.on_power_edge();
    }
}
