use embassy_executor::task;
use embassy_time::Duration;

use occupancy_beacon::SampleTrigger;

#[task]
pub async fn debounce_task(trigger: &'static SampleTrigger, window: Duration) -> ! {
    trigger.run_debounce(window).await
}
