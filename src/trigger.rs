//! Turns edge events into "sample now" requests for the sampling worker.
//!
//! Two sticky flags gate the worker: `ready` (something changed) and
//! `settled` (the input has been quiet long enough). Both are single-slot
//! [`Signal`]s, so any number of edges before the worker looks collapse into
//! one pending request.
//!
//! - Occupancy edges restart the debounce timer and raise `ready`. `settled`
//!   is only raised when the timer runs out.
//! - Charge/VBUS edges raise both at once.
//!
//! Nothing here ever clears a flag another producer raised; only the worker
//! consumes them.
//!
//! The `on_*` entry points never block and are safe to call from edge tasks
//! and interrupt handlers.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

pub struct SampleTrigger {
    ready: Signal<CriticalSectionRawMutex, ()>,
    settled: Signal<CriticalSectionRawMutex, ()>,
    restart: Signal<CriticalSectionRawMutex, ()>,
}

impl SampleTrigger {
    pub const fn new() -> Self {
        Self {
            ready: Signal::new(),
            settled: Signal::new(),
            restart: Signal::new(),
        }
    }

    /// Occupancy switch moved.
    /// A charge/VBUS request that is already pending stays pending.
    pub fn on_occupancy_edge(&self) {
        self.restart.signal(());
        self.ready.signal(());
    }

    /// Charge status or VBUS moved. Bypasses the debounce window.
    pub fn on_power_edge(&self) {
        self.settled.signal(());
        self.ready.signal(());
    }

    /// Sample as soon as the worker is free, e.g. right after boot.
    pub fn request_now(&self) {
        self.on_power_edge();
    }

    pub fn is_pending(&self) -> bool {
        self.ready.signaled()
    }

    /// Blocks until a sample is due and consumes the request.
    pub async fn wait(&self) {
        self.ready.wait().await;
        self.settled.wait().await;
    }

    /// Debounce timer. Single shot; each occupancy edge re-arms it for a full
    /// `window` instead of queueing another expiry.
    pub async fn run_debounce(&self, window: Duration) -> ! {
        loop {
            self.restart.wait().await;
            trace!("Debounce timer armed");
            while let Either::Second(()) = select(Timer::after(window), self.restart.wait()).await {
                trace!("Debounce timer restarted");
            }
            debug!("Debounce window elapsed");
            self.settled.signal(());
        }
    }
}

impl Default for SampleTrigger {
    fn default() -> Self {
        Self::new()
    }
}
