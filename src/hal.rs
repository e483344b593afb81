//! Collaborators the core drives. The firmware implements these on top of
//! embassy-stm32; tests implement them with recorders.
#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::frame::FRAME_LEN;
use crate::config::AdvertisingConfig;
use crate::state::WakeEdge;

/// Instantaneous levels of the sensing inputs, already active-high.
pub trait SensorLines {
    fn occupancy(&mut self) -> bool;
    fn vbus_present(&mut self) -> bool;
    fn charge_status(&mut self) -> bool;
}

/// Battery divider + ADC.
pub trait VoltageSampler {
    async fn set_enabled(&mut self, enabled: bool) -> Result<()>;
    async fn sample_mv(&mut self) -> Result<u16>;
}

/// Outward broadcast. `advertise` starts advertising, `update` swaps the
/// payload of a running advertisement.
pub trait Broadcaster {
    /// Resolves once the radio is ready to advertise.
    async fn enable(&mut self, config: &AdvertisingConfig) -> Result<()>;
    async fn advertise(&mut self, frame: &[u8; FRAME_LEN]) -> Result<()>;
    async fn update(&mut self, frame: &[u8; FRAME_LEN]) -> Result<()>;
}

/// Shutdown sequence of the node.
pub trait PowerControl {
    fn occupancy_level(&mut self) -> bool;
    fn arm_wake_edge(&mut self, edge: WakeEdge);
    /// Drop the pull resistor that only the charge-status input needs.
    fn release_charge_pull(&mut self);
    async fn flush_logs(&mut self);
    fn suspend_console(&mut self);
    /// Does not return on hardware; the next wake is a cold boot.
    fn power_off(&mut self);
}
