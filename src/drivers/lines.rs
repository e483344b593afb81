use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::{Idr, Pupdr};

use occupancy_beacon::hal::{PowerControl, SensorLines};
use occupancy_beacon::WakeEdge;

use crate::board;
use crate::usb;

/// Register-level view of an input pin whose `ExtiInput` is owned by an edge
/// task. Only reads the level and rewrites pull/EXTI trigger bits.
#[derive(Clone, Copy)]
pub struct Line {
    port: pac::gpio::Gpio,
    pin: usize,
}

impl Line {
    pub const fn new(port: pac::gpio::Gpio, pin: usize) -> Self {
        Self { port, pin }
    }

    pub fn is_high(&self) -> bool {
        self.port.idr().read().idr(self.pin) == Idr::HIGH
    }

    pub fn set_pull(&self, pull: Pupdr) {
        self.port.pupdr().modify(|w| w.set_pupdr(self.pin, pull));
    }

    /// Trigger only on `edge`; the other direction is masked.
    pub fn arm_edge(&self, edge: WakeEdge) {
        let exti = pac::EXTI;
        exti.rtsr(0).modify(|w| w.set_line(self.pin, edge == WakeEdge::Rising));
        exti.ftsr(0).modify(|w| w.set_line(self.pin, edge == WakeEdge::Falling));
        exti.pr(0).write(|w| w.set_line(self.pin, true));
        exti.imr(0).modify(|w| w.set_line(self.pin, true));
    }
}

pub fn occupancy() -> Line {
    Line::new(pac::GPIOB, board::OCCUPANCY_PIN)
}

pub fn charge_status() -> Line {
    Line::new(pac::GPIOB, board::CHARGE_STATUS_PIN)
}

pub fn vbus() -> Line {
    Line::new(pac::GPIOA, board::VBUS_PIN)
}

// ── Sampling view ─────────────────────────────────────────────────────────────

pub struct NodeLines {
    occupancy: Line,
    vbus: Line,
    charge: Line,
}

impl NodeLines {
    pub fn new() -> Self {
        Self {
            occupancy: occupancy(),
            vbus: vbus(),
            charge: charge_status(),
        }
    }
}

impl SensorLines for NodeLines {
    fn occupancy(&mut self) -> bool {
        self.occupancy.is_high()
    }

    fn vbus_present(&mut self) -> bool {
        self.vbus.is_high()
    }

    fn charge_status(&mut self) -> bool {
        // open-drain STAT pulls low while charging
        !self.charge.is_high()
    }
}

// ── Shutdown ──────────────────────────────────────────────────────────────────

pub struct Shutdown {
    occupancy: Line,
    charge: Line,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            occupancy: occupancy(),
            charge: charge_status(),
        }
    }
}

impl PowerControl for Shutdown {
    fn occupancy_level(&mut self) -> bool {
        self.occupancy.is_high()
    }

    fn arm_wake_edge(&mut self, edge: WakeEdge) {
        self.occupancy.arm_edge(edge);
    }

    fn release_charge_pull(&mut self) {
        self.charge.set_pull(Pupdr::FLOATING);
    }

    async fn flush_logs(&mut self) {
        defmt::flush();
        usb::drain().await;
    }

    fn suspend_console(&mut self) {
        usb::suspend();
    }

    /// Stop mode with only the occupancy EXTI line unmasked, then a full reset
    /// on wake so the node boots fresh.
    fn power_off(&mut self) {
        cortex_m::interrupt::disable();

        let exti = pac::EXTI;
        exti.imr(0).write(|w| w.set_line(self.occupancy.pin, true));
        exti.pr(0).write(|w| w.0 = 0xffff_ffff);

        pac::PWR.cr1().modify(|w| {
            w.set_pdds(pac::pwr::vals::Pdds::STOP_MODE);
            w.set_lpds(true);
        });

        // SAFETY: the executor never runs again after this point.
        let mut core = unsafe { cortex_m::Peripherals::steal() };
        core.SCB.set_sleepdeep();
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();

        cortex_m::peripheral::SCB::sys_reset();
    }
}
