use embassy_stm32::adc::{Adc, SampleTime};
use embassy_stm32::gpio::{AnyPin, Level, Output, Speed};
use embassy_stm32::peripherals::{ADC1, PC0};
use embassy_time::{Delay, Duration, Timer};

use occupancy_beacon::error::{Error, SamplingStage};
use occupancy_beacon::hal::VoltageSampler;

/// 3.3 V reference, 12 bit.
const VREF_MV: u32 = 3300;
const FULL_SCALE: u32 = 4095;
/// 100k / 100k divider in front of PC0.
const DIVIDER_RATIO: u32 = 2;
const OVERSAMPLE: u32 = 8;
/// Divider output settling time after the enable FET switches on.
const SETTLE: Duration = Duration::from_millis(2);

pub struct BatteryAdc<'d> {
    adc: Adc<'d, ADC1>,
    pin: PC0,
    enable: Output<'d, AnyPin>,
}

impl<'d> BatteryAdc<'d> {
    pub fn new(adc: ADC1, pin: PC0, enable: AnyPin) -> Self {
        let mut adc = Adc::new(adc, &mut Delay);
        adc.set_sample_time(SampleTime::Cycles480);
        Self {
            adc,
            pin,
            enable: Output::new(enable, Level::Low, Speed::Low),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enable.is_set_high()
    }

    /// Averaged raw conversion.
    pub fn read_raw(&mut self) -> u16 {
        let mut sum = 0u32;
        for _ in 0..OVERSAMPLE {
            sum += self.adc.read(&mut self.pin) as u32;
        }
        (sum / OVERSAMPLE) as u16
    }
}

pub fn raw_to_mv(raw: u16) -> u16 {
    (raw as u32 * VREF_MV * DIVIDER_RATIO / FULL_SCALE) as u16
}

impl VoltageSampler for BatteryAdc<'_> {
    async fn set_enabled(&mut self, enabled: bool) -> Result<(), Error> {
        if enabled {
            self.enable.set_high();
            Timer::after(SETTLE).await;
        } else {
            self.enable.set_low();
        }
        if self.is_enabled() != enabled {
            let stage = if enabled { SamplingStage::Enable } else { SamplingStage::Disable };
            return Err(Error::Sampling(stage));
        }
        Ok(())
    }

    async fn sample_mv(&mut self) -> Result<u16, Error> {
        let raw = self.read_raw();
        // rail readings mean an open or shorted divider
        if raw == 0 || raw as u32 >= FULL_SCALE {
            return Err(Error::Sampling(SamplingStage::Read));
        }
        Ok(raw_to_mv(raw))
    }
}
