//! The single consumer of sample requests. Owns the status frame and all
//! hardware reads; nothing else mutates the frame.

use crate::battery::DischargeCurve;
use crate::config::AdvertisingConfig;
use crate::error::{Error, Peripheral, Result, SamplingStage};
use crate::frame::StatusFrame;
use crate::hal::{Broadcaster, SensorLines, VoltageSampler};
use crate::power::PowerManager;
use crate::state::PowerReading;
use crate::trigger::SampleTrigger;

pub struct SamplingWorker<'a, L, V, B> {
    lines: L,
    sampler: V,
    radio: B,
    curve: &'a DischargeCurve,
    trigger: &'a SampleTrigger,
    power: &'a PowerManager,
    config: AdvertisingConfig,
    frame: StatusFrame,
    advertising: bool,
}

impl<'a, L, V, B> SamplingWorker<'a, L, V, B>
where
    L: SensorLines,
    V: VoltageSampler,
    B: Broadcaster,
{
    pub fn new(
        lines: L,
        sampler: V,
        radio: B,
        curve: &'a DischargeCurve,
        trigger: &'a SampleTrigger,
        power: &'a PowerManager,
        config: AdvertisingConfig,
    ) -> Self {
        Self {
            lines,
            sampler,
            radio,
            curve,
            trigger,
            power,
            config,
            frame: StatusFrame::default(),
            advertising: false,
        }
    }

    pub fn frame(&self) -> &StatusFrame {
        &self.frame
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    /// Brings the radio up. Unless gated, advertising starts right away with
    /// the boot defaults.
    pub async fn start(&mut self) -> Result<()> {
        let (min_ms, max_ms) = self.config.interval.millis();
        info!("Enabling radio, advertising every {}-{} ms", min_ms, max_ms);
        if let Err(e) = self.radio.enable(&self.config).await {
            error!("Bluetooth init failed: {}", e);
            return Err(Error::HardwareInit(Peripheral::Radio));
        }
        info!("Bluetooth initialized");

        if self.config.gate_start_until_first_sample {
            info!("Advertising held until the first sample");
            return Ok(());
        }
        self.begin_advertising().await
    }

    /// Serves sample requests forever. `on_sample` sees every outcome together
    /// with the frame as it stands afterwards.
    pub async fn run<F>(&mut self, mut on_sample: F) -> !
    where
        F: FnMut(&Result<()>, &StatusFrame),
    {
        loop {
            self.trigger.wait().await;
            let result = self.sample_once().await;
            on_sample(&result, &self.frame);
        }
    }

    /// One worker iteration. The idle timer is re-armed whatever the outcome.
    pub async fn sample_once(&mut self) -> Result<()> {
        info!("Updating sensor data");
        self.power.stop_idle_timer();

        let result = self.refresh().await;
        if let Err(e) = result {
            warn!("Sensor update skipped: {}", e);
        }

        self.power.restart_idle_timer();
        result
    }

    async fn refresh(&mut self) -> Result<()> {
        let reading = self.read_power().await?;
        let occupied = self.lines.occupancy();

        info!(
            "occupancy {}, voltage {}, percentage {}, charge state {}",
            occupied, reading.millivolts, reading.percentage, reading.charging
        );
        self.frame
            .update(occupied, reading.millivolts, reading.percentage, reading.charging);
        self.publish().await
    }

    async fn read_power(&mut self) -> Result<PowerReading> {
        if self.sampler.set_enabled(true).await.is_err() {
            error!("Failed to enable ADC");
            return Err(Error::Sampling(SamplingStage::Enable));
        }

        let millivolts = match self.sampler.sample_mv().await {
            Ok(mv) => mv,
            Err(e) => {
                error!("Failed to read battery voltage: {}", e);
                let _ = self.sampler.set_enabled(false).await;
                return Err(Error::Sampling(SamplingStage::Read));
            }
        };
        info!("Battery voltage: {} mV", millivolts);

        let percentage = self.curve.percentage_of(millivolts);
        info!("Battery percentage: {}", percentage);

        let vbus = self.lines.vbus_present();
        info!("VBUS: {}", vbus);
        let charging = vbus && self.lines.charge_status();
        info!("Charging state: {}", charging);

        if self.sampler.set_enabled(false).await.is_err() {
            error!("Failed to disable ADC");
            return Err(Error::Sampling(SamplingStage::Disable));
        }

        Ok(PowerReading { millivolts, percentage, vbus, charging })
    }

    async fn publish(&mut self) -> Result<()> {
        if !self.advertising {
            return self.begin_advertising().await;
        }
        let bytes = self.frame.serialize();
        self.radio.update(&bytes).await.map_err(|e| {
            error!("Failed to update advertising data: {}", e);
            Error::BroadcastUpdate
        })
    }

    async fn begin_advertising(&mut self) -> Result<()> {
        let bytes = self.frame.serialize();
        match self.radio.advertise(&bytes).await {
            Ok(()) => {
                self.advertising = true;
                info!("Advertising started");
                Ok(())
            }
            Err(e) => {
                error!("Advertising failed to start: {}", e);
                Err(Error::BroadcastUpdate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use heapless::Vec;

    use super::*;
    use crate::battery::LIPO_2000MAH;
    use crate::frame::{offset, FRAME_LEN};
    use crate::power::IdleCommand;

    #[derive(Default)]
    struct Lines {
        occupancy: bool,
        vbus: bool,
        charge: bool,
    }

    impl SensorLines for Lines {
        fn occupancy(&mut self) -> bool {
            self.occupancy
        }
        fn vbus_present(&mut self) -> bool {
            self.vbus
        }
        fn charge_status(&mut self) -> bool {
            self.charge
        }
    }

    struct Adc {
        reading: Result<u16>,
        enabled: bool,
        toggles: u32,
    }

    impl Adc {
        fn reading(reading: Result<u16>) -> Self {
            Self { reading, enabled: false, toggles: 0 }
        }
    }

    impl VoltageSampler for Adc {
        async fn set_enabled(&mut self, enabled: bool) -> Result<()> {
            self.enabled = enabled;
            self.toggles += 1;
            Ok(())
        }

        async fn sample_mv(&mut self) -> Result<u16> {
            assert!(self.enabled, "sampled with the divider off");
            self.reading
        }
    }

    #[derive(Default)]
    struct Radio {
        advertised: Vec<[u8; FRAME_LEN], 4>,
        updates: Vec<[u8; FRAME_LEN], 4>,
        reject_updates: bool,
    }

    impl Broadcaster for Radio {
        async fn enable(&mut self, _config: &AdvertisingConfig) -> Result<()> {
            Ok(())
        }

        async fn advertise(&mut self, frame: &[u8; FRAME_LEN]) -> Result<()> {
            self.advertised.push(*frame).unwrap();
            Ok(())
        }

        async fn update(&mut self, frame: &[u8; FRAME_LEN]) -> Result<()> {
            if self.reject_updates {
                return Err(Error::BroadcastUpdate);
            }
            self.updates.push(*frame).unwrap();
            Ok(())
        }
    }

    fn config(gated: bool) -> AdvertisingConfig {
        AdvertisingConfig {
            gate_start_until_first_sample: gated,
            ..AdvertisingConfig::default()
        }
    }

    #[test]
    fn sample_encodes_the_readings_and_pushes_an_update() {
        let (trigger, power) = (SampleTrigger::new(), PowerManager::new());
        let lines = Lines { occupancy: true, vbus: true, charge: true };
        let mut worker = SamplingWorker::new(
            lines,
            Adc::reading(Ok(3700)),
            Radio::default(),
            &LIPO_2000MAH,
            &trigger,
            &power,
            config(false),
        );

        block_on(async {
            worker.start().await.unwrap();
            worker.sample_once().await.unwrap();
        });

        assert_eq!(
            *worker.frame(),
            StatusFrame { battery_pct: 41, millivolts: 3700, charging: true, occupied: true }
        );
        assert_eq!(worker.radio.advertised.as_slice(), &[StatusFrame::default().serialize()]);
        assert_eq!(worker.radio.updates.as_slice(), &[worker.frame().serialize()]);
        assert_eq!(worker.sampler.toggles, 2);
        assert!(!worker.sampler.enabled);
        assert_eq!(power.command.try_take(), Some(IdleCommand::Restart));
    }

    #[test]
    fn charge_status_is_ignored_without_vbus() {
        let (trigger, power) = (SampleTrigger::new(), PowerManager::new());
        let lines = Lines { occupancy: false, vbus: false, charge: true };
        let mut worker = SamplingWorker::new(
            lines,
            Adc::reading(Ok(3950)),
            Radio::default(),
            &LIPO_2000MAH,
            &trigger,
            &power,
            config(false),
        );

        block_on(worker.sample_once()).unwrap();

        assert!(!worker.frame().charging);
        assert_eq!(worker.frame().battery_pct, 100);
    }

    #[test]
    fn failed_read_leaves_the_frame_alone_but_rearms_the_idle_timer() {
        let (trigger, power) = (SampleTrigger::new(), PowerManager::new());
        let mut worker = SamplingWorker::new(
            Lines { occupancy: true, ..Lines::default() },
            Adc::reading(Err(Error::Sampling(SamplingStage::Read))),
            Radio::default(),
            &LIPO_2000MAH,
            &trigger,
            &power,
            config(false),
        );

        let result = block_on(async {
            worker.start().await.unwrap();
            worker.sample_once().await
        });

        assert_eq!(result, Err(Error::Sampling(SamplingStage::Read)));
        assert_eq!(*worker.frame(), StatusFrame::default());
        assert!(worker.radio.updates.is_empty());
        assert!(!worker.sampler.enabled, "divider left powered");
        assert_eq!(power.command.try_take(), Some(IdleCommand::Restart));
    }

    #[test]
    fn rejected_update_is_reported_and_retried_next_time() {
        let (trigger, power) = (SampleTrigger::new(), PowerManager::new());
        let mut worker = SamplingWorker::new(
            Lines::default(),
            Adc::reading(Ok(3600)),
            Radio { reject_updates: true, ..Radio::default() },
            &LIPO_2000MAH,
            &trigger,
            &power,
            config(false),
        );

        block_on(async {
            worker.start().await.unwrap();
            assert_eq!(worker.sample_once().await, Err(Error::BroadcastUpdate));
            worker.radio.reject_updates = false;
            worker.sample_once().await.unwrap();
        });

        assert_eq!(worker.radio.updates.len(), 1);
        assert_eq!(worker.radio.updates[0][offset::VOLTAGE_LO], 0x10);
        assert_eq!(worker.radio.updates[0][offset::VOLTAGE_HI], 0x0e);
    }

    #[test]
    fn gated_start_advertises_the_first_real_sample() {
        let (trigger, power) = (SampleTrigger::new(), PowerManager::new());
        let mut worker = SamplingWorker::new(
            Lines { occupancy: true, ..Lines::default() },
            Adc::reading(Ok(3550)),
            Radio::default(),
            &LIPO_2000MAH,
            &trigger,
            &power,
            config(true),
        );

        block_on(async {
            worker.start().await.unwrap();
            assert!(!worker.is_advertising());
            worker.sample_once().await.unwrap();
        });

        assert!(worker.is_advertising());
        assert!(worker.radio.updates.is_empty());
        let first = worker.radio.advertised[0];
        assert_eq!(first[offset::BATTERY_PCT], 6);
        assert_eq!(first[offset::OCCUPANCY], 1);
    }

    #[test]
    fn run_waits_for_a_trigger() {
        use embassy_futures::select::{select, Either};
        use embassy_time::{Duration, Timer};

        let (trigger, power) = (SampleTrigger::new(), PowerManager::new());
        let mut worker = SamplingWorker::new(
            Lines::default(),
            Adc::reading(Ok(3800)),
            Radio::default(),
            &LIPO_2000MAH,
            &trigger,
            &power,
            config(false),
        );

        let mut seen = heapless::Vec::<(bool, u8), 4>::new();
        block_on(async {
            worker.start().await.unwrap();
            trigger.request_now();
            let run = worker.run(|result, frame| {
                seen.push((result.is_ok(), frame.battery_pct)).unwrap();
            });
            let outcome = select(run, Timer::after(Duration::from_millis(50))).await;
            assert!(matches!(outcome, Either::Second(())));
        });

        assert_eq!(seen.as_slice(), &[(true, LIPO_2000MAH.percentage_of(3800))]);
        assert_eq!(worker.radio.updates.len(), 1);
    }
}
