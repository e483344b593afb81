//! u-blox NINA-B1 style BLE module driven over UART with AT commands.
//!
//! The module owns the radio; we only hand it complete advertising payloads
//! (`AT+UBTAD`) and switch discoverability on.

use core::fmt::Write;

use embassy_futures::select::{select, Either};
use embassy_stm32::peripherals::{DMA1_CH5, DMA1_CH6, USART2};
use embassy_stm32::usart::Uart;
use embassy_time::{Duration, Timer};
use heapless::String;

use occupancy_beacon::advertising::AdvertisingData;
use occupancy_beacon::error::{Error, Peripheral};
use occupancy_beacon::frame::FRAME_LEN;
use occupancy_beacon::hal::Broadcaster;
use occupancy_beacon::AdvertisingConfig;

const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);
const BOOT_RETRIES: usize = 10;

// AT+UBTLECFG parameter tags
const LECFG_ADV_INTERVAL_MIN: u8 = 1;
const LECFG_ADV_INTERVAL_MAX: u8 = 2;
// AT+UBTDM: 3 = general discoverable
const DISCOVERABLE_GENERAL: u8 = 3;
// AT+UBTCM: 1 = not connectable
const NOT_CONNECTABLE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
enum Response {
    Ok,
    Error,
    Timeout,
}

pub struct BleModule {
    uart: Uart<'static, USART2, DMA1_CH6, DMA1_CH5>,
    name: &'static str,
    rx: [u8; 64],
}

impl BleModule {
    pub fn new(uart: Uart<'static, USART2, DMA1_CH6, DMA1_CH5>) -> Self {
        Self { uart, name: "", rx: [0; 64] }
    }

    async fn command(&mut self, cmd: &str) -> Response {
        if self.uart.write(cmd.as_bytes()).await.is_err() || self.uart.write(b"\r").await.is_err() {
            return Response::Error;
        }

        let mut seen = 0usize;
        loop {
            match select(self.uart.read_until_idle(&mut self.rx[seen..]), Timer::after(RESPONSE_TIMEOUT)).await {
                Either::First(Ok(n)) => {
                    seen += n;
                    let reply = &self.rx[..seen];
                    if contains(reply, b"OK\r\n") {
                        return Response::Ok;
                    }
                    if contains(reply, b"ERROR") {
                        return Response::Error;
                    }
                    if seen == self.rx.len() {
                        // echo and URCs filled the buffer; keep only the tail
                        self.rx.copy_within(seen - 8.., 0);
                        seen = 8;
                    }
                }
                Either::First(Err(_)) => return Response::Error,
                Either::Second(()) => return Response::Timeout,
            }
        }
    }

    async fn expect_ok(&mut self, cmd: &str, on_error: Error) -> Result<(), Error> {
        match self.command(cmd).await {
            Response::Ok => Ok(()),
            other => {
                defmt::warn!("{=str} -> {}", cmd, other);
                Err(on_error)
            }
        }
    }

    async fn set_payload(&mut self, frame: &[u8; FRAME_LEN], on_error: Error) -> Result<(), Error> {
        let adv = AdvertisingData::build(self.name, frame);
        let mut cmd: String<96> = String::new();
        let _ = cmd.push_str("AT+UBTAD=");
        for b in adv.as_bytes() {
            let _ = write!(cmd, "{:02X}", b);
        }
        self.expect_ok(&cmd, on_error).await
    }
}

impl Broadcaster for BleModule {
    async fn enable(&mut self, config: &AdvertisingConfig) -> Result<(), Error> {
        const INIT: Error = Error::HardwareInit(Peripheral::Radio);
        self.name = config.device_name;

        // the module needs a moment after power-up before it answers
        let mut alive = false;
        for _ in 0..BOOT_RETRIES {
            if self.command("AT").await == Response::Ok {
                alive = true;
                break;
            }
            Timer::after(Duration::from_millis(100)).await;
        }
        if !alive {
            return Err(INIT);
        }

        let (min, max) = config.interval.units();
        let mut cmd: String<32> = String::new();
        let _ = write!(cmd, "AT+UBTLECFG={},{}", LECFG_ADV_INTERVAL_MIN, min);
        self.expect_ok(&cmd, INIT).await?;
        cmd.clear();
        let _ = write!(cmd, "AT+UBTLECFG={},{}", LECFG_ADV_INTERVAL_MAX, max);
        self.expect_ok(&cmd, INIT).await?;
        cmd.clear();
        let _ = write!(cmd, "AT+UBTCM={}", NOT_CONNECTABLE);
        self.expect_ok(&cmd, INIT).await
    }

    async fn advertise(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), Error> {
        self.set_payload(frame, Error::BroadcastUpdate).await?;
        let mut cmd: String<16> = String::new();
        let _ = write!(cmd, "AT+UBTDM={}", DISCOVERABLE_GENERAL);
        self.expect_ok(&cmd, Error::BroadcastUpdate).await
    }

    async fn update(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), Error> {
        self.set_payload(frame, Error::BroadcastUpdate).await
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
