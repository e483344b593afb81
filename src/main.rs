#![no_std]
#![no_main]

mod board;
mod drivers;
mod tasks;
mod usb;

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_stm32::exti::{Channel, ExtiInput};
use embassy_stm32::gpio::{Input, Pin, Pull};
use embassy_stm32::usart::{Config as UsartConfig, Uart};
use embassy_stm32::{bind_interrupts, peripherals};
use {defmt_rtt as _, panic_probe as _};

use occupancy_beacon::battery::LIPO_2000MAH;
use occupancy_beacon::{Config, PowerManager, SampleTrigger, SamplingWorker};

use crate::board::Board;
use crate::drivers::battery_adc::BatteryAdc;
use crate::drivers::ble_module::BleModule;
use crate::drivers::lines::{NodeLines, Shutdown};
use crate::tasks::debounce_task::debounce_task;
use crate::tasks::edge_task::{occupancy_edge_task, power_edge_task};
use crate::tasks::power_task::power_task;
use crate::tasks::sampling_task::sampling_task;

// ── Shared state ──────────────────────────────────────────────────────────────
//  Written from edge/timer tasks, consumed by the sampling worker.
static TRIGGER: SampleTrigger = SampleTrigger::new();
static POWER: PowerManager = PowerManager::new();

// ── Interrupt bindings ────────────────────────────────────────────────────────
bind_interrupts!(struct Irqs {
    USART2 => embassy_stm32::usart::InterruptHandler<peripherals::USART2>;
});

// ── Main ──────────────────────────────────────────────────────────────────────
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Occupancy sensor application running on {=str}", board::NAME);
    let config = Config::default();

    // 1. Board init
    let board = Board::init();
    let p = board.p;

    // 2. USB console
    let (usb_dev, usb_serial) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();
    spawner.spawn(usb::console_task(usb_serial)).unwrap();

    // 3. Idle timer runs from boot, even if bring-up below fails
    spawner
        .spawn(power_task(&POWER, config.idle_timeout, Shutdown::new()))
        .unwrap();

    // 4. Edge sources
    let occupancy = ExtiInput::new(Input::new(p.PB4.degrade(), Pull::None), p.EXTI4.degrade());
    let vbus = ExtiInput::new(Input::new(p.PA9.degrade(), Pull::None), p.EXTI9.degrade());
    // pull-up only while awake; released before power off
    let charge = ExtiInput::new(Input::new(p.PB5.degrade(), Pull::Up), p.EXTI5.degrade());

    spawner.spawn(occupancy_edge_task(occupancy, &TRIGGER)).unwrap();
    spawner.spawn(power_edge_task(vbus, &TRIGGER)).unwrap();
    spawner.spawn(power_edge_task(charge, &TRIGGER)).unwrap();
    spawner.spawn(debounce_task(&TRIGGER, config.debounce)).unwrap();
    info!("Setup complete");

    // 5. Battery divider + BLE module (USART2 @ 115200, TX=PA2, RX=PA3)
    let adc = BatteryAdc::new(p.ADC1, p.PC0, p.PC1.degrade());

    let mut ble_config = UsartConfig::default();
    ble_config.baudrate = 115_200;
    let uart = match Uart::new(p.USART2, p.PA3, p.PA2, Irqs, p.DMA1_CH6, p.DMA1_CH5, ble_config) {
        Ok(uart) => uart,
        Err(_) => {
            error!("BLE UART config rejected, not serving");
            return;
        }
    };

    let mut worker = SamplingWorker::new(
        NodeLines::new(),
        adc,
        BleModule::new(uart),
        &LIPO_2000MAH,
        &TRIGGER,
        &POWER,
        config.advertising,
    );
    if let Err(e) = worker.start().await {
        error!("Radio bring-up failed: {}, not serving", e);
        return;
    }

    // 6. Sampling worker, plus one sample right away so the first broadcast is real
    spawner.spawn(sampling_task(worker)).unwrap();
    TRIGGER.request_now();
}
