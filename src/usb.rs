//! USB CDC-ACM status console.
//!
//! Tasks write whole lines into [`CONSOLE`]; `console_task` forwards them to
//! the host while a terminal is attached and drops them otherwise, so the pipe
//! always drains.

use core::mem::MaybeUninit;

use embassy_futures::select::select;
use embassy_stm32::usb_otg::{self, Driver};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config, UsbDevice};

bind_interrupts!(pub struct Irqs {
    OTG_FS => usb_otg::InterruptHandler<peripherals::USB_OTG_FS>;
});

pub type UsbDriver = Driver<'static, peripherals::USB_OTG_FS>;
pub type UsbSerial<'a> = CdcAcmClass<'a, UsbDriver>;

const PACKET_SIZE: usize = 64;

static CONSOLE: Pipe<CriticalSectionRawMutex, 512> = Pipe::new();
static SUSPEND: Signal<CriticalSectionRawMutex, ()> = Signal::new();

pub struct UsbResources<'a> {
    config_desc: [u8; 256],
    bos_desc: [u8; 256],
    control_buf: [u8; 64],
    state: MaybeUninit<State<'a>>,
    ep_out_buffer: [u8; 256],
}

impl<'a> UsbResources<'a> {
    pub const fn new() -> Self {
        Self {
            config_desc: [0; 256],
            bos_desc: [0; 256],
            control_buf: [0; 64],
            state: MaybeUninit::uninit(),
            ep_out_buffer: [0; 256],
        }
    }
}

// Handed out once by `init`.
static mut USB_RES: UsbResources<'static> = UsbResources::new();

/// Queues a line for the console. Drops it if the pipe is full.
pub fn write_line(line: &str) {
    if CONSOLE.free_capacity() < line.len() + 2 {
        return;
    }
    let _ = CONSOLE.try_write(line.as_bytes());
    let _ = CONSOLE.try_write(b"\r\n");
}

/// Waits until every queued line has left the pipe.
pub async fn drain() {
    while !CONSOLE.is_empty() {
        Timer::after(Duration::from_millis(20)).await;
    }
}

/// Detaches from the bus; used right before power off.
pub fn suspend() {
    SUSPEND.signal(());
}

#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    select(device.run(), SUSPEND.wait()).await;
    device.disable().await;
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}

#[embassy_executor::task]
pub async fn console_task(mut serial: UsbSerial<'static>) -> ! {
    let mut buf = [0u8; PACKET_SIZE];
    loop {
        let n = CONSOLE.read(&mut buf).await;
        if serial.dtr() {
            let _ = serial.write_packet(&buf[..n]).await;
        }
    }
}

pub fn init(
    usb_periph: peripherals::USB_OTG_FS,
    pa12: peripherals::PA12,
    pa11: peripherals::PA11,
) -> (UsbDevice<'static, UsbDriver>, UsbSerial<'static>) {
    // SAFETY: `init` runs once from main, nothing else touches USB_RES.
    let driver_buf = unsafe { &mut *(&raw mut USB_RES.ep_out_buffer) };
    let mut usb_config = embassy_stm32::usb_otg::Config::default();
    usb_config.vbus_detection = false;
    let driver = Driver::new_fs(usb_periph, Irqs, pa12, pa11, driver_buf, usb_config);

    let mut config = Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("Occupancy Beacon");
    config.product = Some("Occupancy sensor console");
    config.serial_number = Some("00000001");

    let res = unsafe { &mut *(&raw mut USB_RES) };
    let mut builder = Builder::new(
        driver,
        config,
        &mut res.config_desc,
        &mut res.bos_desc,
        &mut [], // msos_descs
        &mut res.control_buf,
    );

    let state = res.state.write(State::new());
    let class = CdcAcmClass::new(&mut builder, state, PACKET_SIZE as u16);
    let usb = builder.build();

    (usb, class)
}
