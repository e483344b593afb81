use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::Config;

// ── Pin map ───────────────────────────────────────────────────────────────────
//  PB4  occupancy reed switch      EXTI4, external pull
//  PB5  charger STAT (active low)  EXTI5, internal pull-up while awake
//  PA9  VBUS detect                EXTI9
//  PC0  battery divider            ADC1_IN10
//  PC1  divider enable             push-pull, high = divider powered
//  PA2  BLE module RX              USART2_TX
//  PA3  BLE module TX              USART2_RX
//  PA11/PA12                       USB FS console

#[allow(dead_code)]
pub const NAME: &str = "occupancy-f405";

#[allow(dead_code)]
pub const OCCUPANCY_PIN: usize = 4;
#[allow(dead_code)]
pub const CHARGE_STATUS_PIN: usize = 5;
#[allow(dead_code)]
pub const VBUS_PIN: usize = 9;

pub struct Board {
    pub p: embassy_stm32::Peripherals,
}

impl Board {
    pub fn init() -> Self {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        // 48 MHz core keeps the run current down; Q still yields 48 MHz for USB
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV8,
            mul: PllMul::MUL192,
            divp: Some(PllPDiv::DIV4), // 48 MHz
            divq: Some(PllQDiv::DIV4), // 48 MHz USB
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV2;
        config.rcc.apb2_pre = APBPrescaler::DIV1;

        let p = embassy_stm32::init(config);

        Self { p }
    }
}
