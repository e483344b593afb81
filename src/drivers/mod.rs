pub mod battery_adc;
pub mod ble_module;
pub mod lines;
