//! Core of a battery-powered occupancy beacon.
//!
//! Edge events from the occupancy switch and the charger lines are turned into
//! sample requests ([`trigger`]), a single worker reads the inputs and encodes
//! them into a BTHome status frame ([`worker`], [`frame`]), and an idle timer
//! powers the node off when nothing happens ([`power`]).
//!
//! Everything here is hardware independent; the firmware binary supplies the
//! [`hal`] implementations.
#![cfg_attr(not(test), no_std)]

// must come first so the logging macros are visible to the other modules
mod fmt;

pub mod advertising;
pub mod battery;
pub mod config;
pub mod error;
pub mod frame;
pub mod hal;
pub mod power;
pub mod state;
pub mod trigger;
pub mod worker;

pub use config::{AdvertisingConfig, AdvertisingInterval, Config};
pub use error::{Error, Result};
pub use frame::StatusFrame;
pub use power::PowerManager;
pub use state::{PowerReading, PowerState, WakeEdge};
pub use trigger::SampleTrigger;
pub use worker::SamplingWorker;
