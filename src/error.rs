use core::fmt;

/// Peripheral that failed to come up at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Gpio,
    Adc,
    Radio,
}

/// Step of a battery read that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplingStage {
    Enable,
    Read,
    Disable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Fatal at startup: the node does not start serving.
    HardwareInit(Peripheral),
    /// The current iteration is skipped, the next trigger retries.
    Sampling(SamplingStage),
    /// The radio refused the new payload. Not retried until the next sample.
    BroadcastUpdate,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HardwareInit(p) => write!(f, "hardware init failed: {:?}", p),
            Error::Sampling(stage) => write!(f, "voltage sampling failed at {:?}", stage),
            Error::BroadcastUpdate => f.write_str("failed to update advertising data"),
        }
    }
}

/// Why a received service-data payload is not one of our status frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    Length(usize),
    ServiceUuid(u16),
    DeviceInfo(u8),
    ObjectId { offset: usize, found: u8 },
    Flag { offset: usize, found: u8 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Length(len) => write!(f, "expected 12 bytes, got {}", len),
            DecodeError::ServiceUuid(uuid) => write!(f, "unexpected service uuid {:#06x}", uuid),
            DecodeError::DeviceInfo(b) => write!(f, "unexpected device info byte {:#04x}", b),
            DecodeError::ObjectId { offset, found } => {
                write!(f, "unexpected object id {:#04x} at offset {}", found, offset)
            }
            DecodeError::Flag { offset, found } => {
                write!(f, "flag at offset {} is {}, expected 0 or 1", offset, found)
            }
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
