//! Status frame broadcast as BTHome v2 service data.
//!
//! ```text
//! [0..2]  service uuid 0xFCD2, little endian
//! [2]     device information (unencrypted, irregular interval)
//! [3]     0x01 battery          [4]      percent
//! [5]     0x0C voltage          [6..8]   millivolts, little endian
//! [8]     0x16 battery charging [9]      0/1
//! [10]    0x23 occupancy        [11]     0/1
//! ```
//!
//! Offsets are fixed; passive listeners depend on them.

use crate::error::DecodeError;

pub const FRAME_LEN: usize = 12;
pub const SERVICE_UUID: u16 = 0xfcd2;
pub const DEVICE_INFO: u8 = 0x44;

pub mod object_id {
    pub const BATTERY: u8 = 0x01;
    pub const VOLTAGE: u8 = 0x0c;
    pub const CHARGING: u8 = 0x16;
    pub const OCCUPANCY: u8 = 0x23;
}

pub mod offset {
    pub const BATTERY_ID: usize = 3;
    pub const BATTERY_PCT: usize = 4;
    pub const VOLTAGE_ID: usize = 5;
    pub const VOLTAGE_LO: usize = 6;
    pub const VOLTAGE_HI: usize = 7;
    pub const CHARGING_ID: usize = 8;
    pub const CHARGING: usize = 9;
    pub const OCCUPANCY_ID: usize = 10;
    pub const OCCUPANCY: usize = 11;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFrame {
    pub battery_pct: u8,
    pub millivolts: u16,
    pub charging: bool,
    pub occupied: bool,
}

impl Default for StatusFrame {
    /// What the node broadcasts before its first sample.
    fn default() -> Self {
        Self {
            battery_pct: 100,
            millivolts: 0x0c02,
            charging: false,
            occupied: false,
        }
    }
}

impl StatusFrame {
    pub fn update(&mut self, occupied: bool, millivolts: u16, battery_pct: u8, charging: bool) {
        self.occupied = occupied;
        self.millivolts = millivolts;
        self.battery_pct = battery_pct.min(100);
        self.charging = charging;
    }

    pub fn serialize(&self) -> [u8; FRAME_LEN] {
        let uuid = SERVICE_UUID.to_le_bytes();
        let mv = self.millivolts.to_le_bytes();
        [
            uuid[0],
            uuid[1],
            DEVICE_INFO,
            object_id::BATTERY,
            self.battery_pct,
            object_id::VOLTAGE,
            mv[0],
            mv[1],
            object_id::CHARGING,
            self.charging as u8,
            object_id::OCCUPANCY,
            self.occupied as u8,
        ]
    }

    /// Parses a received service-data payload (without the AD length/type
    /// prefix) back into a frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: &[u8; FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| DecodeError::Length(bytes.len()))?;

        let uuid = u16::from_le_bytes([bytes[0], bytes[1]]);
        if uuid != SERVICE_UUID {
            return Err(DecodeError::ServiceUuid(uuid));
        }
        if bytes[2] != DEVICE_INFO {
            return Err(DecodeError::DeviceInfo(bytes[2]));
        }
        for (at, id) in [
            (offset::BATTERY_ID, object_id::BATTERY),
            (offset::VOLTAGE_ID, object_id::VOLTAGE),
            (offset::CHARGING_ID, object_id::CHARGING),
            (offset::OCCUPANCY_ID, object_id::OCCUPANCY),
        ] {
            if bytes[at] != id {
                return Err(DecodeError::ObjectId { offset: at, found: bytes[at] });
            }
        }

        Ok(Self {
            battery_pct: bytes[offset::BATTERY_PCT],
            millivolts: u16::from_le_bytes([bytes[offset::VOLTAGE_LO], bytes[offset::VOLTAGE_HI]]),
            charging: flag(bytes, offset::CHARGING)?,
            occupied: flag(bytes, offset::OCCUPANCY)?,
        })
    }
}

fn flag(bytes: &[u8; FRAME_LEN], at: usize) -> Result<bool, DecodeError> {
    match bytes[at] {
        0 => Ok(false),
        1 => Ok(true),
        found => Err(DecodeError::Flag { offset: at, found }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_defaults_match_the_deployed_payload() {
        assert_eq!(
            StatusFrame::default().serialize(),
            [0xd2, 0xfc, 0x44, 0x01, 0x64, 0x0c, 0x02, 0x0c, 0x16, 0x00, 0x23, 0x00]
        );
    }

    #[test]
    fn fields_land_at_fixed_offsets() {
        let mut frame = StatusFrame::default();
        frame.update(true, 3700, 82, false);
        let bytes = frame.serialize();
        assert_eq!(&bytes[..4], &[0xd2, 0xfc, 0x44, 0x01]);
        assert_eq!(bytes[offset::BATTERY_PCT], 82);
        assert_eq!(bytes[offset::VOLTAGE_LO], 0x74);
        assert_eq!(bytes[offset::VOLTAGE_HI], 0x0e);
        assert_eq!(bytes[offset::CHARGING], 0);
        assert_eq!(bytes[offset::OCCUPANCY], 1);
    }

    #[test]
    fn low_byte_precedes_high_byte() {
        let mut frame = StatusFrame::default();
        frame.update(false, 0x0e8c, 50, true);
        let bytes = frame.serialize();
        assert_eq!(&bytes[offset::VOLTAGE_LO..=offset::VOLTAGE_HI], &[0x8c, 0x0e]);
        assert_eq!(bytes[offset::CHARGING], 1);
    }

    #[test]
    fn update_is_idempotent_and_keeps_the_header() {
        let mut frame = StatusFrame::default();
        frame.update(true, 3612, 17, true);
        let first = frame.serialize();
        frame.update(true, 3612, 17, true);
        let second = frame.serialize();
        assert_eq!(first, second);
        assert_eq!(&second[..3], &[0xd2, 0xfc, DEVICE_INFO]);
        for (at, id) in [(3, 0x01), (5, 0x0c), (8, 0x16), (10, 0x23)] {
            assert_eq!(second[at], id);
        }
    }

    #[test]
    fn percentage_is_capped() {
        let mut frame = StatusFrame::default();
        frame.update(false, 4200, 250, false);
        assert_eq!(frame.serialize()[offset::BATTERY_PCT], 100);
    }

    #[test]
    fn decode_recovers_the_fields() {
        let mut frame = StatusFrame::default();
        frame.update(true, 3480, 5, true);
        assert_eq!(StatusFrame::decode(&frame.serialize()), Ok(frame));
    }

    #[test]
    fn decode_rejects_foreign_payloads() {
        let good = StatusFrame::default().serialize();

        assert_eq!(StatusFrame::decode(&good[..11]), Err(DecodeError::Length(11)));

        let mut other_uuid = good;
        other_uuid[0] = 0x1a;
        other_uuid[1] = 0x18;
        assert_eq!(StatusFrame::decode(&other_uuid), Err(DecodeError::ServiceUuid(0x181a)));

        let mut encrypted = good;
        encrypted[2] = 0x45;
        assert_eq!(StatusFrame::decode(&encrypted), Err(DecodeError::DeviceInfo(0x45)));

        let mut reordered = good;
        reordered[offset::CHARGING_ID] = 0x2d;
        assert_eq!(
            StatusFrame::decode(&reordered),
            Err(DecodeError::ObjectId { offset: 8, found: 0x2d })
        );

        let mut bad_flag = good;
        bad_flag[offset::OCCUPANCY] = 2;
        assert_eq!(
            StatusFrame::decode(&bad_flag),
            Err(DecodeError::Flag { offset: 11, found: 2 })
        );
    }
}
