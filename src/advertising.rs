//! Legacy advertising payload: flags, local name and the status frame as
//! 16-bit UUID service data.

use heapless::Vec;

use crate::frame::FRAME_LEN;

pub const MAX_ADV_LEN: usize = 31;

pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const NAME_SHORTENED: u8 = 0x08;
    pub const NAME_COMPLETE: u8 = 0x09;
    pub const SERVICE_DATA_16: u8 = 0x16;
}

/// LE general discoverable, BR/EDR not supported.
pub const FLAGS_GENERAL_NO_BREDR: u8 = 0x06;

const FLAGS_LEN: usize = 3;
const SERVICE_DATA_LEN: usize = 2 + FRAME_LEN;
const NAME_ROOM: usize = MAX_ADV_LEN - FLAGS_LEN - SERVICE_DATA_LEN - 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingData {
    bytes: Vec<u8, MAX_ADV_LEN>,
}

impl AdvertisingData {
    /// Names that do not fit are truncated and sent as a shortened name.
    pub fn build(name: &str, frame: &[u8; FRAME_LEN]) -> Self {
        let mut bytes = Vec::new();
        push_all(&mut bytes, &[2, ad_type::FLAGS, FLAGS_GENERAL_NO_BREDR]);

        let name = name.as_bytes();
        if !name.is_empty() {
            let (kind, name) = if name.len() > NAME_ROOM {
                (ad_type::NAME_SHORTENED, &name[..NAME_ROOM])
            } else {
                (ad_type::NAME_COMPLETE, name)
            };
            push_all(&mut bytes, &[name.len() as u8 + 1, kind]);
            push_all(&mut bytes, name);
        }

        push_all(&mut bytes, &[FRAME_LEN as u8 + 1, ad_type::SERVICE_DATA_16]);
        push_all(&mut bytes, frame);

        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The status frame inside the service data AD structure.
    pub fn service_data(&self) -> Option<&[u8]> {
        let mut rest = self.as_bytes();
        while let [len, kind, ..] = rest {
            let end = 1 + *len as usize;
            if end > rest.len() || *len == 0 {
                return None;
            }
            if *kind == ad_type::SERVICE_DATA_16 {
                return Some(&rest[2..end]);
            }
            rest = &rest[end..];
        }
        None
    }
}

// Callers size everything against MAX_ADV_LEN up front.
fn push_all(bytes: &mut Vec<u8, MAX_ADV_LEN>, data: &[u8]) {
    for &b in data {
        let _ = bytes.push(b);
    }
}
