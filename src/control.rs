//! Access logic for the remote's two GATT characteristics.
//!
//! The radio side (advertising, connections) hands every characteristic read
//! or write to [`access`]; payload checks and the mapping to [`Remote`]
//! happen here.

use crate::remote::{Remote, Trigger};
use crate::settings::SettingsStore;
use core::fmt;
use log::*;

pub const DEVICE_NAME: &str = "nikon-ir-remote";

// 128-bit UUIDs, little-endian as they go over the air
pub const SERVICE_UUID: [u8; 16] = uuid(0x00);
pub const ENABLED_UUID: [u8; 16] = uuid(0x01);
pub const DELAY_MS_UUID: [u8; 16] = uuid(0x02);

const fn uuid(last: u8) -> [u8; 16] {
    [
        0xFF, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA, 0x99, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11,
        last,
    ]
}

/// Largest characteristic value.
pub const MAX_VALUE_LEN: usize = 2;

pub type Value = heapless::Vec<u8, MAX_VALUE_LEN>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Characteristic {
    Enabled,
    DelayMs,
}

impl Characteristic {
    pub const ALL: [Characteristic; 2] = [Characteristic::Enabled, Characteristic::DelayMs];

    pub fn uuid(self) -> [u8; 16] {
        match self {
            Self::Enabled => ENABLED_UUID,
            Self::DelayMs => DELAY_MS_UUID,
        }
    }

    /// Payload length a write must have. Reads of both are 16 bit.
    pub fn write_len(self) -> usize {
        match self {
            Self::Enabled => 1,
            Self::DelayMs => 2,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub enum Access<'a> {
    Read,
    Write(&'a [u8]),
}

/// ATT protocol errors returned to the client.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum AttError {
    InvalidAttrValueLen = 0x0d,
    Unlikely = 0x0e,
    InsufficientResources = 0x11,
}

impl AttError {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for AttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAttrValueLen => write!(f, "Invalid attribute value length"),
            Self::Unlikely => write!(f, "Unlikely error"),
            Self::InsufficientResources => write!(f, "Insufficient resources"),
        }
    }
}

/// Serves one read or write. Reads return the value, writes an empty one.
pub fn access<T, S>(
    remote: &Remote<T, S>,
    characteristic: Characteristic,
    op: Access<'_>,
) -> Result<Value, AttError>
where
    T: Trigger,
    S: SettingsStore,
{
    match op {
        Access::Read => read(remote, characteristic),
        Access::Write(payload) => {
            write(remote, characteristic, payload)?;
            Ok(Value::new())
        }
    }
}

fn read<T, S>(remote: &Remote<T, S>, characteristic: Characteristic) -> Result<Value, AttError>
where
    T: Trigger,
    S: SettingsStore,
{
    let raw = match characteristic {
        Characteristic::Enabled => u16::from(remote.enabled()),
        Characteristic::DelayMs => remote.delay_ms(),
    };
    debug!("read {characteristic:?}: {raw}");

    let mut value = Value::new();
    value
        .extend_from_slice(&raw.to_le_bytes())
        .map_err(|_| AttError::InsufficientResources)?;
    Ok(value)
}

fn write<T, S>(
    remote: &Remote<T, S>,
    characteristic: Characteristic,
    payload: &[u8],
) -> Result<(), AttError>
where
    T: Trigger,
    S: SettingsStore,
{
    if payload.len() != characteristic.write_len() {
        error!(
            "{characteristic:?}: invalid length {}, expected {}",
            payload.len(),
            characteristic.write_len()
        );
        return Err(AttError::InvalidAttrValueLen);
    }

    let applied = match characteristic {
        Characteristic::Enabled => remote.set_enabled(payload[0] != 0),
        Characteristic::DelayMs => remote.set_delay_ms(u16::from_le_bytes([payload[0], payload[1]])),
    };

    applied.map_err(|e| {
        error!("{characteristic:?}: write failed: {e:?}");
        AttError::Unlikely
    })
}
