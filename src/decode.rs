use crate::error::DecodeError;

/// Bit 0 of the flags byte: heart-rate value field is u16 when set, u8 when
/// clear (Heart Rate Measurement characteristic, Bluetooth GATT spec).
const FLAG_HR_16BIT: u8 = 0x01;

/// One decoded heart-rate reading. Immutable; superseded by the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeasurementReading {
    pub bpm: u8,
    pub sequence: u64,
}

/// Decode one heart-rate measurement notification payload.
///
/// Byte 0 is the flags field; the value follows as u8, or little-endian u16
/// when the width flag is set. Values above 255 saturate. Never panics;
/// malformed input comes back as a `DecodeError`.
pub fn decode(payload: &[u8], sequence: u64) -> Result<MeasurementReading, DecodeError> {
    let (&flags, value) = payload
        .split_first()
        .ok_or(DecodeError::TooShort(payload.len()))?;

    let bpm = if flags & FLAG_HR_16BIT != 0 {
        match value {
            [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]).min(u8::MAX as u16) as u8,
            _ => return Err(DecodeError::TooShort(payload.len())),
        }
    } else {
        match value {
            [bpm, ..] => *bpm,
            [] => return Err(DecodeError::TooShort(payload.len())),
        }
    };

    Ok(MeasurementReading { bpm, sequence })
}
