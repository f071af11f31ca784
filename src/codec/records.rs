//! Binary layout of one record asset.
//!
//! ```text
//! magic "WLRB" | count: u32 LE | count * (timestamp: i64 LE, x, y, z: f64 LE)
//! ```

use crate::core::Record;
use crate::error::DecodeError;

pub const MAGIC: [u8; 4] = *b"WLRB";
pub const HEADER_LEN: usize = 8;
pub const RECORD_LEN: usize = 32;

pub fn encode_records(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + records.len() * RECORD_LEN);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for record in records {
        out.extend_from_slice(&record.timestamp.to_le_bytes());
        out.extend_from_slice(&record.x.to_le_bytes());
        out.extend_from_slice(&record.y.to_le_bytes());
        out.extend_from_slice(&record.z.to_le_bytes());
    }
    out
}

pub fn decode_records(bytes: &[u8]) -> Result<Vec<Record>, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::Truncated {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let magic = read_array::<4>(bytes, 0);
    if magic != MAGIC {
        return Err(DecodeError::BadMagic(magic));
    }

    let count = u32::from_le_bytes(read_array::<4>(bytes, 4)) as usize;
    let expected = count.saturating_mul(RECORD_LEN).saturating_add(HEADER_LEN);
    if bytes.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(DecodeError::TrailingBytes(bytes.len() - expected));
    }

    let records = bytes[HEADER_LEN..]
        .chunks_exact(RECORD_LEN)
        .map(|chunk| Record {
            timestamp: i64::from_le_bytes(read_array::<8>(chunk, 0)),
            x: f64::from_le_bytes(read_array::<8>(chunk, 8)),
            y: f64::from_le_bytes(read_array::<8>(chunk, 16)),
            z: f64::from_le_bytes(read_array::<8>(chunk, 24)),
        })
        .collect();

    Ok(records)
}

// Callers check bounds first.
fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}
