//! Field codecs for Joy-Con HID reports.
//!
//! IMU samples are little-endian two's complement 16-bit integers. Analog
//! sticks pack two unsigned 12-bit axes into three bytes:
//!
//! ```text
//! byte0 = h[7:0]
//! byte1 = v[3:0] << 4 | h[11:8]
//! byte2 = v[11:4]
//! ```

use crate::error::{ProtocolError, Result};

/// Largest value of a 12-bit stick axis.
pub const UINT12_MAX: u16 = 0x0FFF;

// ---------------------------------------------------------------------------
// Read helpers
// ---------------------------------------------------------------------------

/// Read a little-endian signed 16-bit integer.
pub fn read_int16(data: &[u8], offset: usize) -> Result<i16> {
    check_len(data, offset, 2, "INT16")?;
    Ok(i16::from_le_bytes([data[offset], data[offset + 1]]))
}

/// Read INT16 and multiply by a per-LSB factor.
pub fn read_int16_scaled(data: &[u8], offset: usize, lsb: f64) -> Result<f64> {
    Ok(f64::from(read_int16(data, offset)?) * lsb)
}

/// Read two nibble-interleaved 12-bit values from three bytes.
///
/// Returns `(horizontal, vertical)`.
pub fn read_uint12_pair(data: &[u8], offset: usize) -> Result<(u16, u16)> {
    check_len(data, offset, 3, "UINT12x2")?;
    let b0 = u16::from(data[offset]);
    let b1 = u16::from(data[offset + 1]);
    let b2 = u16::from(data[offset + 2]);
    let h = b0 | ((b1 & 0x0F) << 8);
    let v = (b1 >> 4) | (b2 << 4);
    Ok((h, v))
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

/// Write a little-endian signed 16-bit integer.
pub fn write_int16(buf: &mut Vec<u8>, val: i16) {
    buf.extend_from_slice(&val.to_le_bytes());
}

/// Divide by a per-LSB factor, round, and write as INT16 (saturating).
pub fn write_int16_scaled(buf: &mut Vec<u8>, value: f64, lsb: f64) {
    let raw = (value / lsb).round().clamp(f64::from(i16::MIN), f64::from(i16::MAX));
    write_int16(buf, raw as i16);
}

/// Pack two 12-bit values into three bytes. Bits above 12 are dropped.
pub fn write_uint12_pair(buf: &mut Vec<u8>, h: u16, v: u16) {
    let h = h & UINT12_MAX;
    let v = v & UINT12_MAX;
    buf.push((h & 0xFF) as u8);
    buf.push((((v & 0x0F) << 4) | (h >> 8)) as u8);
    buf.push((v >> 4) as u8);
}

// ---------------------------------------------------------------------------
// Stick normalization
// ---------------------------------------------------------------------------

/// Map a raw 12-bit axis centered on 2048 to `[-1.0, 1.0]`.
pub fn normalize_axis(raw: u16) -> f64 {
    let center = f64::from(UINT12_MAX + 1) / 2.0;
    ((f64::from(raw) - center) / center).clamp(-1.0, 1.0)
}

/// Inverse of [`normalize_axis`].
pub fn denormalize_axis(value: f64) -> u16 {
    let center = f64::from(UINT12_MAX + 1) / 2.0;
    (value.clamp(-1.0, 1.0) * center + center)
        .round()
        .clamp(0.0, f64::from(UINT12_MAX)) as u16
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn check_len(data: &[u8], offset: usize, need: usize, field: &'static str) -> Result<()> {
    if data.len() < offset + need {
        Err(ProtocolError::FieldOutOfBounds { field, need: offset + need, got: data.len() })
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
