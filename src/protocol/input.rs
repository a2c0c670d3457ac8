//! Input reports (device → host).
//!
//! Full report layout (0x30, 49 bytes including the tag):
//!
//! ```text
//! 0      tag (0x30)
//! 1      timer
//! 2      battery / connection info
//! 3..6   buttons: right, shared, left
//! 6..9   left stick  (2 x UINT12)
//! 9..12  right stick (2 x UINT12)
//! 12     vibrator input report
//! 13..25 IMU sample 0: accel x/y/z, gyro x/y/z (INT16 LE)
//! 25..49 IMU samples 1 and 2 (not used)
//! ```
//!
//! Minimal report layout (0x3F): `[tag, side buttons, shared buttons, hat, ...]`.

use std::f64::consts::PI;

use crate::codec;
use crate::device::DeviceKind;
use crate::error::{ProtocolError, Result};
use crate::protocol::buttons::ButtonSet;
use crate::protocol::{TAG_FULL, TAG_MINIMAL};
use crate::vector::{Vec2, Vec3};

/// Accelerometer sensitivity at the ±8 G range (G per LSB).
pub const ACCEL_LSB_G: f64 = 0.000244;
/// Gyroscope sensitivity at the ±2000 dps range (degrees/s per LSB).
pub const GYRO_LSB_DPS: f64 = 0.06103;
/// Gyroscope sensitivity in rad/s per LSB.
pub const GYRO_LSB_RAD: f64 = GYRO_LSB_DPS * PI / 180.0;

/// Bytes needed to decode a full report (tag through the first IMU sample).
pub const FULL_REPORT_MIN_LEN: usize = 25;
/// Length of a full report as sent by the device.
pub const FULL_REPORT_LEN: usize = 49;
/// Bytes needed to decode a minimal report.
pub const MINIMAL_REPORT_MIN_LEN: usize = 4;

const OFFSET_BUTTONS: usize = 3;
const OFFSET_ACCEL: usize = 13;
const OFFSET_GYRO: usize = 19;

/// One normalized sample of motion and button state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionFrame {
    /// Acceleration (G)
    pub accel: Vec3,
    /// Angular velocity (rad/s)
    pub gyro: Vec3,
    /// Primary analog stick, each axis in `[-1, 1]`
    pub stick: Vec2,
    pub buttons: ButtonSet,
}

/// Decode a full (0x30) report. `report[0]` must be the tag.
pub fn decode_full(report: &[u8], kind: DeviceKind) -> Result<MotionFrame> {
    if report.len() < FULL_REPORT_MIN_LEN {
        return Err(ProtocolError::report_too_short(TAG_FULL, FULL_REPORT_MIN_LEN, report.len()));
    }

    let buttons = ButtonSet::from_bytes(
        report[OFFSET_BUTTONS],
        report[OFFSET_BUTTONS + 1],
        report[OFFSET_BUTTONS + 2],
    );

    let (h, v) = codec::read_uint12_pair(report, kind.stick_offset())?;
    let stick = Vec2::new(codec::normalize_axis(h), codec::normalize_axis(v));

    let accel = read_vec3(report, OFFSET_ACCEL, ACCEL_LSB_G)?;
    let gyro = read_vec3(report, OFFSET_GYRO, GYRO_LSB_RAD)?;

    Ok(MotionFrame { accel, gyro, stick, buttons })
}

/// Build a full (0x30) report carrying `frame`.
///
/// The unused stick group is centered and the IMU sample is repeated in all
/// three slots.
pub fn encode_full(frame: &MotionFrame, kind: DeviceKind) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FULL_REPORT_LEN);
    buf.push(TAG_FULL);
    buf.push(0x00); // timer
    buf.push(0x8E); // battery full, Joy-Con powered
    buf.extend_from_slice(&frame.buttons.to_bytes());

    let stick = (
        codec::denormalize_axis(frame.stick.x),
        codec::denormalize_axis(frame.stick.y),
    );
    let center = codec::denormalize_axis(0.0);
    for offset in [crate::device::LEFT_STICK_OFFSET, crate::device::RIGHT_STICK_OFFSET] {
        if offset == kind.stick_offset() {
            codec::write_uint12_pair(&mut buf, stick.0, stick.1);
        } else {
            codec::write_uint12_pair(&mut buf, center, center);
        }
    }
    buf.push(0x00); // vibrator

    for _ in 0..3 {
        write_vec3(&mut buf, frame.accel, ACCEL_LSB_G);
        write_vec3(&mut buf, frame.gyro, GYRO_LSB_RAD);
    }
    buf
}

/// Decode a minimal (0x3F) report. IMU and stick are zero-filled.
///
/// On a single Joy-Con the hat byte is the stick direction, which is not
/// carried into the frame; only the Pro Controller hat maps to the d-pad.
pub fn decode_minimal(report: &[u8], kind: DeviceKind) -> Result<MotionFrame> {
    if report.len() < MINIMAL_REPORT_MIN_LEN {
        return Err(ProtocolError::report_too_short(
            TAG_MINIMAL,
            MINIMAL_REPORT_MIN_LEN,
            report.len(),
        ));
    }
    Ok(MotionFrame {
        buttons: ButtonSet::from_minimal(kind, report[1], report[2], report[3]),
        ..MotionFrame::default()
    })
}

fn read_vec3(report: &[u8], offset: usize, lsb: f64) -> Result<Vec3> {
    Ok(Vec3::new(
        codec::read_int16_scaled(report, offset, lsb)?,
        codec::read_int16_scaled(report, offset + 2, lsb)?,
        codec::read_int16_scaled(report, offset + 4, lsb)?,
    ))
}

fn write_vec3(buf: &mut Vec<u8>, v: Vec3, lsb: f64) {
    codec::write_int16_scaled(buf, v.x, lsb);
    codec::write_int16_scaled(buf, v.y, lsb);
    codec::write_int16_scaled(buf, v.z, lsb);
}
