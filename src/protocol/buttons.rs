//! Button state and the bit tables that map report bytes to named buttons.
//!
//! Full (0x30) reports carry three button bytes: right-half, shared, and
//! left-half. SL/SR exist on both halves and are OR'd together.

use std::fmt;

use crate::device::DeviceKind;

// ---------------------------------------------------------------------------
// Full-report bit positions
// ---------------------------------------------------------------------------

// Right byte
pub const RIGHT_Y: u8 = 0x01;
pub const RIGHT_X: u8 = 0x02;
pub const RIGHT_B: u8 = 0x04;
pub const RIGHT_A: u8 = 0x08;
pub const RIGHT_SR: u8 = 0x10;
pub const RIGHT_SL: u8 = 0x20;
pub const RIGHT_R: u8 = 0x40;
pub const RIGHT_ZR: u8 = 0x80;

// Shared byte
pub const SHARED_MINUS: u8 = 0x01;
pub const SHARED_PLUS: u8 = 0x02;
pub const SHARED_RIGHT_STICK: u8 = 0x04;
pub const SHARED_LEFT_STICK: u8 = 0x08;
pub const SHARED_HOME: u8 = 0x10;
pub const SHARED_CAPTURE: u8 = 0x20;

// Left byte
pub const LEFT_DOWN: u8 = 0x01;
pub const LEFT_UP: u8 = 0x02;
pub const LEFT_RIGHT: u8 = 0x04;
pub const LEFT_LEFT: u8 = 0x08;
pub const LEFT_SR: u8 = 0x10;
pub const LEFT_SL: u8 = 0x20;
pub const LEFT_L: u8 = 0x40;
pub const LEFT_ZL: u8 = 0x80;

/// Hat value meaning "no direction" in minimal (0x3F) reports.
pub const HAT_NEUTRAL: u8 = 0x08;

/// Pressed/released state of every named button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ButtonSet {
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub l: bool,
    pub r: bool,
    pub zl: bool,
    pub zr: bool,
    pub plus: bool,
    pub minus: bool,
    pub home: bool,
    pub capture: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub left_stick: bool,
    pub right_stick: bool,
    pub sl: bool,
    pub sr: bool,
}

/// Accessor for one named button.
pub type ButtonAccessor = fn(&ButtonSet) -> bool;

/// Every button in fixed reporting order.
pub const BUTTONS: [(&str, ButtonAccessor); 20] = [
    ("a", |b: &ButtonSet| b.a),
    ("b", |b: &ButtonSet| b.b),
    ("x", |b: &ButtonSet| b.x),
    ("y", |b: &ButtonSet| b.y),
    ("l", |b: &ButtonSet| b.l),
    ("r", |b: &ButtonSet| b.r),
    ("zl", |b: &ButtonSet| b.zl),
    ("zr", |b: &ButtonSet| b.zr),
    ("plus", |b: &ButtonSet| b.plus),
    ("minus", |b: &ButtonSet| b.minus),
    ("home", |b: &ButtonSet| b.home),
    ("capture", |b: &ButtonSet| b.capture),
    ("up", |b: &ButtonSet| b.dpad_up),
    ("down", |b: &ButtonSet| b.dpad_down),
    ("left", |b: &ButtonSet| b.dpad_left),
    ("right", |b: &ButtonSet| b.dpad_right),
    ("lstick", |b: &ButtonSet| b.left_stick),
    ("rstick", |b: &ButtonSet| b.right_stick),
    ("sl", |b: &ButtonSet| b.sl),
    ("sr", |b: &ButtonSet| b.sr),
];

impl ButtonSet {
    /// Unpack the three button bytes of a full report.
    pub fn from_bytes(right: u8, shared: u8, left: u8) -> Self {
        Self {
            a: right & RIGHT_A != 0,
            b: right & RIGHT_B != 0,
            x: right & RIGHT_X != 0,
            y: right & RIGHT_Y != 0,
            r: right & RIGHT_R != 0,
            zr: right & RIGHT_ZR != 0,
            l: left & LEFT_L != 0,
            zl: left & LEFT_ZL != 0,
            plus: shared & SHARED_PLUS != 0,
            minus: shared & SHARED_MINUS != 0,
            home: shared & SHARED_HOME != 0,
            capture: shared & SHARED_CAPTURE != 0,
            left_stick: shared & SHARED_LEFT_STICK != 0,
            right_stick: shared & SHARED_RIGHT_STICK != 0,
            dpad_up: left & LEFT_UP != 0,
            dpad_down: left & LEFT_DOWN != 0,
            dpad_left: left & LEFT_LEFT != 0,
            dpad_right: left & LEFT_RIGHT != 0,
            sl: (right & RIGHT_SL != 0) || (left & LEFT_SL != 0),
            sr: (right & RIGHT_SR != 0) || (left & LEFT_SR != 0),
        }
    }

    /// Pack into `[right, shared, left]`. SL/SR are written to both halves.
    pub fn to_bytes(&self) -> [u8; 3] {
        let bit = |on: bool, mask: u8| if on { mask } else { 0 };
        let right = bit(self.y, RIGHT_Y)
            | bit(self.x, RIGHT_X)
            | bit(self.b, RIGHT_B)
            | bit(self.a, RIGHT_A)
            | bit(self.sr, RIGHT_SR)
            | bit(self.sl, RIGHT_SL)
            | bit(self.r, RIGHT_R)
            | bit(self.zr, RIGHT_ZR);
        let shared = bit(self.minus, SHARED_MINUS)
            | bit(self.plus, SHARED_PLUS)
            | bit(self.right_stick, SHARED_RIGHT_STICK)
            | bit(self.left_stick, SHARED_LEFT_STICK)
            | bit(self.home, SHARED_HOME)
            | bit(self.capture, SHARED_CAPTURE);
        let left = bit(self.dpad_down, LEFT_DOWN)
            | bit(self.dpad_up, LEFT_UP)
            | bit(self.dpad_right, LEFT_RIGHT)
            | bit(self.dpad_left, LEFT_LEFT)
            | bit(self.sr, LEFT_SR)
            | bit(self.sl, LEFT_SL)
            | bit(self.l, LEFT_L)
            | bit(self.zl, LEFT_ZL);
        [right, shared, left]
    }

    /// Decode the coarse button bytes and hat of a minimal (0x3F) report.
    ///
    /// Byte 1 layout depends on the device; byte 2 is shared between the
    /// Joy-Con halves. The hat runs clockwise from up (0) to up-left (7).
    /// Only the Pro Controller hat is a d-pad; on a single Joy-Con it is the
    /// stick direction and is ignored.
    pub fn from_minimal(kind: DeviceKind, side: u8, shared: u8, hat: u8) -> Self {
        let mut set = Self {
            minus: shared & 0x01 != 0,
            plus: shared & 0x02 != 0,
            left_stick: shared & 0x04 != 0,
            right_stick: shared & 0x08 != 0,
            home: shared & 0x10 != 0,
            capture: shared & 0x20 != 0,
            ..Self::default()
        };
        match kind {
            DeviceKind::JoyConRight => {
                set.a = side & 0x01 != 0;
                set.x = side & 0x02 != 0;
                set.b = side & 0x04 != 0;
                set.y = side & 0x08 != 0;
                set.sl = side & 0x10 != 0;
                set.sr = side & 0x20 != 0;
                set.r = shared & 0x40 != 0;
                set.zr = shared & 0x80 != 0;
            }
            DeviceKind::JoyConLeft => {
                set.dpad_left = side & 0x01 != 0;
                set.dpad_down = side & 0x02 != 0;
                set.dpad_up = side & 0x04 != 0;
                set.dpad_right = side & 0x08 != 0;
                set.sl = side & 0x10 != 0;
                set.sr = side & 0x20 != 0;
                set.l = shared & 0x40 != 0;
                set.zl = shared & 0x80 != 0;
            }
            DeviceKind::ProController => {
                set.b = side & 0x01 != 0;
                set.a = side & 0x02 != 0;
                set.y = side & 0x04 != 0;
                set.x = side & 0x08 != 0;
                set.l = side & 0x10 != 0;
                set.r = side & 0x20 != 0;
                set.zl = side & 0x40 != 0;
                set.zr = side & 0x80 != 0;
            }
        }
        if kind == DeviceKind::ProController {
            set.apply_hat(hat);
        }
        set
    }

    fn apply_hat(&mut self, hat: u8) {
        if hat >= HAT_NEUTRAL {
            return;
        }
        self.dpad_up |= matches!(hat, 7 | 0 | 1);
        self.dpad_right |= matches!(hat, 1..=3);
        self.dpad_down |= matches!(hat, 3..=5);
        self.dpad_left |= matches!(hat, 5..=7);
    }

    /// True if any of the named buttons is held.
    pub fn any<S: AsRef<str>>(&self, names: &[S]) -> bool {
        BUTTONS
            .iter()
            .any(|(name, pressed)| pressed(self) && names.iter().any(|n| n.as_ref() == *name))
    }

    /// Names of all held buttons, in [`BUTTONS`] order.
    pub fn pressed_names(&self) -> Vec<&'static str> {
        BUTTONS
            .iter()
            .filter(|(_, pressed)| pressed(self))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl fmt::Display for ButtonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.pressed_names();
        if names.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}
