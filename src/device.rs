use std::fmt;

/// Nintendo USB/Bluetooth vendor ID.
pub const VENDOR_ID: u16 = 0x057E;

pub const PRODUCT_JOYCON_LEFT: u16 = 0x2006;
pub const PRODUCT_JOYCON_RIGHT: u16 = 0x2007;
pub const PRODUCT_PRO_CONTROLLER: u16 = 0x2009;

/// Product IDs accepted at connect time.
pub const PRODUCT_ALLOW_LIST: [u16; 3] =
    [PRODUCT_JOYCON_LEFT, PRODUCT_JOYCON_RIGHT, PRODUCT_PRO_CONTROLLER];

/// Byte offset (within a full 0x30 report) of the left stick group.
pub const LEFT_STICK_OFFSET: usize = 6;
/// Byte offset (within a full 0x30 report) of the right stick group.
pub const RIGHT_STICK_OFFSET: usize = 9;

/// Vendor/product identity reported by a HID transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Which physical controller connected. Resolved once at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    JoyConLeft,
    JoyConRight,
    ProController,
}

impl DeviceKind {
    /// Identify an allow-listed device. Returns `None` for anything else.
    pub fn from_info(info: DeviceInfo) -> Option<Self> {
        if info.vendor_id != VENDOR_ID {
            return None;
        }
        match info.product_id {
            PRODUCT_JOYCON_LEFT => Some(Self::JoyConLeft),
            PRODUCT_JOYCON_RIGHT => Some(Self::JoyConRight),
            PRODUCT_PRO_CONTROLLER => Some(Self::ProController),
            _ => None,
        }
    }

    pub fn product_id(self) -> u16 {
        match self {
            Self::JoyConLeft => PRODUCT_JOYCON_LEFT,
            Self::JoyConRight => PRODUCT_JOYCON_RIGHT,
            Self::ProController => PRODUCT_PRO_CONTROLLER,
        }
    }

    /// Offset of the 3-byte stick group this device's primary stick lives in.
    pub fn stick_offset(self) -> usize {
        match self {
            Self::JoyConRight => RIGHT_STICK_OFFSET,
            Self::JoyConLeft | Self::ProController => LEFT_STICK_OFFSET,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JoyConLeft => write!(f, "Joy-Con (L)"),
            Self::JoyConRight => write!(f, "Joy-Con (R)"),
            Self::ProController => write!(f, "Pro Controller"),
        }
    }
}
