use std::fmt::{Display, Formatter};

use crate::utils::SliceExt;

// ([Vol 3] Part B, Section 2.5.1).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Uuid(u128);

impl Uuid {
    const BASE: u128 = 0x00000000_0000_1000_8000_00805F9B34FB;

    #[inline]
    pub const fn from_u16(value: u16) -> Self {
        Self::from_u32(value as u32)
    }

    #[inline]
    pub const fn from_u32(value: u32) -> Self {
        Self(((value as u128) << 96) | Self::BASE)
    }

    #[inline]
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    #[inline]
    fn remove_base(self) -> Option<u32> {
        ((self.0 & ((1u128 << 96) - 1)) == Self::BASE)
            .then_some((self.0 >> 96) as u32)
    }

    #[inline]
    pub fn as_packed(self) -> PackedUuid {
        match self.remove_base() {
            None => PackedUuid::Uuid128(self.0),
            Some(uuid32) => match u16::try_from(uuid32) {
                Ok(uuid16) => PackedUuid::Uuid16(uuid16),
                Err(_) => PackedUuid::Uuid32(uuid32)
            }
        }
    }

    #[inline]
    pub fn as_u16(self) -> Option<u16> {
        match self.as_packed() {
            PackedUuid::Uuid16(value) => Some(value),
            _ => None
        }
    }
}

/// A UUID at the width it travels on the wire.
///
/// On-wire UUIDs are little endian, the reverse of the big-endian hex form
/// users read. The reversal happens in [`PackedUuid::from_le_slice`] and
/// nowhere else; `Uuid` and `PackedUuid` always hold canonical values.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PackedUuid {
    Uuid16(u16),
    Uuid32(u32),
    Uuid128(u128)
}

impl PackedUuid {

    #[inline]
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Uuid16(_) => 2,
            Self::Uuid32(_) => 4,
            Self::Uuid128(_) => 16
        }
    }

    /// Reads a little-endian on-wire UUID. The slice length selects the width.
    pub fn from_le_slice(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            2 => bytes.get_chunk(0).copied().map(u16::from_le_bytes).map(Self::Uuid16),
            4 => bytes.get_chunk(0).copied().map(u32::from_le_bytes).map(Self::Uuid32),
            16 => bytes.get_chunk(0).copied().map(u128::from_le_bytes).map(Self::Uuid128),
            _ => None
        }
    }
}

impl From<PackedUuid> for Uuid {
    #[inline]
    fn from(value: PackedUuid) -> Self {
        match value {
            PackedUuid::Uuid16(uuid16) => Self::from_u16(uuid16),
            PackedUuid::Uuid32(uuid32) => Self::from_u32(uuid32),
            PackedUuid::Uuid128(uuid128) => Self::from_u128(uuid128)
        }
    }
}

impl From<u16> for Uuid {
    #[inline]
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl From<u32> for Uuid {
    #[inline]
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl From<u128> for Uuid {
    #[inline]
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl Display for Uuid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:04X}-{:012X}",
            (self.0 >> 96) as u32,
            (self.0 >> 80) as u16,
            (self.0 >> 64) as u16,
            (self.0 >> 48) as u16,
            (self.0 & ((1 << 48) - 1)) as u64
        )
    }
}

impl Display for PackedUuid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Uuid16(value) => write!(f, "{:04x}", value),
            Self::Uuid32(value) => write!(f, "{:08x}", value),
            Self::Uuid128(value) => write!(f, "{:032x}", value)
        }
    }
}
