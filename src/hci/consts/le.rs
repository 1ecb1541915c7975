use std::fmt::{Debug, Display, Formatter};

use bitflags::bitflags;
use enum_iterator::Sequence;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Address kind carried in advertising reports and peer address fields
/// ([Vol 4] Part E, Section 7.8.5).
#[derive(Debug, Copy, Clone, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AddressKind {
    Public = 0x00,
    Random = 0x01,
    PublicIdentity = 0x02,
    RandomIdentity = 0x03,
    /// No address provided (anonymous advertisement).
    Anonymous = 0xFF,
}

/// Source of the address the controller puts into our own packets.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum OwnAddressKind {
    #[default]
    Public = 0x00,
    Random = 0x01,
    ResolvableOrPublic = 0x02,
    ResolvableOrRandom = 0x03,
}

bitflags! {
    /// Advertising event properties ([Vol 4] Part E, Section 7.8.53).
    #[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
    pub struct AdvertisingEventProps: u16 {
        const CONNECTABLE = 1 << 0;
        const SCANNABLE = 1 << 1;
        const DIRECTED = 1 << 2;
        const HIGH_DUTY_CYCLE = 1 << 3;
        const LEGACY = 1 << 4;
        const ANONYMOUS = 1 << 5;
        const INCLUDE_TX_POWER = 1 << 6;
    }
}

bitflags! {
    /// Primary advertising channels ([Vol 4] Part E, Section 7.8.53).
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct AdvertisingChannels: u8 {
        const CH37 = 1 << 0;
        const CH38 = 1 << 1;
        const CH39 = 1 << 2;
    }
}

impl Default for AdvertisingChannels {
    fn default() -> Self {
        Self::all()
    }
}

/// Physical layer selector ([Vol 4] Part E, Section 7.8.53).
#[derive(Debug, Copy, Clone, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Phy {
    Le1M = 0x01,
    Le2M = 0x02,
    LeCoded = 0x03,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum AdvertisingFilterPolicy {
    #[default]
    All = 0x00,
    FilterScanRequests = 0x01,
    FilterConnectRequests = 0x02,
    FilterBoth = 0x03,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum ScanningFilterPolicy {
    #[default]
    All = 0x00,
    FilterAcceptListOnly = 0x01,
    AllAndDirected = 0x02,
    FilterAcceptListAndDirected = 0x03,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum InitiatorFilterPolicy {
    /// Connect to the peer given in the command.
    #[default]
    PeerAddress = 0x00,
    /// Connect to any device on the filter accept list.
    FilterAcceptList = 0x01,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum ScanKind {
    #[default]
    Passive = 0x00,
    Active = 0x01,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum FilterDuplicates {
    #[default]
    Disabled = 0x00,
    Enabled = 0x01,
    ResetPerScanPeriod = 0x02,
}

/// Fragmentation hint for extended advertising data
/// ([Vol 4] Part E, Section 7.8.54): `0x00` lets the controller fragment,
/// `0x01` announces that the host will not provide further fragments.
#[derive(Debug, Copy, Clone, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum FragmentPreference {
    MayFragment = 0x00,
    NoFragmentation = 0x01,
}

/// Operation field of the extended advertising data commands
/// ([Vol 4] Part E, Section 7.8.54).
#[derive(Debug, Copy, Clone, Eq, PartialEq, IntoPrimitive)]
#[repr(u8)]
pub enum AdvertisingDataOp {
    IntermediateFragment = 0x00,
    FirstFragment = 0x01,
    LastFragment = 0x02,
    Complete = 0x03,
    Unchanged = 0x04,
}

/// Transmission power level in dBm.
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct TxPower(i8);

impl TxPower {
    /// Unknown or no preference power level
    /// ([Vol 4] Part E, Sections 7.5.4 and 7.8.53).
    pub const NONE: TxPower = TxPower(0x7F);

    #[inline]
    #[must_use]
    pub const fn new(dbm: i8) -> Self {
        Self(dbm)
    }

    #[inline]
    pub const fn dbm(self) -> i8 {
        self.0
    }
}

impl Default for TxPower {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<TxPower> for i8 {
    #[inline]
    fn from(power: TxPower) -> i8 {
        power.0
    }
}

impl Debug for TxPower {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if *self == Self::NONE {
            f.write_str("TxPower(none)")
        } else {
            write!(f, "TxPower({} dBm)", self.0)
        }
    }
}

impl Display for TxPower {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// LE meta event sub-event codes ([Vol 4] Part E, Section 7.7.65).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, TryFromPrimitive, Sequence)]
#[repr(u8)]
pub enum SubeventCode {
    ConnectionComplete = 0x01,
    AdvertisingReport = 0x02,
    ConnectionUpdateComplete = 0x03,
    ReadRemoteFeaturesComplete = 0x04,
    LongTermKeyRequest = 0x05,
    RemoteConnectionParameterRequest = 0x06,
    DataLengthChange = 0x07,
    ReadLocalP256PublicKeyComplete = 0x08,
    GenerateDhKeyComplete = 0x09,
    EnhancedConnectionComplete = 0x0A,
    DirectedAdvertisingReport = 0x0B,
    PhyUpdateComplete = 0x0C,
    ExtendedAdvertisingReport = 0x0D,
    PeriodicAdvertisingSyncEstablished = 0x0E,
    PeriodicAdvertisingReport = 0x0F,
    PeriodicAdvertisingSyncLost = 0x10,
    ScanTimeout = 0x11,
    AdvertisingSetTerminated = 0x12,
    ScanRequestReceived = 0x13,
    ChannelSelectionAlgorithm = 0x14,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LeEventMask(u64);

impl LeEventMask {
    #[inline(always)]
    pub const fn none() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        enum_iterator::all::<SubeventCode>().fold(LeEventMask::none(), |mask, e| mask.with(e, true))
    }

    // Bit N enables sub-event code N + 1 ([Vol 4] Part E, Section 7.8.1).
    #[inline(always)]
    pub fn with(mut self, c: SubeventCode, enable: bool) -> Self {
        let mask = 1u64 << (c as u8 - 1);
        if enable {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
        self
    }
}

impl Default for LeEventMask {
    fn default() -> Self {
        Self::all()
    }
}

impl From<LeEventMask> for u64 {
    #[inline]
    fn from(mask: LeEventMask) -> u64 {
        mask.0
    }
}
