use std::fmt::{Debug, Formatter};

use num_enum::FromPrimitive;

// Opcode group field definitions.
#[derive(Debug, Clone, Copy, Eq, PartialEq, FromPrimitive)]
#[repr(u16)]
pub enum OpcodeGroup {
    LinkControl = 0x01,
    LinkPolicy = 0x02,
    HciControl = 0x03,
    InfoParams = 0x04,
    StatusParams = 0x05,
    Testing = 0x06,
    Le = 0x08,
    Vendor = 0x3F, // [Vol 4] Part E, Section 5.4.1
    /// A group the registry has no name for. The field is six bits wide.
    #[num_enum(catch_all)]
    Reserved(u16),
}

impl OpcodeGroup {
    const fn raw(self) -> u16 {
        match self {
            Self::LinkControl => 0x01,
            Self::LinkPolicy => 0x02,
            Self::HciControl => 0x03,
            Self::InfoParams => 0x04,
            Self::StatusParams => 0x05,
            Self::Testing => 0x06,
            Self::Le => 0x08,
            Self::Vendor => 0x3F,
            Self::Reserved(value) => value & 0x3F,
        }
    }
}

#[derive(Default, Copy, Clone, Eq, PartialEq)]
pub struct Opcode(u16);

impl Opcode {
    /// Opcode 0x0000 is used to update `Num_HCI_Command_Packets`
    /// ([Vol 4] Part E, Section 7.7.14).
    pub const NONE: Opcode = Opcode(0x0000);
}

impl Opcode {
    /// Creates a new opcode from the specified group and command fields.
    #[inline]
    pub const fn new(group: OpcodeGroup, ocf: u16) -> Self {
        // Combines OGF with OCF to create a full opcode.
        Self(group.raw() << 10 | ocf)
    }

    pub fn split(&self) -> (OpcodeGroup, u16) {
        (OpcodeGroup::from((self.0 >> 10) & 0x3F), self.0 & 0x3FF)
    }
}

impl Debug for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (group, ocf) = self.split();
        write!(f, "Opcode({:?}, 0x{:03X})", group, ocf)
    }
}

impl From<Opcode> for u16 {
    #[inline]
    fn from(opcode: Opcode) -> u16 {
        opcode.0
    }
}

impl From<u16> for Opcode {
    #[inline]
    fn from(opcode: u16) -> Opcode {
        Opcode(opcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_split_round_trip() {
        for ogf in 0..0x40u16 {
            let group = OpcodeGroup::from(ogf);
            for ocf in 0..0x400u16 {
                let opcode = Opcode::new(group, ocf);
                assert_eq!(u16::from(opcode), ogf << 10 | ocf);
                assert_eq!(opcode.split(), (group, ocf));
            }
        }
    }

    #[test]
    fn reserved_groups_keep_their_value() {
        assert_eq!(OpcodeGroup::from(0x07), OpcodeGroup::Reserved(0x07));
        let opcode = Opcode::new(OpcodeGroup::Reserved(0x07), 0x123);
        assert_eq!(u16::from(opcode), 0x07 << 10 | 0x123);
        assert_eq!(opcode.split(), (OpcodeGroup::Reserved(0x07), 0x123));
    }

    #[test]
    fn known_values() {
        assert_eq!(u16::from(Opcode::new(OpcodeGroup::HciControl, 0x0003)), 0x0C03);
        assert_eq!(u16::from(Opcode::new(OpcodeGroup::Le, 0x0036)), 0x2036);
        assert_eq!(Opcode::from(0x0C03).split(), (OpcodeGroup::HciControl, 0x0003));
    }
}
