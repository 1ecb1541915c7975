//! Attribute Protocol PDU codecs ([Vol 3] Part F, Section 3.4).
//!
//! Dispatch is opcode directed at a higher layer, so [`Pdu::deserialize`]
//! is nullable: `None` means "not this PDU" (wrong opcode) or "malformed"
//! (size rule violated), never an error the caller has to unwind across
//! framing boundaries.

use bytes::{BufMut, Bytes, BytesMut};
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

use crate::ensure;
use crate::utils::SliceExt;

/// ATT PDU opcodes ([Vol 3] Part F, Section 3.4.8).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    ErrorResponse = 0x01,
    ExchangeMtuRequest = 0x02,
    ExchangeMtuResponse = 0x03,
    FindInformationRequest = 0x04,
    FindInformationResponse = 0x05,
    FindByTypeValueRequest = 0x06,
    FindByTypeValueResponse = 0x07,
    ReadByTypeRequest = 0x08,
    ReadByTypeResponse = 0x09,
    ReadRequest = 0x0A,
    ReadResponse = 0x0B,
    ReadBlobRequest = 0x0C,
    ReadBlobResponse = 0x0D,
    ReadMultipleRequest = 0x0E,
    ReadMultipleResponse = 0x0F,
    ReadByGroupTypeRequest = 0x10,
    ReadByGroupTypeResponse = 0x11,
    WriteRequest = 0x12,
    WriteResponse = 0x13,
    PrepareWriteRequest = 0x16,
    PrepareWriteResponse = 0x17,
    ExecuteWriteRequest = 0x18,
    ExecuteWriteResponse = 0x19,
    HandleValueNotification = 0x1B,
    HandleValueIndication = 0x1D,
    HandleValueConfirmation = 0x1E,
    ReadMultipleVariableRequest = 0x20,
    ReadMultipleVariableResponse = 0x21,
    MultipleHandleValueNotification = 0x23,
    WriteCommand = 0x52,
    SignedWriteCommand = 0xD2,
}

/// ATT error codes ([Vol 3] Part F, Section 3.4.1.1).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum ErrorCode {
    InvalidHandle = 0x01,
    ReadNotPermitted = 0x02,
    WriteNotPermitted = 0x03,
    InvalidPdu = 0x04,
    InsufficientAuthentication = 0x05,
    RequestNotSupported = 0x06,
    InvalidOffset = 0x07,
    InsufficientAuthorization = 0x08,
    PrepareQueueFull = 0x09,
    AttributeNotFound = 0x0A,
    AttributeNotLong = 0x0B,
    InsufficientEncryptionKeySize = 0x0C,
    InvalidAttributeValueLength = 0x0D,
    UnlikelyError = 0x0E,
    InsufficientEncryption = 0x0F,
    UnsupportedGroupType = 0x10,
    InsufficientResources = 0x11,
    DatabaseOutOfSync = 0x12,
    ValueNotAllowed = 0x13,
    #[num_enum(catch_all)]
    Other(u8),
}

/// An Attribute Protocol data unit with a fixed wire layout.
pub trait Pdu: Sized {
    const OPCODE: Opcode;

    /// Encodes the PDU including its leading opcode byte.
    fn serialize(&self) -> Bytes;

    /// Decodes the PDU. `None` when the buffer begins with a different
    /// opcode or violates this PDU's size rules.
    fn deserialize(data: &[u8]) -> Option<Self>;
}

fn strip_opcode(data: &[u8], opcode: Opcode) -> Option<&[u8]> {
    let (&first, body) = data.split_first()?;
    (first == u8::from(opcode)).then_some(body)
}

/// ([Vol 3] Part F, Section 3.4.1.1).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ErrorResponse {
    /// The request that failed.
    pub request: Opcode,
    /// The attribute handle the failure relates to, or zero.
    pub handle: u16,
    pub error: ErrorCode,
}

impl Pdu for ErrorResponse {
    const OPCODE: Opcode = Opcode::ErrorResponse;

    fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u8(Self::OPCODE.into());
        buf.put_u8(self.request.into());
        buf.put_u16_le(self.handle);
        buf.put_u8(self.error.into());
        buf.freeze()
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        let body = strip_opcode(data, Self::OPCODE)?;
        ensure!(body.len() == 4);
        Some(Self {
            request: Opcode::try_from(body[0]).ok()?,
            handle: u16::from_le_bytes(*body.get_chunk(1)?),
            error: ErrorCode::from(body[3]),
        })
    }
}

/// ([Vol 3] Part F, Section 3.4.2.1).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ExchangeMtuRequest {
    pub mtu: u16,
}

impl Pdu for ExchangeMtuRequest {
    const OPCODE: Opcode = Opcode::ExchangeMtuRequest;

    fn serialize(&self) -> Bytes {
        serialize_mtu(Self::OPCODE, self.mtu)
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        deserialize_mtu(data, Self::OPCODE).map(|mtu| Self { mtu })
    }
}

/// ([Vol 3] Part F, Section 3.4.2.2).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ExchangeMtuResponse {
    pub mtu: u16,
}

impl Pdu for ExchangeMtuResponse {
    const OPCODE: Opcode = Opcode::ExchangeMtuResponse;

    fn serialize(&self) -> Bytes {
        serialize_mtu(Self::OPCODE, self.mtu)
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        deserialize_mtu(data, Self::OPCODE).map(|mtu| Self { mtu })
    }
}

fn serialize_mtu(opcode: Opcode, mtu: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(3);
    buf.put_u8(opcode.into());
    buf.put_u16_le(mtu);
    buf.freeze()
}

fn deserialize_mtu(data: &[u8], opcode: Opcode) -> Option<u16> {
    let body = strip_opcode(data, opcode)?;
    ensure!(body.len() == 2);
    Some(u16::from_le_bytes(*body.get_chunk(0)?))
}

/// ([Vol 3] Part F, Section 3.4.3.1).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FindInformationRequest {
    pub start_handle: u16,
    pub end_handle: u16,
}

impl Pdu for FindInformationRequest {
    const OPCODE: Opcode = Opcode::FindInformationRequest;

    fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u8(Self::OPCODE.into());
        buf.put_u16_le(self.start_handle);
        buf.put_u16_le(self.end_handle);
        buf.freeze()
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        let body = strip_opcode(data, Self::OPCODE)?;
        ensure!(body.len() == 4);
        Some(Self {
            start_handle: u16::from_le_bytes(*body.get_chunk(0)?),
            end_handle: u16::from_le_bytes(*body.get_chunk(2)?),
        })
    }
}

/// Handle/UUID pairs of a Find Information Response. The format byte on the
/// wire selects one uniform UUID width for the whole list, so mixed widths
/// cannot be expressed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FindInformationData {
    /// Format 0x01: 16-bit Bluetooth UUIDs.
    Short(Vec<(u16, u16)>),
    /// Format 0x02: full 128-bit UUIDs.
    Full(Vec<(u16, u128)>),
}

impl FindInformationData {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Short(entries) => entries.is_empty(),
            Self::Full(entries) => entries.is_empty(),
        }
    }
}

/// ([Vol 3] Part F, Section 3.4.3.2).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FindInformationResponse {
    data: FindInformationData,
}

impl FindInformationResponse {
    const FORMAT_SHORT: u8 = 0x01;
    const FORMAT_FULL: u8 = 0x02;

    /// Returns `None` for an empty list; the PDU carries at least one entry.
    pub fn new(data: FindInformationData) -> Option<Self> {
        (!data.is_empty()).then_some(Self { data })
    }

    pub fn data(&self) -> &FindInformationData {
        &self.data
    }
}

impl Pdu for FindInformationResponse {
    const OPCODE: Opcode = Opcode::FindInformationResponse;

    fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(Self::OPCODE.into());
        match &self.data {
            FindInformationData::Short(entries) => {
                buf.put_u8(Self::FORMAT_SHORT);
                for (handle, uuid) in entries {
                    buf.put_u16_le(*handle);
                    buf.put_u16_le(*uuid);
                }
            }
            FindInformationData::Full(entries) => {
                buf.put_u8(Self::FORMAT_FULL);
                for (handle, uuid) in entries {
                    buf.put_u16_le(*handle);
                    buf.put_u128_le(*uuid);
                }
            }
        }
        buf.freeze()
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        let body = strip_opcode(data, Self::OPCODE)?;
        let (&format, entries) = body.split_first()?;
        let data = match format {
            Self::FORMAT_SHORT => {
                ensure!(entries.len() % 4 == 0);
                FindInformationData::Short(
                    entries
                        .chunks_exact(4)
                        .map(|chunk| (
                            u16::from_le_bytes(chunk.get_chunk(0).copied().unwrap_or_default()),
                            u16::from_le_bytes(chunk.get_chunk(2).copied().unwrap_or_default()),
                        ))
                        .collect()
                )
            }
            Self::FORMAT_FULL => {
                ensure!(entries.len() % 18 == 0);
                FindInformationData::Full(
                    entries
                        .chunks_exact(18)
                        .map(|chunk| (
                            u16::from_le_bytes(chunk.get_chunk(0).copied().unwrap_or_default()),
                            u128::from_le_bytes(chunk.get_chunk(2).copied().unwrap_or_default()),
                        ))
                        .collect()
                )
            }
            _ => return None,
        };
        Self::new(data)
    }
}

/// ([Vol 3] Part F, Section 3.4.4.3).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReadRequest {
    pub handle: u16,
}

impl Pdu for ReadRequest {
    const OPCODE: Opcode = Opcode::ReadRequest;

    fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(3);
        buf.put_u8(Self::OPCODE.into());
        buf.put_u16_le(self.handle);
        buf.freeze()
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        let body = strip_opcode(data, Self::OPCODE)?;
        ensure!(body.len() == 2);
        Some(Self { handle: u16::from_le_bytes(*body.get_chunk(0)?) })
    }
}

/// ([Vol 3] Part F, Section 3.4.4.4).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReadResponse {
    pub value: Bytes,
}

impl Pdu for ReadResponse {
    const OPCODE: Opcode = Opcode::ReadResponse;

    fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.value.len());
        buf.put_u8(Self::OPCODE.into());
        buf.put_slice(&self.value);
        buf.freeze()
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        let body = strip_opcode(data, Self::OPCODE)?;
        Some(Self { value: Bytes::copy_from_slice(body) })
    }
}

/// ([Vol 3] Part F, Section 3.4.5.1).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WriteRequest {
    pub handle: u16,
    pub value: Bytes,
}

impl Pdu for WriteRequest {
    const OPCODE: Opcode = Opcode::WriteRequest;

    fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(3 + self.value.len());
        buf.put_u8(Self::OPCODE.into());
        buf.put_u16_le(self.handle);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        let body = strip_opcode(data, Self::OPCODE)?;
        ensure!(body.len() >= 2);
        Some(Self {
            handle: u16::from_le_bytes(*body.get_chunk(0)?),
            value: Bytes::copy_from_slice(&body[2..]),
        })
    }
}

/// ([Vol 3] Part F, Section 3.4.5.2).
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct WriteResponse;

impl Pdu for WriteResponse {
    const OPCODE: Opcode = Opcode::WriteResponse;

    fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1);
        buf.put_u8(Self::OPCODE.into());
        buf.freeze()
    }

    fn deserialize(data: &[u8]) -> Option<Self> {
        let body = strip_opcode(data, Self::OPCODE)?;
        ensure!(body.is_empty());
        Some(Self)
    }
}
