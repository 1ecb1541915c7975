use bytes::{Buf, Bytes};
use smallvec::SmallVec;

use crate::ensure;
use crate::hci::Error;

/// Assembly buffer for outgoing command packets.
///
/// All multi-byte writers are little endian, matching the HCI wire format.
#[derive(Default)]
pub struct SendBuffer(SmallVec<[u8; 8]>);

impl SendBuffer {

    #[inline]
    pub(crate) fn set_u8(&mut self, index: usize, value: u8) {
        self.0[index] = value;
    }

    #[inline]
    pub fn put_u8(&mut self, value: impl Into<u8>) -> &mut Self {
        self.0.push(value.into());
        self
    }

    #[inline]
    pub fn put_i8(&mut self, value: impl Into<i8>) -> &mut Self {
        self.0.push(value.into() as u8);
        self
    }

    #[inline]
    pub fn put_u16(&mut self, value: impl Into<u16>) -> &mut Self {
        self.0.extend_from_slice(&value.into().to_le_bytes());
        self
    }

    /// Writes the low 24 bits of `value`.
    #[inline]
    pub fn put_u24(&mut self, value: u32) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes()[..3]);
        self
    }

    #[inline]
    pub fn put_u64(&mut self, value: impl Into<u64>) -> &mut Self {
        self.0.extend_from_slice(&value.into().to_le_bytes());
        self
    }

    #[inline]
    pub fn put_slice(&mut self, value: &[u8]) -> &mut Self {
        self.0.extend_from_slice(value);
        self
    }

    /// Writes `value` back to front. Keys and plaintext blocks handed to the
    /// controller are little endian within the block.
    #[inline]
    pub fn put_reversed(&mut self, value: &[u8]) -> &mut Self {
        self.0.extend(value.iter().rev().copied());
        self
    }

    /// Dummy method to end a chain with unit type
    /// Can be helpful with closures: `|b| b.put_u8(12).end()`
    pub fn end(&mut self) { }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.0
    }

}

/// Bounds-checked little-endian cursor over a received event payload.
///
/// Every reader fails with [`Error::BadEventPacketSize`] instead of reading
/// past the end of the payload.
#[derive(Debug, Clone)]
pub struct ReceiveBuffer(Bytes);

impl ReceiveBuffer {

    pub fn from_payload(payload: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(payload))
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, Error> {
        ensure!(self.0.remaining() >= 1, Error::BadEventPacketSize);
        Ok(self.0.get_u8())
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8, Error> {
        self.u8().map(|v| v as i8)
    }

    #[inline]
    pub fn u16(&mut self) -> Result<u16, Error> {
        ensure!(self.0.remaining() >= 2, Error::BadEventPacketSize);
        Ok(self.0.get_u16_le())
    }

    #[inline]
    pub fn u64(&mut self) -> Result<u64, Error> {
        ensure!(self.0.remaining() >= 8, Error::BadEventPacketSize);
        Ok(self.0.get_u64_le())
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        ensure!(self.0.remaining() >= N, Error::BadEventPacketSize);
        let mut array = [0; N];
        self.0.copy_to_slice(&mut array);
        Ok(array)
    }

    pub fn split_bytes(&mut self, len: usize) -> Result<Bytes, Error> {
        ensure!(self.0.remaining() >= len, Error::BadEventPacketSize);
        Ok(self.0.split_to(len))
    }

    /// Takes everything that is left.
    pub fn take_rest(&mut self) -> Bytes {
        self.0.split_to(self.0.len())
    }

    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        ensure!(self.0.remaining() >= len, Error::BadEventPacketSize);
        self.0.advance(len);
        Ok(())
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.0.remaining()
    }

    /// Asserts that the payload was fully consumed.
    pub fn finish(&mut self) -> Result<(), Error> {
        ensure!(self.0.remaining() == 0, Error::BadEventPacketSize);
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_buffer_layout() {
        let mut buf = SendBuffer::default();
        buf.put_u16(0x0C03u16);
        buf.put_u8(2u8);
        buf.put_u24(0x00A000);
        assert_eq!(buf.data(), &[0x03, 0x0C, 0x02, 0x00, 0xA0, 0x00]);
        buf.set_u8(2, 3);
        assert_eq!(buf.data()[2], 3);
    }

    #[test]
    fn put_reversed() {
        let mut buf = SendBuffer::default();
        buf.put_reversed(&[0x01, 0x02, 0x03]);
        assert_eq!(buf.data(), &[0x03, 0x02, 0x01]);
    }

    #[test]
    fn receive_buffer_bounds() {
        let mut buf = ReceiveBuffer::from_payload(&[0x01, 0x02, 0x03]);
        assert_eq!(buf.u16().unwrap(), 0x0201);
        assert!(buf.u16().is_err());
        assert_eq!(buf.remaining(), 1);
        assert!(buf.finish().is_err());
        assert_eq!(buf.u8().unwrap(), 0x03);
        assert!(buf.finish().is_ok());
    }
}
