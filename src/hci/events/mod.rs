use bytes::Bytes;

use crate::ensure;
use crate::hci::buffer::ReceiveBuffer;
use crate::hci::consts::{AddressKind, BdAddr, EventCode, SubeventCode, TxPower};
use crate::hci::Error;

/// A received HCI event packet, header stripped.
#[derive(Debug, Clone)]
pub struct Event {
    pub code: EventCode,
    pub data: ReceiveBuffer,
}

impl Event {
    /// HCI event packet ([Vol 4] Part E, Section 5.4.4).
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        data
            .split_first_chunk()
            .ok_or(Error::BadEventPacketSize)
            .and_then(|([code, len], payload)| {
                let code = EventCode::try_from(*code)
                    .map_err(|_| Error::UnknownEventCode(*code))?;
                ensure!(*len as usize == payload.len(), Error::BadEventPacketSize);
                Ok(Self {
                    code,
                    data: ReceiveBuffer::from_payload(payload)
                })
            })
    }
}

/// Decoder for the return parameters of a completed command.
pub trait FromEvent: Sized {
    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error>;
}

impl FromEvent for () {
    fn unpack(_: &mut ReceiveBuffer) -> Result<Self, Error> {
        Ok(())
    }
}

impl FromEvent for u8 {
    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error> {
        buf.u8()
    }
}

impl FromEvent for u16 {
    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error> {
        buf.u16()
    }
}

impl FromEvent for u64 {
    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error> {
        buf.u64()
    }
}

impl FromEvent for TxPower {
    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error> {
        buf.i8().map(TxPower::new)
    }
}

/// Parsed LE meta event ([Vol 4] Part E, Section 7.7.65).
#[derive(Debug, Clone)]
pub enum LeMetaEvent {
    ExtendedAdvertisingReports(Vec<ExtendedAdvertisingReport>),
    /// A sub-event this driver does not decode.
    Other {
        subevent: SubeventCode,
        data: ReceiveBuffer,
    },
}

impl LeMetaEvent {
    /// Decodes an LE meta event. Returns `Ok(None)` when `event` carries a
    /// different event code.
    pub fn parse(event: &Event) -> Result<Option<Self>, Error> {
        if event.code != EventCode::LeMeta {
            return Ok(None);
        }
        let mut data = event.data.clone();
        let subevent = data.u8()?;
        let subevent = SubeventCode::try_from(subevent)
            .map_err(|_| Error::UnknownEventCode(subevent))?;
        match subevent {
            SubeventCode::ExtendedAdvertisingReport => {
                let reports = ExtendedAdvertisingReport::unpack_all(&mut data)?;
                data.finish()?;
                Ok(Some(Self::ExtendedAdvertisingReports(reports)))
            }
            _ => Ok(Some(Self::Other { subevent, data })),
        }
    }
}

/// One report from an LE Extended Advertising Report event
/// ([Vol 4] Part E, Section 7.7.65.13).
///
/// The `data` blob is advertising data in the length-type-value format
/// understood by [`crate::adv::AdvData::parse`].
#[derive(Debug, Clone)]
pub struct ExtendedAdvertisingReport {
    pub event_type: u16,
    pub addr_kind: AddressKind,
    pub addr: BdAddr,
    pub primary_phy: u8,
    pub secondary_phy: u8,
    /// 0xFF when the advertisement carries no set identifier.
    pub sid: u8,
    pub tx_power: TxPower,
    /// 0x7F when the RSSI is not available.
    pub rssi: i8,
    /// Periodic advertising interval in 1.25 ms units, 0 if none.
    pub periodic_interval: u16,
    pub direct_addr_kind: u8,
    pub direct_addr: BdAddr,
    pub data: Bytes,
}

impl ExtendedAdvertisingReport {
    fn unpack_all(buf: &mut ReceiveBuffer) -> Result<Vec<Self>, Error> {
        let count = buf.u8()? as usize;
        (0..count).map(|_| Self::unpack(buf)).collect()
    }

    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error> {
        let event_type = buf.u16()?;
        let addr_kind = AddressKind::try_from(buf.u8()?)
            .map_err(|_| Error::BadEventPacketSize)?;
        let addr = BdAddr::unpack(buf)?;
        let primary_phy = buf.u8()?;
        let secondary_phy = buf.u8()?;
        let sid = buf.u8()?;
        let tx_power = TxPower::unpack(buf)?;
        let rssi = buf.i8()?;
        let periodic_interval = buf.u16()?;
        let direct_addr_kind = buf.u8()?;
        let direct_addr = BdAddr::unpack(buf)?;
        let data_len = buf.u8()? as usize;
        let data = buf.split_bytes(data_len)?;
        Ok(Self {
            event_type,
            addr_kind,
            addr,
            primary_phy,
            secondary_phy,
            sid,
            tx_power,
            rssi,
            periodic_interval,
            direct_addr_kind,
            direct_addr,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_header_validation() {
        assert!(Event::parse(&[]).is_err());
        assert!(Event::parse(&[0x0E]).is_err());
        assert!(matches!(Event::parse(&[0x0E, 0x01]), Err(Error::BadEventPacketSize)));
        let event = Event::parse(&[0x0E, 0x01, 0xAA]).unwrap();
        assert_eq!(event.code, EventCode::CommandComplete);
        assert_eq!(event.data.remaining(), 1);
    }

    #[test]
    fn extended_advertising_report() {
        let mut packet = vec![
            0x3E, 0x00, // length patched below
            0x0D, // extended advertising report
            0x01, // one report
            0x13, 0x00, // event type: connectable | scannable | legacy
            0x01, // random address
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
            0x01, // primary phy
            0x00, // no secondary phy
            0xFF, // no sid
            0x7F, // no tx power
            0xC8, // rssi -56
            0x00, 0x00, // no periodic interval
            0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x03, 0x02, 0x01, 0x06, // flags record
        ];
        packet[1] = (packet.len() - 2) as u8;
        let event = Event::parse(&packet).unwrap();
        let parsed = LeMetaEvent::parse(&event).unwrap().unwrap();
        let LeMetaEvent::ExtendedAdvertisingReports(reports) = parsed else {
            panic!("expected advertising reports");
        };
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.addr_kind, AddressKind::Random);
        assert_eq!(report.addr.to_string(), "06:05:04:03:02:01");
        assert_eq!(report.rssi, -56);
        assert_eq!(report.tx_power, TxPower::NONE);
        assert_eq!(report.data.as_ref(), &[0x02, 0x01, 0x06]);
    }

    #[test]
    fn truncated_report_is_rejected() {
        let packet = [0x3E, 0x04, 0x0D, 0x01, 0x13, 0x00];
        let event = Event::parse(&packet).unwrap();
        assert!(LeMetaEvent::parse(&event).is_err());
    }

    #[test]
    fn non_meta_event_passes_through() {
        let event = Event::parse(&[0x0E, 0x01, 0x00]).unwrap();
        assert!(LeMetaEvent::parse(&event).unwrap().is_none());
    }
}
