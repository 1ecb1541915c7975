use std::time::Duration;

use smallvec::SmallVec;

use crate::ensure;
use crate::hci::buffer::{ReceiveBuffer, SendBuffer};
use crate::hci::consts::{
    AddressKind, AdvertisingChannels, AdvertisingDataOp, AdvertisingEventProps,
    AdvertisingFilterPolicy, BdAddr, FilterDuplicates, FragmentPreference, InitiatorFilterPolicy,
    LeEventMask, OwnAddressKind, Phy, ScanKind, ScanningFilterPolicy, TxPower,
};
use crate::hci::events::FromEvent;
use crate::hci::le_states::SupportedStates;
use crate::hci::{Error, Hci, Opcode, OpcodeGroup};

// Controller time bases. Callers hand in `Duration`s; the encoders convert to
// the unit the field is defined in, rounding to the nearest unit (half away
// from zero).
const UNIT_625_US: u64 = 625;
const UNIT_1250_US: u64 = 1250;
const UNIT_10_MS: u64 = 10_000;
const UNIT_1280_MS: u64 = 1_280_000;

fn to_units(duration: Duration, unit_us: u64) -> u128 {
    (duration.as_micros() + u128::from(unit_us) / 2) / u128::from(unit_us)
}

fn to_units_u16(duration: Duration, unit_us: u64, what: &'static str) -> Result<u16, Error> {
    u16::try_from(to_units(duration, unit_us)).map_err(|_| Error::InvalidArguments(what))
}

fn to_units_u24(duration: Duration, unit_us: u64, what: &'static str) -> Result<u32, Error> {
    let units = to_units(duration, unit_us);
    ensure!(units <= 0x00FF_FFFF, Error::InvalidArguments(what));
    Ok(units as u32)
}

/// LE controller commands ([Vol 4] Part E, Section 7.8).
impl Hci {

    pub async fn le_set_event_mask(&self, mask: LeEventMask) -> Result<(), Error> {
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x0001), |p| {
            p.put_u64(mask);
        }).await
    }

    /// ([Vol 4] Part E, Section 7.8.2).
    pub async fn le_read_buffer_size(&self) -> Result<LeBufferSize, Error> {
        self.call(Opcode::new(OpcodeGroup::Le, 0x0002)).await
    }

    /// ([Vol 4] Part E, Section 7.8.93).
    pub async fn le_read_buffer_size_v2(&self) -> Result<LeBufferSizeV2, Error> {
        self.call(Opcode::new(OpcodeGroup::Le, 0x0060)).await
    }

    /// Returns the LE feature mask of the controller
    /// ([Vol 4] Part E, Section 7.8.3).
    pub async fn le_read_local_supported_features(&self) -> Result<u64, Error> {
        self.call(Opcode::new(OpcodeGroup::Le, 0x0003)).await
    }

    /// ([Vol 4] Part E, Section 7.8.4).
    pub async fn le_set_random_address(&self, addr: BdAddr) -> Result<(), Error> {
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x0005), |p| {
            p.put_slice(addr.as_ref());
        }).await
    }

    /// Starts establishing a connection to `params.peer_addr`
    /// ([Vol 4] Part E, Section 7.8.12).
    pub async fn le_create_connection(&self, params: &ConnectionParams) -> Result<(), Error> {
        let scan_interval = to_units_u16(params.scan_interval, UNIT_625_US, "scan interval")?;
        let scan_window = to_units_u16(params.scan_window, UNIT_625_US, "scan window")?;
        let link = LinkParamsEncoded::new(&params.link)?;
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x000D), |p| {
            p.put_u16(scan_interval);
            p.put_u16(scan_window);
            p.put_u8(params.filter_policy);
            p.put_u8(params.peer_addr_kind);
            p.put_slice(params.peer_addr.as_ref());
            p.put_u8(params.own_addr_kind);
            link.put(p);
        }).await
    }

    /// Changes the parameters of an established connection
    /// ([Vol 4] Part E, Section 7.8.18).
    pub async fn le_connection_update(&self, handle: u16, link: &LinkParams) -> Result<(), Error> {
        let link = LinkParamsEncoded::new(link)?;
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x0013), |p| {
            p.put_u16(handle);
            link.put(p);
        }).await
    }

    /// Encrypts one AES-128 block inside the controller
    /// ([Vol 4] Part E, Section 7.8.22). Key and plaintext travel least
    /// significant byte first; the returned ciphertext is flipped back.
    pub async fn le_encrypt(&self, key: &[u8; 16], plaintext: &[u8; 16]) -> Result<[u8; 16], Error> {
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x0017), |p| {
            p.put_reversed(key);
            p.put_reversed(plaintext);
        }).await.map(|EncryptedBlock(block)| block)
    }

    /// ([Vol 4] Part E, Section 7.8.23).
    pub async fn le_rand(&self) -> Result<u64, Error> {
        self.call(Opcode::new(OpcodeGroup::Le, 0x0018)).await
    }

    /// Returns the combinations of LE states the controller can occupy
    /// concurrently ([Vol 4] Part E, Section 7.8.27).
    pub async fn le_read_supported_states(&self) -> Result<SupportedStates, Error> {
        self.call(Opcode::new(OpcodeGroup::Le, 0x001C)).await
    }

    /// Configures an advertising set and returns the transmit power the
    /// controller selected for it ([Vol 4] Part E, Section 7.8.53).
    pub async fn le_set_extended_advertising_parameters(&self, params: &AdvertisingSetParams) -> Result<TxPower, Error> {
        let interval_min = to_units_u24(params.interval_min, UNIT_625_US, "advertising interval")?;
        let interval_max = to_units_u24(params.interval_max, UNIT_625_US, "advertising interval")?;
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x0036), |p| {
            p.put_u8(params.handle);
            p.put_u16(params.props.bits());
            p.put_u24(interval_min);
            p.put_u24(interval_max);
            p.put_u8(params.channels.bits());
            p.put_u8(params.own_addr_kind);
            p.put_u8(params.peer_addr_kind);
            p.put_slice(params.peer_addr.as_ref());
            p.put_u8(params.filter_policy);
            p.put_i8(params.tx_power);
            p.put_u8(params.primary_phy);
            p.put_u8(params.secondary_max_skip);
            p.put_u8(params.secondary_phy);
            p.put_u8(params.sid);
            p.put_u8(u8::from(params.scan_request_notifications));
        }).await
    }

    /// ([Vol 4] Part E, Section 7.8.54).
    pub async fn le_set_extended_advertising_data(&self, handle: u8, op: AdvertisingDataOp, may_fragment: bool, data: &[u8]) -> Result<(), Error> {
        self.set_advertising_payload(Opcode::new(OpcodeGroup::Le, 0x0037), handle, op, may_fragment, data).await
    }

    /// ([Vol 4] Part E, Section 7.8.55).
    pub async fn le_set_extended_scan_response_data(&self, handle: u8, op: AdvertisingDataOp, may_fragment: bool, data: &[u8]) -> Result<(), Error> {
        self.set_advertising_payload(Opcode::new(OpcodeGroup::Le, 0x0038), handle, op, may_fragment, data).await
    }

    async fn set_advertising_payload(&self, cmd: Opcode, handle: u8, op: AdvertisingDataOp, may_fragment: bool, data: &[u8]) -> Result<(), Error> {
        // Fragment size limit per command ([Vol 4] Part E, Section 7.8.54).
        ensure!(data.len() <= 251, Error::InvalidArguments("advertising data fragment too long"));
        let fragment = match may_fragment {
            true => FragmentPreference::MayFragment,
            false => FragmentPreference::NoFragmentation,
        };
        self.call_with_args(cmd, |p| {
            p.put_u8(handle);
            p.put_u8(op);
            p.put_u8(fragment);
            p.put_u8(data.len() as u8);
            p.put_slice(data);
        }).await
    }

    /// Enables or disables the given advertising sets
    /// ([Vol 4] Part E, Section 7.8.56).
    pub async fn le_set_extended_advertising_enable(&self, enable: bool, sets: &[AdvertisingSetEnable]) -> Result<(), Error> {
        let count = u8::try_from(sets.len()).map_err(|_| Error::InvalidArguments("too many advertising sets"))?;
        let durations = sets.iter()
            .map(|set| to_units_u16(set.duration, UNIT_10_MS, "advertising duration"))
            .collect::<Result<SmallVec<[u16; 2]>, Error>>()?;
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x0039), |p| {
            p.put_u8(u8::from(enable));
            p.put_u8(count);
            for set in sets {
                p.put_u8(set.handle);
            }
            for duration in &durations {
                p.put_u16(*duration);
            }
            for set in sets {
                p.put_u8(set.max_events);
            }
        }).await
    }

    /// ([Vol 4] Part E, Section 7.8.57).
    pub async fn le_read_maximum_advertising_data_length(&self) -> Result<u16, Error> {
        self.call(Opcode::new(OpcodeGroup::Le, 0x003A)).await
    }

    /// ([Vol 4] Part E, Section 7.8.58).
    pub async fn le_read_number_of_supported_advertising_sets(&self) -> Result<u8, Error> {
        self.call(Opcode::new(OpcodeGroup::Le, 0x003B)).await
    }

    /// ([Vol 4] Part E, Section 7.8.59).
    pub async fn le_remove_advertising_set(&self, handle: u8) -> Result<(), Error> {
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x003C), |p| {
            p.put_u8(handle);
        }).await
    }

    /// ([Vol 4] Part E, Section 7.8.60).
    pub async fn le_clear_advertising_sets(&self) -> Result<(), Error> {
        self.call(Opcode::new(OpcodeGroup::Le, 0x003D)).await
    }

    /// Configures scanning on the primary advertising PHYs, LE 1M first
    /// ([Vol 4] Part E, Section 7.8.64). At least one PHY must be given.
    pub async fn le_set_extended_scan_parameters(
        &self,
        own_addr_kind: OwnAddressKind,
        filter_policy: ScanningFilterPolicy,
        le_1m: Option<ScanPhyParams>,
        le_coded: Option<ScanPhyParams>,
    ) -> Result<(), Error> {
        let mut phy_mask = 0u8;
        if le_1m.is_some() {
            phy_mask |= 1 << 0;
        }
        if le_coded.is_some() {
            phy_mask |= 1 << 2;
        }
        ensure!(phy_mask != 0, Error::InvalidArguments("no scanning PHY selected"));
        let phys: SmallVec<[ScanPhyParams; 2]> = le_1m.into_iter().chain(le_coded).collect();
        let intervals = phys.iter()
            .map(|phy| to_units_u16(phy.interval, UNIT_625_US, "scan interval"))
            .collect::<Result<SmallVec<[u16; 2]>, Error>>()?;
        let windows = phys.iter()
            .map(|phy| to_units_u16(phy.window, UNIT_625_US, "scan window"))
            .collect::<Result<SmallVec<[u16; 2]>, Error>>()?;
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x0041), |p| {
            p.put_u8(own_addr_kind);
            p.put_u8(filter_policy);
            p.put_u8(phy_mask);
            for phy in &phys {
                p.put_u8(phy.kind);
            }
            for interval in &intervals {
                p.put_u16(*interval);
            }
            for window in &windows {
                p.put_u16(*window);
            }
        }).await
    }

    /// Starts or stops scanning ([Vol 4] Part E, Section 7.8.65).
    /// `duration` uses 10 ms units, `period` 1.28 s units; zero means
    /// "until explicitly disabled" for both.
    pub async fn le_set_extended_scan_enable(
        &self,
        enable: bool,
        filter_duplicates: FilterDuplicates,
        duration: Duration,
        period: Duration,
    ) -> Result<(), Error> {
        let duration = to_units_u16(duration, UNIT_10_MS, "scan duration")?;
        let period = to_units_u16(period, UNIT_1280_MS, "scan period")?;
        self.call_with_args(Opcode::new(OpcodeGroup::Le, 0x0042), |p| {
            p.put_u8(u8::from(enable));
            p.put_u8(filter_duplicates);
            p.put_u16(duration);
            p.put_u16(period);
        }).await
    }

}

/// `HCI_LE_Read_Buffer_Size` return parameters
/// ([Vol 4] Part E, Section 7.8.2).
#[derive(Clone, Copy, Debug, Default)]
pub struct LeBufferSize {
    pub acl_data_packet_length: u16,
    pub total_num_acl_data_packets: u8,
}

impl FromEvent for LeBufferSize {
    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error> {
        Ok(Self {
            acl_data_packet_length: buf.u16()?,
            total_num_acl_data_packets: buf.u8()?,
        })
    }
}

/// `HCI_LE_Read_Buffer_Size` [v2] return parameters
/// ([Vol 4] Part E, Section 7.8.93).
#[derive(Clone, Copy, Debug, Default)]
pub struct LeBufferSizeV2 {
    pub acl_data_packet_length: u16,
    pub total_num_acl_data_packets: u8,
    pub iso_data_packet_length: u16,
    pub total_num_iso_data_packets: u8,
}

impl FromEvent for LeBufferSizeV2 {
    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error> {
        Ok(Self {
            acl_data_packet_length: buf.u16()?,
            total_num_acl_data_packets: buf.u8()?,
            iso_data_packet_length: buf.u16()?,
            total_num_iso_data_packets: buf.u8()?,
        })
    }
}

/// Parameters for `HCI_LE_Set_Extended_Advertising_Parameters`
/// ([Vol 4] Part E, Section 7.8.53).
#[derive(Debug, Clone)]
pub struct AdvertisingSetParams {
    pub handle: u8,
    pub props: AdvertisingEventProps,
    pub interval_min: Duration,
    pub interval_max: Duration,
    pub channels: AdvertisingChannels,
    pub own_addr_kind: OwnAddressKind,
    pub peer_addr_kind: AddressKind,
    pub peer_addr: BdAddr,
    pub filter_policy: AdvertisingFilterPolicy,
    pub tx_power: TxPower,
    pub primary_phy: Phy,
    pub secondary_max_skip: u8,
    pub secondary_phy: Phy,
    pub sid: u8,
    pub scan_request_notifications: bool,
}

impl Default for AdvertisingSetParams {
    fn default() -> Self {
        Self {
            handle: 0,
            props: AdvertisingEventProps::default(),
            interval_min: Duration::from_millis(100),
            interval_max: Duration::from_millis(200),
            channels: AdvertisingChannels::default(),
            own_addr_kind: OwnAddressKind::default(),
            peer_addr_kind: AddressKind::Public,
            peer_addr: BdAddr::default(),
            filter_policy: AdvertisingFilterPolicy::default(),
            tx_power: TxPower::NONE,
            primary_phy: Phy::Le1M,
            secondary_max_skip: 0,
            secondary_phy: Phy::Le1M,
            sid: 0,
            scan_request_notifications: false,
        }
    }
}

/// One entry of `HCI_LE_Set_Extended_Advertising_Enable`
/// ([Vol 4] Part E, Section 7.8.56). A zero `duration` keeps the set
/// advertising until it is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvertisingSetEnable {
    pub handle: u8,
    pub duration: Duration,
    pub max_events: u8,
}

/// Per-PHY block of `HCI_LE_Set_Extended_Scan_Parameters`
/// ([Vol 4] Part E, Section 7.8.64).
#[derive(Debug, Clone, Copy)]
pub struct ScanPhyParams {
    pub kind: ScanKind,
    pub interval: Duration,
    pub window: Duration,
}

/// Link-layer connection parameters shared by `HCI_LE_Create_Connection`
/// and `HCI_LE_Connection_Update`.
#[derive(Debug, Clone, Copy)]
pub struct LinkParams {
    pub interval_min: Duration,
    pub interval_max: Duration,
    /// Number of connection events the peripheral may skip.
    pub latency: u16,
    pub supervision_timeout: Duration,
    pub min_ce_length: Duration,
    pub max_ce_length: Duration,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            interval_min: Duration::from_millis(30),
            interval_max: Duration::from_millis(50),
            latency: 0,
            supervision_timeout: Duration::from_secs(5),
            min_ce_length: Duration::ZERO,
            max_ce_length: Duration::ZERO,
        }
    }
}

/// Parameters for `HCI_LE_Create_Connection`
/// ([Vol 4] Part E, Section 7.8.12).
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub scan_interval: Duration,
    pub scan_window: Duration,
    pub filter_policy: InitiatorFilterPolicy,
    pub peer_addr_kind: AddressKind,
    pub peer_addr: BdAddr,
    pub own_addr_kind: OwnAddressKind,
    pub link: LinkParams,
}

struct LinkParamsEncoded {
    interval_min: u16,
    interval_max: u16,
    latency: u16,
    supervision_timeout: u16,
    min_ce_length: u16,
    max_ce_length: u16,
}

impl LinkParamsEncoded {
    fn new(link: &LinkParams) -> Result<Self, Error> {
        Ok(Self {
            interval_min: to_units_u16(link.interval_min, UNIT_1250_US, "connection interval")?,
            interval_max: to_units_u16(link.interval_max, UNIT_1250_US, "connection interval")?,
            latency: link.latency,
            supervision_timeout: to_units_u16(link.supervision_timeout, UNIT_10_MS, "supervision timeout")?,
            min_ce_length: to_units_u16(link.min_ce_length, UNIT_625_US, "connection event length")?,
            max_ce_length: to_units_u16(link.max_ce_length, UNIT_625_US, "connection event length")?,
        })
    }

    fn put(&self, p: &mut SendBuffer) {
        p.put_u16(self.interval_min);
        p.put_u16(self.interval_max);
        p.put_u16(self.latency);
        p.put_u16(self.supervision_timeout);
        p.put_u16(self.min_ce_length);
        p.put_u16(self.max_ce_length);
    }
}

/// Ciphertext block returned by `HCI_LE_Encrypt`, flipped back from the
/// little-endian wire order.
struct EncryptedBlock([u8; 16]);

impl FromEvent for EncryptedBlock {
    fn unpack(buf: &mut ReceiveBuffer) -> Result<Self, Error> {
        let mut block: [u8; 16] = buf.array()?;
        block.reverse();
        Ok(Self(block))
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::Arc;

    use super::*;
    use crate::hci::testing::{complete_with, Loopback};

    fn hci() -> (Arc<Hci>, Loopback) {
        let transport = Loopback::default();
        (Arc::new(Hci::new(transport.clone())), transport)
    }

    async fn exchange<T>(hci: &Hci, fut: impl Future<Output = Result<T, Error>>, completion: &[u8]) -> Result<T, Error> {
        let (result, _) = tokio::join!(fut, async {
            tokio::task::yield_now().await;
            hci.handle_event(completion).unwrap();
        });
        result
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(to_units(Duration::from_micros(937), UNIT_625_US), 1);
        assert_eq!(to_units(Duration::from_micros(938), UNIT_625_US), 2);
        assert_eq!(to_units(Duration::from_millis(100), UNIT_625_US), 160);
        assert_eq!(to_units(Duration::ZERO, UNIT_625_US), 0);
        assert_eq!(to_units(Duration::from_millis(100), UNIT_1250_US), 80);
        assert_eq!(to_units(Duration::from_secs(5), UNIT_10_MS), 500);
        assert_eq!(to_units(Duration::from_millis(1920), UNIT_1280_MS), 2);
    }

    #[test]
    fn slot_counts_fit_the_field_width() {
        // 0xFFFF slots of 0.625 ms.
        let max = Duration::from_micros(0xFFFF * 625);
        assert_eq!(to_units_u16(max, UNIT_625_US, "x").unwrap(), 0xFFFF);
        assert!(to_units_u16(max + Duration::from_micros(625), UNIT_625_US, "x").is_err());
        let max = Duration::from_micros(0x00FF_FFFF * 625);
        assert_eq!(to_units_u24(max, UNIT_625_US, "x").unwrap(), 0x00FF_FFFF);
        assert!(to_units_u24(max + Duration::from_micros(625), UNIT_625_US, "x").is_err());
    }

    #[tokio::test]
    async fn extended_advertising_parameters_layout() {
        let (hci, transport) = hci();
        let params = AdvertisingSetParams {
            props: AdvertisingEventProps::CONNECTABLE,
            ..AdvertisingSetParams::default()
        };
        let result = exchange(
            &hci,
            hci.le_set_extended_advertising_parameters(&params),
            &complete_with(0x2036, &[0xF9]),
        ).await;
        assert_eq!(result.unwrap(), TxPower::new(-7));
        assert_eq!(transport.last_sent(), [
            0x36, 0x20, 0x19, // opcode + length
            0x00, // handle
            0x01, 0x00, // event properties
            0xA0, 0x00, 0x00, // interval min: 100 ms
            0x40, 0x01, 0x00, // interval max: 200 ms
            0x07, // all primary channels
            0x00, // own address: public
            0x00, // peer address: public
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, // filter policy
            0x7F, // no tx power preference
            0x01, // primary phy: 1M
            0x00, // secondary max skip
            0x01, // secondary phy: 1M
            0x00, // sid
            0x00, // scan request notifications
        ]);
    }

    #[tokio::test]
    async fn extended_advertising_data_layout() {
        let (hci, transport) = hci();
        let result = exchange(
            &hci,
            hci.le_set_extended_advertising_data(1, AdvertisingDataOp::Complete, true, &[0x02, 0x01, 0x06]),
            &complete_with(0x2037, &[]),
        ).await;
        result.unwrap();
        assert_eq!(transport.last_sent(), [
            0x37, 0x20, 0x07,
            0x01, // handle
            0x03, // complete
            0x00, // controller may fragment
            0x03, 0x02, 0x01, 0x06,
        ]);
    }

    #[tokio::test]
    async fn oversized_advertising_fragment_is_rejected() {
        let (hci, transport) = hci();
        let data = [0u8; 252];
        let result = hci
            .le_set_extended_advertising_data(0, AdvertisingDataOp::Complete, true, &data)
            .await;
        assert!(matches!(result, Err(Error::InvalidArguments(_))));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn extended_advertising_enable_layout() {
        let (hci, transport) = hci();
        let sets = [
            AdvertisingSetEnable { handle: 1, duration: Duration::from_millis(1280), max_events: 0 },
            AdvertisingSetEnable { handle: 2, duration: Duration::ZERO, max_events: 5 },
        ];
        exchange(
            &hci,
            hci.le_set_extended_advertising_enable(true, &sets),
            &complete_with(0x2039, &[]),
        ).await.unwrap();
        assert_eq!(transport.last_sent(), [
            0x39, 0x20, 0x0A,
            0x01, 0x02, // enable, two sets
            0x01, 0x02, // handles
            0x80, 0x00, 0x00, 0x00, // durations (128 and 0 slots of 10 ms)
            0x00, 0x05, // max events
        ]);
    }

    #[tokio::test]
    async fn extended_scan_parameters_layout() {
        let (hci, transport) = hci();
        let le_1m = ScanPhyParams {
            kind: ScanKind::Active,
            interval: Duration::from_millis(100),
            window: Duration::from_millis(50),
        };
        let le_coded = ScanPhyParams {
            kind: ScanKind::Passive,
            interval: Duration::from_millis(200),
            window: Duration::from_millis(100),
        };
        exchange(
            &hci,
            hci.le_set_extended_scan_parameters(
                OwnAddressKind::Public,
                ScanningFilterPolicy::All,
                Some(le_1m),
                Some(le_coded),
            ),
            &complete_with(0x2041, &[]),
        ).await.unwrap();
        assert_eq!(transport.last_sent(), [
            0x41, 0x20, 0x0D,
            0x00, 0x00, // own address kind, filter policy
            0x05, // LE 1M | LE Coded
            0x01, 0x00, // scan kinds, 1M first
            0xA0, 0x00, 0x40, 0x01, // intervals
            0x50, 0x00, 0xA0, 0x00, // windows
        ]);
    }

    #[tokio::test]
    async fn scanning_without_a_phy_is_rejected() {
        let (hci, transport) = hci();
        let result = hci
            .le_set_extended_scan_parameters(OwnAddressKind::Public, ScanningFilterPolicy::All, None, None)
            .await;
        assert!(matches!(result, Err(Error::InvalidArguments(_))));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn extended_scan_enable_layout() {
        let (hci, transport) = hci();
        exchange(
            &hci,
            hci.le_set_extended_scan_enable(
                true,
                FilterDuplicates::Enabled,
                Duration::from_secs(10),
                Duration::ZERO,
            ),
            &complete_with(0x2042, &[]),
        ).await.unwrap();
        assert_eq!(transport.last_sent(), [
            0x42, 0x20, 0x06,
            0x01, 0x01,
            0xE8, 0x03, // 1000 slots of 10 ms
            0x00, 0x00,
        ]);
    }

    #[tokio::test]
    async fn connection_update_layout() {
        let (hci, transport) = hci();
        let link = LinkParams {
            interval_min: Duration::from_millis(30),
            interval_max: Duration::from_millis(50),
            latency: 4,
            supervision_timeout: Duration::from_secs(1),
            min_ce_length: Duration::ZERO,
            max_ce_length: Duration::ZERO,
        };
        exchange(
            &hci,
            hci.le_connection_update(0x0040, &link),
            &complete_with(0x2013, &[]),
        ).await.unwrap();
        assert_eq!(transport.last_sent(), [
            0x13, 0x20, 0x0E,
            0x40, 0x00, // handle
            0x18, 0x00, // interval min: 24 slots of 1.25 ms
            0x28, 0x00, // interval max: 40 slots
            0x04, 0x00, // latency
            0x64, 0x00, // supervision timeout: 100 slots of 10 ms
            0x00, 0x00, 0x00, 0x00,
        ]);
    }

    #[tokio::test]
    async fn create_connection_layout() {
        let (hci, transport) = hci();
        let params = ConnectionParams {
            scan_interval: Duration::from_millis(60),
            scan_window: Duration::from_millis(30),
            filter_policy: InitiatorFilterPolicy::PeerAddress,
            peer_addr_kind: AddressKind::Random,
            peer_addr: BdAddr::new([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]),
            own_addr_kind: OwnAddressKind::Public,
            link: LinkParams {
                interval_min: Duration::from_millis(30),
                interval_max: Duration::from_millis(50),
                latency: 0,
                supervision_timeout: Duration::from_secs(5),
                min_ce_length: Duration::ZERO,
                max_ce_length: Duration::ZERO,
            },
        };
        exchange(
            &hci,
            hci.le_create_connection(&params),
            &complete_with(0x200D, &[]),
        ).await.unwrap();
        assert_eq!(transport.last_sent(), [
            0x0D, 0x20, 0x19,
            0x60, 0x00, // scan interval: 96 slots
            0x30, 0x00, // scan window: 48 slots
            0x00, // use the peer address
            0x01, // random peer address
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
            0x00, // own address: public
            0x18, 0x00, 0x28, 0x00, 0x00, 0x00, 0xF4, 0x01, 0x00, 0x00, 0x00, 0x00,
        ]);
    }

    #[tokio::test]
    async fn encrypt_reverses_blocks() {
        let (hci, transport) = hci();
        let key: [u8; 16] = core::array::from_fn(|i| i as u8);
        let plaintext = [0xAA; 16];
        let ciphertext_wire: Vec<u8> = (0x40..0x50).collect();
        let result = exchange(
            &hci,
            hci.le_encrypt(&key, &plaintext),
            &complete_with(0x2017, &ciphertext_wire),
        ).await.unwrap();
        let sent = transport.last_sent();
        assert_eq!(&sent[..3], &[0x17, 0x20, 0x20]);
        let reversed_key: Vec<u8> = key.iter().rev().copied().collect();
        assert_eq!(&sent[3..19], &reversed_key[..]);
        assert_eq!(&sent[19..35], &[0xAA; 16]);
        let expected: Vec<u8> = (0x40..0x50).rev().collect();
        assert_eq!(&result[..], &expected[..]);
    }

    #[tokio::test]
    async fn le_read_buffer_size_v2_return() {
        let (hci, _) = hci();
        let sizes = exchange(
            &hci,
            hci.le_read_buffer_size_v2(),
            &complete_with(0x2060, &[0xFB, 0x00, 0x08, 0x48, 0x00, 0x04]),
        ).await.unwrap();
        assert_eq!(sizes.acl_data_packet_length, 0x00FB);
        assert_eq!(sizes.total_num_acl_data_packets, 8);
        assert_eq!(sizes.iso_data_packet_length, 0x0048);
        assert_eq!(sizes.total_num_iso_data_packets, 4);
    }
}
