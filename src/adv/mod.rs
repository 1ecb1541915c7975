//! Advertising-data parsing ([Vol 3] Part C, Section 11).
//!
//! Advertising payloads are a concatenation of length-type-value records.
//! The parser is total: zero-length records and records whose declared
//! length runs past the buffer are skipped, unknown AD types are ignored,
//! and no input can make it read out of bounds.

use bytes::Bytes;

use crate::hci::consts::CompanyId;
use crate::uuid::{PackedUuid, Uuid};

// AD type assigned numbers ([Assigned Numbers] Section 2.3).
mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const INCOMPLETE_UUID16: u8 = 0x02;
    pub const COMPLETE_UUID16: u8 = 0x03;
    pub const INCOMPLETE_UUID32: u8 = 0x04;
    pub const COMPLETE_UUID32: u8 = 0x05;
    pub const INCOMPLETE_UUID128: u8 = 0x06;
    pub const COMPLETE_UUID128: u8 = 0x07;
    pub const SHORTENED_LOCAL_NAME: u8 = 0x08;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
    pub const TX_POWER_LEVEL: u8 = 0x0A;
    pub const SOLICIT_UUID16: u8 = 0x14;
    pub const SOLICIT_UUID128: u8 = 0x15;
    pub const SERVICE_DATA_UUID16: u8 = 0x16;
    pub const SOLICIT_UUID32: u8 = 0x1F;
    pub const SERVICE_DATA_UUID32: u8 = 0x20;
    pub const SERVICE_DATA_UUID128: u8 = 0x21;
    pub const MANUFACTURER_SPECIFIC: u8 = 0xFF;
}

/// Structured view of one advertising payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvData {
    pub flags: Option<u8>,
    /// Advertised service class UUIDs, merged across all list records,
    /// deduplicated in first-seen order.
    pub services: Vec<Uuid>,
    /// Services the advertiser solicits from peers.
    pub solicited_services: Vec<Uuid>,
    /// Complete local name if one was present, otherwise the shortened one.
    pub local_name: Option<String>,
    pub tx_power_level: Option<i8>,
    pub service_data: Vec<(Uuid, Bytes)>,
    pub manufacturer_data: Option<(CompanyId, Bytes)>,
}

impl AdvData {

    pub fn parse(data: &[u8]) -> Self {
        let mut adv = AdvData::default();
        let mut complete_name = false;
        let mut offset = 0;
        while let Some(&len) = data.get(offset) {
            offset += 1;
            if len == 0 {
                continue;
            }
            let Some(record) = data.get(offset..offset + len as usize) else {
                break;
            };
            offset += len as usize;
            let Some((&kind, value)) = record.split_first() else {
                continue;
            };
            match kind {
                ad_type::FLAGS => {
                    if let Some(&flags) = value.first() {
                        adv.flags.get_or_insert(flags);
                    }
                }
                ad_type::INCOMPLETE_UUID16 | ad_type::COMPLETE_UUID16 =>
                    merge_uuids(&mut adv.services, value, 2),
                ad_type::INCOMPLETE_UUID32 | ad_type::COMPLETE_UUID32 =>
                    merge_uuids(&mut adv.services, value, 4),
                ad_type::INCOMPLETE_UUID128 | ad_type::COMPLETE_UUID128 =>
                    merge_uuids(&mut adv.services, value, 16),
                ad_type::SOLICIT_UUID16 =>
                    merge_uuids(&mut adv.solicited_services, value, 2),
                ad_type::SOLICIT_UUID32 =>
                    merge_uuids(&mut adv.solicited_services, value, 4),
                ad_type::SOLICIT_UUID128 =>
                    merge_uuids(&mut adv.solicited_services, value, 16),
                ad_type::SHORTENED_LOCAL_NAME => {
                    if !complete_name && adv.local_name.is_none() {
                        if let Ok(name) = std::str::from_utf8(value) {
                            adv.local_name = Some(name.to_owned());
                        }
                    }
                }
                ad_type::COMPLETE_LOCAL_NAME => {
                    if !complete_name {
                        if let Ok(name) = std::str::from_utf8(value) {
                            adv.local_name = Some(name.to_owned());
                            complete_name = true;
                        }
                    }
                }
                ad_type::TX_POWER_LEVEL => {
                    if let Some(&level) = value.first() {
                        adv.tx_power_level.get_or_insert(level as i8);
                    }
                }
                ad_type::SERVICE_DATA_UUID16 =>
                    push_service_data(&mut adv.service_data, value, 2),
                ad_type::SERVICE_DATA_UUID32 =>
                    push_service_data(&mut adv.service_data, value, 4),
                ad_type::SERVICE_DATA_UUID128 =>
                    push_service_data(&mut adv.service_data, value, 16),
                ad_type::MANUFACTURER_SPECIFIC => {
                    if adv.manufacturer_data.is_none() {
                        if let Some((ident, payload)) = value.split_first_chunk() {
                            adv.manufacturer_data = Some((
                                CompanyId(u16::from_le_bytes(*ident)),
                                Bytes::copy_from_slice(payload),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
        adv
    }

}

fn merge_uuids(list: &mut Vec<Uuid>, value: &[u8], width: usize) {
    for chunk in value.chunks_exact(width) {
        if let Some(uuid) = PackedUuid::from_le_slice(chunk).map(Uuid::from) {
            if !list.contains(&uuid) {
                list.push(uuid);
            }
        }
    }
}

fn push_service_data(list: &mut Vec<(Uuid, Bytes)>, value: &[u8], width: usize) {
    if value.len() < width {
        return;
    }
    let (uuid, payload) = value.split_at(width);
    if let Some(uuid) = PackedUuid::from_le_slice(uuid).map(Uuid::from) {
        list.push((uuid, Bytes::copy_from_slice(payload)));
    }
}
