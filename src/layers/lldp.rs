//! Link Layer Discovery Protocol.
//!
//! Core TLVs decode eagerly into typed fields; organization-specific TLVs
//! (type 127) are collected raw and interpreted on demand per OUI through
//! [`LldpView::org_8021`] and [`LldpView::org_8023`]. The three mandatory
//! TLVs (chassis, port, TTL) must all be present or the layer is rejected.

use smallvec::SmallVec;

use crate::error::LayerError;
use crate::layer::{ByteRange, LayerFields, LayerView};
use crate::packet::DecodeContext;
use crate::registry::NextLayer;
use crate::tlv::{LldpTlvLayout, RawRecord, RawTlv, TlvIter};

const TLV_END: u16 = 0;
const TLV_CHASSIS_ID: u16 = 1;
const TLV_PORT_ID: u16 = 2;
const TLV_TTL: u16 = 3;
const TLV_PORT_DESCRIPTION: u16 = 4;
const TLV_SYSTEM_NAME: u16 = 5;
const TLV_SYSTEM_DESCRIPTION: u16 = 6;
const TLV_CAPABILITIES: u16 = 7;
const TLV_MGMT_ADDRESS: u16 = 8;
const TLV_ORG_SPECIFIC: u16 = 127;

/// IEEE 802.1 organizationally specific OUI.
pub const OUI_8021: u32 = 0x0080c2;
/// IEEE 802.3 organizationally specific OUI.
pub const OUI_8023: u32 = 0x00120f;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LldpChassisId {
    pub subtype: u8,
    pub id: ByteRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LldpPortId {
    pub subtype: u8,
    pub id: ByteRange,
}

/// System capability bit field (same layout for capable and enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LldpCapabilityBits(pub u16);

impl LldpCapabilityBits {
    pub fn other(&self) -> bool {
        self.0 & 0x01 != 0
    }
    pub fn repeater(&self) -> bool {
        self.0 & 0x02 != 0
    }
    pub fn bridge(&self) -> bool {
        self.0 & 0x04 != 0
    }
    pub fn wlan_access_point(&self) -> bool {
        self.0 & 0x08 != 0
    }
    pub fn router(&self) -> bool {
        self.0 & 0x10 != 0
    }
    pub fn telephone(&self) -> bool {
        self.0 & 0x20 != 0
    }
    pub fn docsis(&self) -> bool {
        self.0 & 0x40 != 0
    }
    pub fn station_only(&self) -> bool {
        self.0 & 0x80 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LldpCapabilities {
    pub system: LldpCapabilityBits,
    pub enabled: LldpCapabilityBits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LldpMgmtAddress {
    pub family: u8,
    pub address: ByteRange,
    pub interface_subtype: u8,
    pub interface_number: u32,
    pub oid: ByteRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LldpOrgTlv {
    pub oui: u32,
    pub subtype: u8,
    pub info: ByteRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LldpFields {
    pub chassis_id: LldpChassisId,
    pub port_id: LldpPortId,
    pub ttl: u16,
    pub port_description: Option<ByteRange>,
    pub system_name: Option<ByteRange>,
    pub system_description: Option<ByteRange>,
    pub capabilities: Option<LldpCapabilities>,
    pub mgmt_address: Option<LldpMgmtAddress>,
    /// Organization-specific TLVs in wire order, decoded on demand.
    pub org_tlvs: SmallVec<[LldpOrgTlv; 8]>,
    pub unknown: SmallVec<[RawRecord; 4]>,
}

fn mgmt_address(value: &[u8], base: usize) -> Option<LldpMgmtAddress> {
    if value.len() < 2 {
        return None;
    }
    let addr_len = value[0] as usize; // counts the family byte
    if addr_len < 1 || 1 + addr_len + 6 > value.len() {
        return None;
    }
    let family = value[1];
    let addr_start = 2;
    let addr_end = 1 + addr_len;
    let i = addr_end;
    let interface_subtype = value[i];
    let interface_number =
        u32::from_be_bytes([value[i + 1], value[i + 2], value[i + 3], value[i + 4]]);
    let oid_len = value[i + 5] as usize;
    if i + 6 + oid_len > value.len() {
        return None;
    }
    Some(LldpMgmtAddress {
        family,
        address: base + addr_start..base + addr_end,
        interface_subtype,
        interface_number,
        oid: base + i + 6..base + i + 6 + oid_len,
    })
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    let base = ctx.offset();

    let mut chassis_id = None;
    let mut port_id = None;
    let mut ttl = None;
    let mut port_description = None;
    let mut system_name = None;
    let mut system_description = None;
    let mut capabilities = None;
    let mut mgmt = None;
    let mut org_tlvs = SmallVec::new();
    let mut unknown = SmallVec::<[RawRecord; 4]>::new();

    let value_range = |tlv: &RawTlv<'_>| RawRecord::rebased(tlv, base).value;

    let mut iter = TlvIter::<LldpTlvLayout>::new(rest);
    for tlv in iter.by_ref() {
        match tlv.type_code {
            TLV_END => break,
            TLV_CHASSIS_ID if !tlv.value.is_empty() => {
                let mut id = value_range(&tlv);
                id.start += 1;
                chassis_id = Some(LldpChassisId {
                    subtype: tlv.value[0],
                    id,
                });
            }
            TLV_PORT_ID if !tlv.value.is_empty() => {
                let mut id = value_range(&tlv);
                id.start += 1;
                port_id = Some(LldpPortId {
                    subtype: tlv.value[0],
                    id,
                });
            }
            TLV_TTL if tlv.value.len() >= 2 => {
                ttl = Some(u16::from_be_bytes([tlv.value[0], tlv.value[1]]));
            }
            TLV_PORT_DESCRIPTION => port_description = Some(value_range(&tlv)),
            TLV_SYSTEM_NAME => system_name = Some(value_range(&tlv)),
            TLV_SYSTEM_DESCRIPTION => system_description = Some(value_range(&tlv)),
            TLV_CAPABILITIES if tlv.value.len() >= 4 => {
                capabilities = Some(LldpCapabilities {
                    system: LldpCapabilityBits(u16::from_be_bytes([tlv.value[0], tlv.value[1]])),
                    enabled: LldpCapabilityBits(u16::from_be_bytes([tlv.value[2], tlv.value[3]])),
                });
            }
            TLV_MGMT_ADDRESS => {
                let value_base = value_range(&tlv).start;
                match mgmt_address(tlv.value, value_base) {
                    Some(m) => mgmt = Some(m),
                    None => unknown.push(RawRecord::rebased(&tlv, base)),
                }
            }
            TLV_ORG_SPECIFIC if tlv.value.len() >= 4 => {
                let mut info = value_range(&tlv);
                info.start += 4;
                org_tlvs.push(LldpOrgTlv {
                    oui: u32::from_be_bytes([0, tlv.value[0], tlv.value[1], tlv.value[2]]),
                    subtype: tlv.value[3],
                    info,
                });
            }
            _ => unknown.push(RawRecord::rebased(&tlv, base)),
        }
    }
    if iter.malformed() {
        return Err(LayerError::invalid(
            "LLDP",
            "tlv",
            "record header is structurally invalid",
        ));
    }
    if iter.truncated() {
        ctx.mark_truncated();
    }

    let (Some(chassis_id), Some(port_id), Some(ttl)) = (chassis_id, port_id, ttl) else {
        return Err(LayerError::invalid(
            "LLDP",
            "tlv",
            "missing a mandatory chassis, port, or TTL TLV",
        ));
    };

    let fields = LldpFields {
        chassis_id,
        port_id,
        ttl,
        port_description,
        system_name,
        system_description,
        capabilities,
        mgmt_address: mgmt,
        org_tlvs,
        unknown,
    };
    ctx.push_terminal(LayerFields::Lldp(fields));
    Ok(NextLayer::Done)
}

/// One port-and-protocol VLAN id record (802.1 subtype 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LldpPpvid {
    pub supported: bool,
    pub enabled: bool,
    pub id: u16,
}

/// One VLAN name record (802.1 subtype 3).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LldpVlanName {
    pub id: u16,
    pub name: String,
}

/// 802.1 organizationally specific info, zero-valued where absent.
/// PPVID and VLAN-name records repeat on the wire and are kept in
/// encounter order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LldpInfo8021 {
    pub pvid: u16,
    pub ppvids: SmallVec<[LldpPpvid; 2]>,
    pub vlan_names: SmallVec<[LldpVlanName; 2]>,
    pub management_vid: u16,
    pub link_aggregation: LldpLinkAggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LldpMacPhy {
    pub auto_negotiation_supported: bool,
    pub auto_negotiation_enabled: bool,
    pub advertised: u16,
    pub mau_type: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LldpPowerViaMdi {
    pub port_class_pse: bool,
    pub pse_supported: bool,
    pub pse_enabled: bool,
    pub pse_pairs_selectable: bool,
    pub power_pair: u8,
    pub power_class: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LldpLinkAggregation {
    pub supported: bool,
    pub enabled: bool,
    pub port_id: u32,
}

/// 802.3 organizationally specific info, zero-valued where absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LldpInfo8023 {
    pub mac_phy: LldpMacPhy,
    pub power_via_mdi: LldpPowerViaMdi,
    pub link_aggregation: LldpLinkAggregation,
    pub mtu: u16,
}

const SUBTYPE_8021_PVID: u8 = 1;
const SUBTYPE_8021_PPVID: u8 = 2;
const SUBTYPE_8021_VLAN_NAME: u8 = 3;
const SUBTYPE_8021_MGMT_VID: u8 = 6;
const SUBTYPE_8021_LINK_AGG: u8 = 7;

const SUBTYPE_8023_MAC_PHY: u8 = 1;
const SUBTYPE_8023_POWER: u8 = 2;
const SUBTYPE_8023_LINK_AGG: u8 = 3;
const SUBTYPE_8023_MTU: u8 = 4;

/// Typed view of an LLDP layer with org-specific secondary decoding.
#[derive(Clone, Copy)]
pub struct LldpView<'p, 'a> {
    view: LayerView<'p, 'a>,
    fields: &'p LldpFields,
}

impl<'p, 'a> LldpView<'p, 'a> {
    pub(crate) fn new(view: LayerView<'p, 'a>, fields: &'p LldpFields) -> Self {
        LldpView { view, fields }
    }

    pub fn fields(&self) -> &'p LldpFields {
        self.fields
    }

    pub fn chassis_id(&self) -> &'p [u8] {
        self.view.bytes_at(self.fields.chassis_id.id.clone())
    }

    pub fn port_id(&self) -> &'p [u8] {
        self.view.bytes_at(self.fields.port_id.id.clone())
    }

    pub fn system_name(&self) -> Option<&'p str> {
        self.fields
            .system_name
            .clone()
            .and_then(|r| self.view.str_at(r))
    }

    pub fn port_description(&self) -> Option<&'p str> {
        self.fields
            .port_description
            .clone()
            .and_then(|r| self.view.str_at(r))
    }

    fn org_values(&self, oui: u32) -> impl Iterator<Item = (u8, &'p [u8])> + '_ {
        self.fields
            .org_tlvs
            .iter()
            .filter(move |t| t.oui == oui)
            .map(|t| (t.subtype, self.view.bytes_at(t.info.clone())))
    }

    /// Decode the IEEE 802.1 org-specific TLVs.
    pub fn org_8021(&self) -> Result<LldpInfo8021, LayerError> {
        let mut info = LldpInfo8021::default();
        for (subtype, v) in self.org_values(OUI_8021) {
            match subtype {
                SUBTYPE_8021_PVID => {
                    if v.len() < 2 {
                        return Err(LayerError::invalid("LLDP", "pvid", "value too short"));
                    }
                    info.pvid = u16::from_be_bytes([v[0], v[1]]);
                }
                SUBTYPE_8021_PPVID => {
                    if v.len() < 3 {
                        return Err(LayerError::invalid("LLDP", "ppvid", "value too short"));
                    }
                    info.ppvids.push(LldpPpvid {
                        supported: v[0] & 0x02 != 0,
                        enabled: v[0] & 0x04 != 0,
                        id: u16::from_be_bytes([v[1], v[2]]),
                    });
                }
                SUBTYPE_8021_VLAN_NAME => {
                    if v.len() < 3 || 3 + v[2] as usize > v.len() {
                        return Err(LayerError::invalid("LLDP", "vlan_name", "value too short"));
                    }
                    info.vlan_names.push(LldpVlanName {
                        id: u16::from_be_bytes([v[0], v[1]]),
                        name: String::from_utf8_lossy(&v[3..3 + v[2] as usize]).into_owned(),
                    });
                }
                SUBTYPE_8021_MGMT_VID => {
                    if v.len() < 2 {
                        return Err(LayerError::invalid("LLDP", "mgmt_vid", "value too short"));
                    }
                    info.management_vid = u16::from_be_bytes([v[0], v[1]]);
                }
                SUBTYPE_8021_LINK_AGG => {
                    if v.len() < 5 {
                        return Err(LayerError::invalid("LLDP", "link_agg", "value too short"));
                    }
                    info.link_aggregation = LldpLinkAggregation {
                        supported: v[0] & 0x01 != 0,
                        enabled: v[0] & 0x02 != 0,
                        port_id: u32::from_be_bytes([v[1], v[2], v[3], v[4]]),
                    };
                }
                _ => {}
            }
        }
        Ok(info)
    }

    /// Decode the IEEE 802.3 org-specific TLVs.
    pub fn org_8023(&self) -> Result<LldpInfo8023, LayerError> {
        let mut info = LldpInfo8023::default();
        for (subtype, v) in self.org_values(OUI_8023) {
            match subtype {
                SUBTYPE_8023_MAC_PHY => {
                    if v.len() < 5 {
                        return Err(LayerError::invalid("LLDP", "mac_phy", "value too short"));
                    }
                    info.mac_phy = LldpMacPhy {
                        auto_negotiation_supported: v[0] & 0x01 != 0,
                        auto_negotiation_enabled: v[0] & 0x02 != 0,
                        advertised: u16::from_be_bytes([v[1], v[2]]),
                        mau_type: u16::from_be_bytes([v[3], v[4]]),
                    };
                }
                SUBTYPE_8023_POWER => {
                    if v.len() < 3 {
                        return Err(LayerError::invalid("LLDP", "power", "value too short"));
                    }
                    info.power_via_mdi = LldpPowerViaMdi {
                        port_class_pse: v[0] & 0x01 != 0,
                        pse_supported: v[0] & 0x02 != 0,
                        pse_enabled: v[0] & 0x04 != 0,
                        pse_pairs_selectable: v[0] & 0x08 != 0,
                        power_pair: v[1],
                        power_class: v[2],
                    };
                }
                SUBTYPE_8023_LINK_AGG => {
                    if v.len() < 5 {
                        return Err(LayerError::invalid("LLDP", "link_agg", "value too short"));
                    }
                    info.link_aggregation = LldpLinkAggregation {
                        supported: v[0] & 0x01 != 0,
                        enabled: v[0] & 0x02 != 0,
                        port_id: u32::from_be_bytes([v[1], v[2], v[3], v[4]]),
                    };
                }
                SUBTYPE_8023_MTU => {
                    if v.len() < 2 {
                        return Err(LayerError::invalid("LLDP", "mtu", "value too short"));
                    }
                    info.mtu = u16::from_be_bytes([v[0], v[1]]);
                }
                _ => {}
            }
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_bits() {
        let bits = LldpCapabilityBits(0x14);
        assert!(bits.bridge());
        assert!(bits.router());
        assert!(!bits.repeater());
        assert!(!bits.station_only());
    }

    #[test]
    fn mgmt_address_layout() {
        // addr_len 5 (family + 4 addr bytes), family 1 (IPv4), subtype 2,
        // ifindex 1001, no OID
        let value = [5, 1, 10, 0, 0, 1, 2, 0, 0, 0x03, 0xe9, 0];
        let m = mgmt_address(&value, 100).unwrap();
        assert_eq!(m.family, 1);
        assert_eq!(m.address, 102..106);
        assert_eq!(m.interface_subtype, 2);
        assert_eq!(m.interface_number, 1001);
        assert_eq!(m.oid, 112..112);
    }

    #[test]
    fn mgmt_address_rejects_short_values() {
        assert!(mgmt_address(&[5, 1, 10, 0], 0).is_none());
        assert!(mgmt_address(&[], 0).is_none());
    }
}
