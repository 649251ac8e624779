//! Cisco Discovery Protocol.
//!
//! The header is version/ttl/checksum followed by TLVs. Known TLV types are
//! decoded into typed fields eagerly; unrecognized types are preserved raw.
//! The protocol-hello TLV has its own 32-byte inner layout and is only
//! interpreted on demand through [`CdpView::hello`].

use std::net::{IpAddr, Ipv6Addr};

use smallvec::SmallVec;

use crate::error::LayerError;
use crate::layer::{ByteRange, LayerFields, LayerView};
use crate::layers::ethernet::ipv4_at;
use crate::packet::DecodeContext;
use crate::registry::NextLayer;
use crate::tlv::{CdpTlvLayout, RawRecord, TlvIter};

const TLV_DEVICE_ID: u16 = 0x01;
const TLV_ADDRESSES: u16 = 0x02;
const TLV_PORT_ID: u16 = 0x03;
const TLV_CAPABILITIES: u16 = 0x04;
const TLV_SOFTWARE_VERSION: u16 = 0x05;
const TLV_PLATFORM: u16 = 0x06;
const TLV_HELLO: u16 = 0x08;
const TLV_VTP_DOMAIN: u16 = 0x09;
const TLV_NATIVE_VLAN: u16 = 0x0a;
const TLV_DUPLEX: u16 = 0x0b;
const TLV_MGMT_ADDRESSES: u16 = 0x16;

/// NLPID marking an IPv4 address in an address record.
const NLPID_IPV4: u8 = 0xcc;

/// 802.2 SNAP protocol bytes carrying the IPv6 EtherType.
const SNAP_IPV6: [u8; 8] = [0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00, 0x86, 0xdd];

/// Device capability bits from the capabilities TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CdpCapabilities(pub u32);

impl CdpCapabilities {
    pub fn l3_routing(&self) -> bool {
        self.0 & 0x01 != 0
    }
    pub fn transparent_bridging(&self) -> bool {
        self.0 & 0x02 != 0
    }
    pub fn source_route_bridging(&self) -> bool {
        self.0 & 0x04 != 0
    }
    pub fn l2_switching(&self) -> bool {
        self.0 & 0x08 != 0
    }
    pub fn host(&self) -> bool {
        self.0 & 0x10 != 0
    }
    pub fn igmp(&self) -> bool {
        self.0 & 0x20 != 0
    }
    pub fn repeater(&self) -> bool {
        self.0 & 0x40 != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdpFields {
    pub version: u8,
    pub ttl: u8,
    pub checksum: u16,
    pub device_id: Option<ByteRange>,
    pub addresses: SmallVec<[IpAddr; 2]>,
    pub port_id: Option<ByteRange>,
    pub capabilities: CdpCapabilities,
    pub software_version: Option<ByteRange>,
    pub platform: Option<ByteRange>,
    /// Raw protocol-hello value, decoded on demand.
    pub hello: Option<ByteRange>,
    pub vtp_domain: Option<ByteRange>,
    pub native_vlan: Option<u16>,
    pub full_duplex: Option<bool>,
    pub mgmt_addresses: SmallVec<[IpAddr; 2]>,
    /// TLVs of types this decoder does not understand, kept raw.
    pub unknown: SmallVec<[RawRecord; 4]>,
}

/// Inner layout of the protocol-hello TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdpHello {
    pub oui: [u8; 3],
    pub protocol_id: u16,
    pub cluster_master: [u8; 4],
    pub unknown1: [u8; 4],
    pub version: u8,
    pub sub_version: u8,
    pub status: u8,
    pub unknown2: u8,
    pub cluster_commander: [u8; 6],
    pub switch_mac: [u8; 6],
    pub unknown3: u8,
    pub management_vlan: u16,
}

const HELLO_LEN: usize = 32;

/// Addresses TLV body: a count followed by per-address protocol records.
/// NLPID IPv4 and 802.2-encapsulated IPv6 records are materialized; other
/// families are skipped. Returns `None` when the nesting itself is malformed.
fn parse_addresses(value: &[u8]) -> Option<SmallVec<[IpAddr; 2]>> {
    if value.len() < 4 {
        return None;
    }
    let count = u32::from_be_bytes([value[0], value[1], value[2], value[3]]) as usize;
    let mut out = SmallVec::new();
    let mut i = 4;
    for _ in 0..count {
        if i + 2 > value.len() {
            return None;
        }
        let proto_type = value[i];
        let proto_len = value[i + 1] as usize;
        i += 2;
        if i + proto_len + 2 > value.len() {
            return None;
        }
        let proto = &value[i..i + proto_len];
        i += proto_len;
        let addr_len = u16::from_be_bytes([value[i], value[i + 1]]) as usize;
        i += 2;
        if i + addr_len > value.len() {
            return None;
        }
        if proto_type == 1 && proto_len == 1 && proto[0] == NLPID_IPV4 && addr_len == 4 {
            out.push(IpAddr::V4(ipv4_at(&value[i..i + 4])));
        } else if proto_type == 2 && proto == SNAP_IPV6 && addr_len == 16 {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&value[i..i + 16]);
            out.push(IpAddr::V6(Ipv6Addr::from(octets)));
        }
        i += addr_len;
    }
    Some(out)
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    let base = ctx.offset();
    if rest.len() < 4 {
        return Err(LayerError::too_short("CDP", 4, rest.len()));
    }
    let version = rest[0];
    if version != 1 && version != 2 {
        return Err(LayerError::invalid(
            "CDP",
            "version",
            format!("unknown version {version}"),
        ));
    }

    let mut fields = CdpFields {
        version,
        ttl: rest[1],
        checksum: u16::from_be_bytes([rest[2], rest[3]]),
        device_id: None,
        addresses: SmallVec::new(),
        port_id: None,
        capabilities: CdpCapabilities::default(),
        software_version: None,
        platform: None,
        hello: None,
        vtp_domain: None,
        native_vlan: None,
        full_duplex: None,
        mgmt_addresses: SmallVec::new(),
        unknown: SmallVec::new(),
    };

    let mut iter = TlvIter::<CdpTlvLayout>::new(&rest[4..]);
    let tlv_base = base + 4;
    for tlv in iter.by_ref() {
        let range = || RawRecord::rebased(&tlv, tlv_base).value;
        match tlv.type_code {
            TLV_DEVICE_ID => fields.device_id = Some(range()),
            TLV_ADDRESSES => match parse_addresses(tlv.value) {
                Some(addrs) => fields.addresses = addrs,
                None => fields.unknown.push(RawRecord::rebased(&tlv, tlv_base)),
            },
            TLV_PORT_ID => fields.port_id = Some(range()),
            TLV_CAPABILITIES if tlv.value.len() >= 4 => {
                fields.capabilities = CdpCapabilities(u32::from_be_bytes([
                    tlv.value[0],
                    tlv.value[1],
                    tlv.value[2],
                    tlv.value[3],
                ]));
            }
            TLV_SOFTWARE_VERSION => fields.software_version = Some(range()),
            TLV_PLATFORM => fields.platform = Some(range()),
            TLV_HELLO => fields.hello = Some(range()),
            TLV_VTP_DOMAIN => fields.vtp_domain = Some(range()),
            TLV_NATIVE_VLAN if tlv.value.len() >= 2 => {
                fields.native_vlan = Some(u16::from_be_bytes([tlv.value[0], tlv.value[1]]));
            }
            TLV_DUPLEX if !tlv.value.is_empty() => {
                fields.full_duplex = Some(tlv.value[0] != 0);
            }
            TLV_MGMT_ADDRESSES => match parse_addresses(tlv.value) {
                Some(addrs) => fields.mgmt_addresses = addrs,
                None => fields.unknown.push(RawRecord::rebased(&tlv, tlv_base)),
            },
            _ => fields.unknown.push(RawRecord::rebased(&tlv, tlv_base)),
        }
    }
    if iter.malformed() {
        return Err(LayerError::invalid(
            "CDP",
            "tlv",
            "record length shorter than its header",
        ));
    }
    if iter.truncated() {
        ctx.mark_truncated();
    }

    ctx.push_terminal(LayerFields::Cdp(fields));
    Ok(NextLayer::Done)
}

/// Typed view of a CDP layer, resolving stored ranges to text and bytes.
#[derive(Clone, Copy)]
pub struct CdpView<'p, 'a> {
    view: LayerView<'p, 'a>,
    fields: &'p CdpFields,
}

impl<'p, 'a> CdpView<'p, 'a> {
    pub(crate) fn new(view: LayerView<'p, 'a>, fields: &'p CdpFields) -> Self {
        CdpView { view, fields }
    }

    pub fn fields(&self) -> &'p CdpFields {
        self.fields
    }

    fn text(&self, range: &Option<ByteRange>) -> Option<&'p str> {
        range.clone().and_then(|r| self.view.str_at(r))
    }

    pub fn device_id(&self) -> Option<&'p str> {
        self.text(&self.fields.device_id)
    }

    pub fn port_id(&self) -> Option<&'p str> {
        self.text(&self.fields.port_id)
    }

    pub fn software_version(&self) -> Option<&'p str> {
        self.text(&self.fields.software_version)
    }

    pub fn platform(&self) -> Option<&'p str> {
        self.text(&self.fields.platform)
    }

    pub fn vtp_domain(&self) -> Option<&'p str> {
        self.text(&self.fields.vtp_domain)
    }

    /// Decode the protocol-hello TLV, if the frame carried one.
    pub fn hello(&self) -> Result<Option<CdpHello>, LayerError> {
        let Some(range) = self.fields.hello.clone() else {
            return Ok(None);
        };
        let v = self.view.bytes_at(range);
        if v.len() != HELLO_LEN {
            return Err(LayerError::invalid(
                "CDP",
                "hello",
                format!("expected {HELLO_LEN} bytes, got {}", v.len()),
            ));
        }
        Ok(Some(CdpHello {
            oui: [v[0], v[1], v[2]],
            protocol_id: u16::from_be_bytes([v[3], v[4]]),
            cluster_master: [v[5], v[6], v[7], v[8]],
            unknown1: [v[9], v[10], v[11], v[12]],
            version: v[13],
            sub_version: v[14],
            status: v[15],
            unknown2: v[16],
            cluster_commander: [v[17], v[18], v[19], v[20], v[21], v[22]],
            switch_mac: [v[23], v[24], v[25], v[26], v[27], v[28]],
            unknown3: v[29],
            management_vlan: u16::from_be_bytes([v[30], v[31]]),
        }))
    }
}
