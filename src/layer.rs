//! Layer identity, categories, and decoded-layer records.
//!
//! A [`LayerType`] is a small integer naming one protocol; the registry is
//! indexed by it. Builtin assignments live in [`types`]; applications
//! register their own from [`USER_BASE`] upward.
//!
//! Decoded layers are stored as [`DecodedLayer`] records whose variable-size
//! slices (contents, payload, options) are byte ranges into the packet's
//! backing buffer rather than borrowed slices. That keeps the records
//! self-contained across copy and no-copy buffers; [`LayerView`] resolves
//! the ranges back to bytes on demand.

use std::fmt;
use std::ops::Range;

use smallvec::SmallVec;

use crate::error::LayerError;
use crate::flow::Flow;
use crate::layers::cdp::{CdpFields, CdpView};
use crate::layers::ethernet::EthernetFields;
use crate::layers::ipv4::Ipv4Fields;
use crate::layers::ipv6::{Ipv6Fields, Ipv6HopByHopFields};
use crate::layers::llc::{LlcFields, SnapFields};
use crate::layers::lldp::{LldpFields, LldpView};
use crate::layers::sctp::SctpFields;
use crate::layers::tcp::TcpFields;
use crate::layers::udp::UdpFields;
use crate::layers::vlan::Dot1QFields;
use crate::packet::Packet;

/// Identifies one protocol layer. Values below [`USER_BASE`] are reserved
/// for builtins; applications allocate from `USER_BASE` upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerType(pub u16);

/// First layer-type value available to applications.
pub const USER_BASE: LayerType = LayerType(1000);

/// Builtin layer-type assignments.
pub mod types {
    use super::LayerType;

    /// Opaque remaining bytes, always a terminal layer.
    pub const PAYLOAD: LayerType = LayerType(1);
    /// Terminal layer carrying a decoder fault plus the bytes it rejected.
    pub const DECODE_FAILURE: LayerType = LayerType(2);
    pub const ETHERNET: LayerType = LayerType(3);
    pub const DOT1Q: LayerType = LayerType(4);
    pub const LLC: LayerType = LayerType(5);
    pub const SNAP: LayerType = LayerType(6);
    pub const IPV4: LayerType = LayerType(7);
    pub const IPV6: LayerType = LayerType(8);
    pub const IPV6_HOP_BY_HOP: LayerType = LayerType(9);
    pub const TCP: LayerType = LayerType(10);
    pub const UDP: LayerType = LayerType(11);
    pub const SCTP: LayerType = LayerType(12);
    pub const CDP: LayerType = LayerType(13);
    pub const LLDP: LayerType = LayerType(14);
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            types::PAYLOAD => "Payload",
            types::DECODE_FAILURE => "DecodeFailure",
            types::ETHERNET => "Ethernet",
            types::DOT1Q => "Dot1Q",
            types::LLC => "LLC",
            types::SNAP => "SNAP",
            types::IPV4 => "IPv4",
            types::IPV6 => "IPv6",
            types::IPV6_HOP_BY_HOP => "IPv6HopByHop",
            types::TCP => "TCP",
            types::UDP => "UDP",
            types::SCTP => "SCTP",
            types::CDP => "CDP",
            types::LLDP => "LLDP",
            LayerType(n) => return write!(f, "LayerType({n})"),
        };
        f.write_str(name)
    }
}

/// Functional role a layer plays in the stack. At most one layer per packet
/// is designated per category; when tunneling repeats a category, the
/// innermost (last decoded) layer wins the designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerCategory {
    Link,
    Network,
    Transport,
    Application,
}

/// A set of layer types, for "is this one of..." queries.
#[derive(Debug, Clone, Default)]
pub struct LayerClass(SmallVec<[LayerType; 8]>);

impl LayerClass {
    pub fn new(members: impl IntoIterator<Item = LayerType>) -> Self {
        LayerClass(members.into_iter().collect())
    }

    pub fn contains(&self, t: LayerType) -> bool {
        self.0.contains(&t)
    }

    pub fn types(&self) -> &[LayerType] {
        &self.0
    }
}

impl FromIterator<LayerType> for LayerClass {
    fn from_iter<I: IntoIterator<Item = LayerType>>(iter: I) -> Self {
        LayerClass(iter.into_iter().collect())
    }
}

/// A byte range into the packet's backing buffer.
pub type ByteRange = Range<usize>;

/// Fault record carried by a decode-failure layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailureFields {
    /// What the failing decoder reported.
    pub error: LayerError,
}

/// Identity of an application-registered layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomFields {
    pub layer_type: LayerType,
    pub category: Option<LayerCategory>,
}

/// Typed fields of one decoded layer.
///
/// Fixed-size values (addresses, ports, flags) are stored by value, so field
/// structs compare equal across decode modes; variable-size data stays in
/// the packet buffer as [`ByteRange`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerFields {
    Ethernet(EthernetFields),
    Dot1Q(Dot1QFields),
    Llc(LlcFields),
    Snap(SnapFields),
    Ipv4(Ipv4Fields),
    Ipv6(Ipv6Fields),
    Ipv6HopByHop(Ipv6HopByHopFields),
    Tcp(TcpFields),
    Udp(UdpFields),
    Sctp(SctpFields),
    Cdp(CdpFields),
    Lldp(LldpFields),
    Payload,
    DecodeFailure(DecodeFailureFields),
    Custom(CustomFields),
}

impl LayerFields {
    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerFields::Ethernet(_) => types::ETHERNET,
            LayerFields::Dot1Q(_) => types::DOT1Q,
            LayerFields::Llc(_) => types::LLC,
            LayerFields::Snap(_) => types::SNAP,
            LayerFields::Ipv4(_) => types::IPV4,
            LayerFields::Ipv6(_) => types::IPV6,
            LayerFields::Ipv6HopByHop(_) => types::IPV6_HOP_BY_HOP,
            LayerFields::Tcp(_) => types::TCP,
            LayerFields::Udp(_) => types::UDP,
            LayerFields::Sctp(_) => types::SCTP,
            LayerFields::Cdp(_) => types::CDP,
            LayerFields::Lldp(_) => types::LLDP,
            LayerFields::Payload => types::PAYLOAD,
            LayerFields::DecodeFailure(_) => types::DECODE_FAILURE,
            LayerFields::Custom(c) => c.layer_type,
        }
    }

    /// The category this layer is designated under, if any.
    pub fn category(&self) -> Option<LayerCategory> {
        match self {
            LayerFields::Ethernet(_) => Some(LayerCategory::Link),
            LayerFields::Ipv4(_) | LayerFields::Ipv6(_) => Some(LayerCategory::Network),
            LayerFields::Tcp(_) | LayerFields::Udp(_) | LayerFields::Sctp(_) => {
                Some(LayerCategory::Transport)
            }
            LayerFields::Payload => Some(LayerCategory::Application),
            LayerFields::Custom(c) => c.category,
            _ => None,
        }
    }

    /// The flow this layer defines, if it carries addressing.
    pub fn flow(&self) -> Option<Flow> {
        match self {
            LayerFields::Ethernet(f) => Some(f.flow()),
            LayerFields::Ipv4(f) => Some(f.flow()),
            LayerFields::Ipv6(f) => Some(f.flow()),
            LayerFields::Tcp(f) => Some(f.flow()),
            LayerFields::Udp(f) => Some(f.flow()),
            LayerFields::Sctp(f) => Some(f.flow()),
            _ => None,
        }
    }
}

/// One decoded layer: its type, its byte extents, and its typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLayer {
    pub layer_type: LayerType,
    /// Bytes of this layer's own header (or the whole layer for terminals).
    pub contents: ByteRange,
    /// Bytes this layer hands to the next decoder.
    pub payload: ByteRange,
    pub fields: LayerFields,
}

/// A borrowed view of one decoded layer, resolving stored byte ranges
/// against the packet buffer.
#[derive(Clone, Copy)]
pub struct LayerView<'p, 'a> {
    pub(crate) packet: &'p Packet<'a>,
    pub(crate) index: usize,
}

impl<'p, 'a> LayerView<'p, 'a> {
    fn layer(&self) -> &'p DecodedLayer {
        self.packet.layer_record(self.index)
    }

    pub fn layer_type(&self) -> LayerType {
        self.layer().layer_type
    }

    /// This layer's own bytes.
    pub fn contents(&self) -> &'p [u8] {
        self.bytes_at(self.layer().contents.clone())
    }

    /// The bytes handed to the next layer.
    pub fn payload(&self) -> &'p [u8] {
        self.bytes_at(self.layer().payload.clone())
    }

    pub fn fields(&self) -> &'p LayerFields {
        &self.layer().fields
    }

    /// Resolve a stored range (e.g. a TLV value or IP options) to bytes.
    pub fn bytes_at(&self, range: ByteRange) -> &'p [u8] {
        &self.packet.data()[range]
    }

    /// Resolve a stored range as UTF-8 text, if it is valid UTF-8.
    pub fn str_at(&self, range: ByteRange) -> Option<&'p str> {
        std::str::from_utf8(self.bytes_at(range)).ok()
    }

    pub fn flow(&self) -> Option<Flow> {
        self.layer().fields.flow()
    }

    /// Typed CDP accessor with pull-based secondary TLV decoding.
    pub fn as_cdp(&self) -> Option<CdpView<'p, 'a>> {
        match &self.layer().fields {
            LayerFields::Cdp(fields) => Some(CdpView::new(*self, fields)),
            _ => None,
        }
    }

    /// Typed LLDP accessor with pull-based org-specific TLV decoding.
    pub fn as_lldp(&self) -> Option<LldpView<'p, 'a>> {
        match &self.layer().fields {
            LayerFields::Lldp(fields) => Some(LldpView::new(*self, fields)),
            _ => None,
        }
    }
}

impl fmt::Debug for LayerView<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerView")
            .field("layer_type", &self.layer_type())
            .field("contents", &self.layer().contents)
            .field("payload", &self.layer().payload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_type_names() {
        assert_eq!(types::TCP.to_string(), "TCP");
        assert_eq!(types::DECODE_FAILURE.to_string(), "DecodeFailure");
        assert_eq!(LayerType(1234).to_string(), "LayerType(1234)");
    }

    #[test]
    fn layer_class_membership() {
        let ip = LayerClass::new([types::IPV4, types::IPV6]);
        assert!(ip.contains(types::IPV4));
        assert!(ip.contains(types::IPV6));
        assert!(!ip.contains(types::TCP));
    }

    #[test]
    fn user_base_clears_builtins() {
        assert!(types::LLDP < USER_BASE);
    }
}
