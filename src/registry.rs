//! The decoder registry.
//!
//! Decoders are plain function pointers indexed by [`LayerType`] in a flat
//! table, so dispatch in the decode loop is an array load. A second table
//! maps EtherType values to layer types; Ethernet, 802.1Q, and SNAP all
//! consult it, and applications extend it to hook their own protocols into
//! those chains without replacing the builtin decoders.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::{DecodeError, LayerError};
use crate::layer::{types, LayerType};
use crate::layers;
use crate::packet::{DecodeContext, DecodeOptions, Packet};

/// What a decoder asks the engine to do after it has pushed its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextLayer {
    /// Continue the chain with this layer type over the remaining bytes.
    Layer(LayerType),
    /// The chain ends here.
    Done,
}

/// A layer decoder. Reads from the context's remaining bytes, pushes exactly
/// one layer on success, and names what comes next.
pub type DecodeFn = fn(&mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError>;

struct Entry {
    name: &'static str,
    decode: DecodeFn,
}

/// Maps layer types to decoders and EtherType values to layer types.
///
/// Registries are immutable once shared: build one, then hand it out behind
/// an [`Arc`]. The process-wide builtin registry is available through
/// [`default_registry`].
pub struct LayerRegistry {
    entries: Vec<Option<Entry>>,
    ethertypes: Vec<(u16, LayerType)>,
}

impl LayerRegistry {
    /// An empty registry with no decoders at all.
    pub fn new() -> Self {
        LayerRegistry {
            entries: Vec::new(),
            ethertypes: Vec::new(),
        }
    }

    /// A registry pre-populated with every builtin decoder and the standard
    /// EtherType assignments.
    pub fn with_builtin() -> Self {
        let mut r = LayerRegistry::new();
        r.register(types::ETHERNET, "Ethernet", layers::ethernet::decode);
        r.register(types::DOT1Q, "Dot1Q", layers::vlan::decode);
        r.register(types::LLC, "LLC", layers::llc::decode);
        r.register(types::SNAP, "SNAP", layers::llc::decode_snap);
        r.register(types::IPV4, "IPv4", layers::ipv4::decode);
        r.register(types::IPV6, "IPv6", layers::ipv6::decode);
        r.register(
            types::IPV6_HOP_BY_HOP,
            "IPv6HopByHop",
            layers::ipv6::decode_hop_by_hop,
        );
        r.register(types::TCP, "TCP", layers::tcp::decode);
        r.register(types::UDP, "UDP", layers::udp::decode);
        r.register(types::SCTP, "SCTP", layers::sctp::decode);
        r.register(types::CDP, "CDP", layers::cdp::decode);
        r.register(types::LLDP, "LLDP", layers::lldp::decode);
        r.register(types::PAYLOAD, "Payload", layers::payload::decode);

        r.register_ethertype(0x0800, types::IPV4);
        r.register_ethertype(0x86dd, types::IPV6);
        r.register_ethertype(0x8100, types::DOT1Q);
        r.register_ethertype(0x88a8, types::DOT1Q);
        r.register_ethertype(0x88cc, types::LLDP);
        r
    }

    /// Register (or replace) the decoder for a layer type.
    pub fn register(&mut self, layer_type: LayerType, name: &'static str, decode: DecodeFn) {
        let idx = layer_type.0 as usize;
        if idx >= self.entries.len() {
            self.entries.resize_with(idx + 1, || None);
        }
        debug!(layer_type = layer_type.0, name, "registering decoder");
        self.entries[idx] = Some(Entry { name, decode });
    }

    /// Map an EtherType value to a layer type for Ethernet/VLAN/SNAP
    /// dispatch. A later registration for the same value replaces the
    /// earlier one.
    pub fn register_ethertype(&mut self, ethertype: u16, layer_type: LayerType) {
        if let Some(slot) = self.ethertypes.iter_mut().find(|(e, _)| *e == ethertype) {
            slot.1 = layer_type;
        } else {
            self.ethertypes.push((ethertype, layer_type));
        }
    }

    pub fn contains(&self, layer_type: LayerType) -> bool {
        self.decoder(layer_type).is_some()
    }

    pub(crate) fn decoder(&self, layer_type: LayerType) -> Option<DecodeFn> {
        self.entries
            .get(layer_type.0 as usize)
            .and_then(|e| e.as_ref())
            .map(|e| e.decode)
    }

    /// Registered name of a layer type, if any.
    pub fn name(&self, layer_type: LayerType) -> Option<&'static str> {
        self.entries
            .get(layer_type.0 as usize)
            .and_then(|e| e.as_ref())
            .map(|e| e.name)
    }

    /// The layer type an EtherType dispatches to, if registered.
    pub fn layer_for_ethertype(&self, ethertype: u16) -> Option<LayerType> {
        self.ethertypes
            .iter()
            .find(|(e, _)| *e == ethertype)
            .map(|(_, t)| *t)
    }

    /// Decode a packet starting from `first`, under `options`.
    ///
    /// Fails only if `first` has no registered decoder; every fault beyond
    /// that point is carried as data inside the returned [`Packet`].
    pub fn decode<'a>(
        self: &Arc<Self>,
        data: &'a [u8],
        first: LayerType,
        options: DecodeOptions,
    ) -> Result<Packet<'a>, DecodeError> {
        Packet::decode(Arc::clone(self), data, first, options)
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        LayerRegistry::with_builtin()
    }
}

/// The process-wide builtin registry.
pub fn default_registry() -> &'static Arc<LayerRegistry> {
    static REGISTRY: OnceLock<Arc<LayerRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Arc::new(LayerRegistry::with_builtin()))
}

/// Decode with the builtin registry.
pub fn decode_packet(
    data: &[u8],
    first: LayerType,
    options: DecodeOptions,
) -> Result<Packet<'_>, DecodeError> {
    default_registry().decode(data, first, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let r = LayerRegistry::with_builtin();
        assert!(r.contains(types::ETHERNET));
        assert!(r.contains(types::LLDP));
        assert_eq!(r.name(types::TCP), Some("TCP"));
        assert_eq!(r.layer_for_ethertype(0x0800), Some(types::IPV4));
        assert_eq!(r.layer_for_ethertype(0x1234), None);
    }

    #[test]
    fn ethertype_registration_replaces() {
        let mut r = LayerRegistry::with_builtin();
        let custom = LayerType(1000);
        r.register_ethertype(0x0800, custom);
        assert_eq!(r.layer_for_ethertype(0x0800), Some(custom));
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let r = LayerRegistry::new();
        assert!(!r.contains(types::ETHERNET));
        assert_eq!(r.name(types::ETHERNET), None);
    }

    #[test]
    fn unknown_first_layer_is_a_sync_error() {
        let r = Arc::new(LayerRegistry::new());
        let err = r
            .decode(&[0u8; 14], types::ETHERNET, DecodeOptions::DEFAULT)
            .unwrap_err();
        assert_eq!(err, DecodeError::UnknownLayerType(types::ETHERNET));
    }
}
