//! Ethernet II and 802.3.
//!
//! A type/length field below 0x0600 is an 802.3 length; the frame then
//! carries LLC and the length bounds the payload, excluding any padding the
//! sender appended to reach the 60-byte minimum.

use std::net::Ipv4Addr;

use crate::error::LayerError;
use crate::flow::{Endpoint, Flow};
use crate::layer::{types, LayerFields};
use crate::packet::DecodeContext;
use crate::registry::NextLayer;

const HEADER_LEN: usize = 14;

/// Ethertype values below this are 802.3 lengths.
const MAX_LENGTH_VALUE: u16 = 0x0600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetFields {
    pub dst_mac: [u8; 6],
    pub src_mac: [u8; 6],
    /// Raw type/length field value.
    pub ethertype: u16,
    /// Set when the frame is 802.3 and the field is a length.
    pub length: Option<u16>,
}

impl EthernetFields {
    pub fn flow(&self) -> Flow {
        Flow::from_pair(
            types::ETHERNET,
            Endpoint::mac(&self.src_mac),
            Endpoint::mac(&self.dst_mac),
        )
    }
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    if rest.len() < HEADER_LEN {
        return Err(LayerError::too_short("Ethernet", HEADER_LEN, rest.len()));
    }
    let mut dst_mac = [0u8; 6];
    let mut src_mac = [0u8; 6];
    dst_mac.copy_from_slice(&rest[0..6]);
    src_mac.copy_from_slice(&rest[6..12]);
    let ethertype = u16::from_be_bytes([rest[12], rest[13]]);

    if ethertype < MAX_LENGTH_VALUE {
        let fields = EthernetFields {
            dst_mac,
            src_mac,
            ethertype,
            length: Some(ethertype),
        };
        ctx.push_layer_bounded(LayerFields::Ethernet(fields), HEADER_LEN, ethertype as usize);
        return Ok(NextLayer::Layer(types::LLC));
    }

    let fields = EthernetFields {
        dst_mac,
        src_mac,
        ethertype,
        length: None,
    };
    let next = ctx.layer_for_ethertype(ethertype).unwrap_or(types::PAYLOAD);
    ctx.push_layer(LayerFields::Ethernet(fields), HEADER_LEN);
    Ok(NextLayer::Layer(next))
}

/// Convenience for decoders and tests reading IPv4 addresses out of TLVs.
pub(crate) fn ipv4_at(bytes: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::packet::DecodeOptions;
    use crate::registry::LayerRegistry;

    fn decode_one(data: &[u8]) -> crate::packet::Packet<'_> {
        Arc::new(LayerRegistry::with_builtin())
            .decode(data, types::ETHERNET, DecodeOptions::DEFAULT)
            .unwrap()
    }

    #[test]
    fn ethernet_ii_header() {
        let frame = [
            0x00, 0x00, 0x0c, 0x9f, 0xf0, 0x20, // dst
            0xbc, 0x30, 0x5b, 0xe8, 0xd3, 0x49, // src
            0x99, 0x99, // unregistered ethertype
            0x01, 0x02,
        ];
        let mut p = decode_one(&frame);
        let eth = p.layer(types::ETHERNET).unwrap();
        let LayerFields::Ethernet(f) = eth.fields() else {
            panic!("not ethernet")
        };
        assert_eq!(f.dst_mac, [0x00, 0x00, 0x0c, 0x9f, 0xf0, 0x20]);
        assert_eq!(f.src_mac, [0xbc, 0x30, 0x5b, 0xe8, 0xd3, 0x49]);
        assert_eq!(f.ethertype, 0x9999);
        assert_eq!(f.length, None);
        assert_eq!(eth.flow().unwrap().src().to_string(), "bc:30:5b:e8:d3:49");
        assert_eq!(eth.payload(), &[0x01, 0x02]);
    }

    #[test]
    fn dot3_length_bounds_payload() {
        // length 3, one trailing pad byte that must not reach inner layers
        let frame = [
            0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 2, 0x00, 0x03, 0xaa, 0xbb, 0xcc, 0xff,
        ];
        let mut p = decode_one(&frame);
        let eth = p.layer(types::ETHERNET).unwrap();
        let LayerFields::Ethernet(f) = eth.fields() else {
            panic!("not ethernet")
        };
        assert_eq!(f.length, Some(3));
        assert_eq!(eth.payload(), &[0xaa, 0xbb, 0xcc]);
        assert!(!p.truncated());
    }

    #[test]
    fn short_header_is_a_failure_layer() {
        let mut p = decode_one(&[0u8; 10]);
        let err = p.error_layer().unwrap();
        let LayerFields::DecodeFailure(f) = err.fields() else {
            panic!("no failure")
        };
        assert_eq!(f.error, LayerError::too_short("Ethernet", 14, 10));
    }
}
