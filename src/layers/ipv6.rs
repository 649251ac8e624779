//! IPv6 and the hop-by-hop extension header.
//!
//! A zero payload length with a hop-by-hop next header defers the payload
//! bound to the extension's jumbogram option (RFC 2675); the hop-by-hop
//! decoder then bounds the window with the jumbo length it found.

use std::net::Ipv6Addr;

use crate::error::LayerError;
use crate::flow::{Endpoint, Flow};
use crate::layer::{types, ByteRange, LayerFields};
use crate::layers::ip_protocol_layer;
use crate::packet::DecodeContext;
use crate::registry::NextLayer;

const HEADER_LEN: usize = 40;
const PROTOCOL_HOP_BY_HOP: u8 = 0;
const OPT_PAD1: u8 = 0;
const OPT_JUMBO: u8 = 0xc2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Fields {
    pub version: u8,
    pub traffic_class: u8,
    pub flow_label: u32,
    /// Payload length after the fixed header; zero for jumbograms.
    pub payload_length: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
}

impl Ipv6Fields {
    pub fn flow(&self) -> Flow {
        Flow::from_pair(types::IPV6, Endpoint::ipv6(self.src), Endpoint::ipv6(self.dst))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6HopByHopFields {
    pub next_header: u8,
    /// Raw option bytes after the two-byte extension header prefix.
    pub options: ByteRange,
    /// Jumbogram payload length, when the jumbo option is present.
    pub jumbo_length: Option<u32>,
}

fn addr_at(bytes: &[u8]) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    octets.copy_from_slice(bytes);
    Ipv6Addr::from(octets)
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    if rest.len() < HEADER_LEN {
        return Err(LayerError::too_short("IPv6", HEADER_LEN, rest.len()));
    }
    let version = rest[0] >> 4;
    if version != 6 {
        return Err(LayerError::invalid(
            "IPv6",
            "version",
            format!("expected 6, got {version}"),
        ));
    }
    let fields = Ipv6Fields {
        version,
        traffic_class: (rest[0] << 4) | (rest[1] >> 4),
        flow_label: u32::from_be_bytes([0, rest[1] & 0x0f, rest[2], rest[3]]),
        payload_length: u16::from_be_bytes([rest[4], rest[5]]),
        next_header: rest[6],
        hop_limit: rest[7],
        src: addr_at(&rest[8..24]),
        dst: addr_at(&rest[24..40]),
    };
    let payload_length = fields.payload_length;
    let next_header = fields.next_header;

    if payload_length == 0 {
        if next_header != PROTOCOL_HOP_BY_HOP {
            return Err(LayerError::invalid(
                "IPv6",
                "payload_length",
                "zero length without a hop-by-hop jumbogram",
            ));
        }
        // The jumbo option inside hop-by-hop carries the real bound.
        ctx.push_layer(LayerFields::Ipv6(fields), HEADER_LEN);
        return Ok(NextLayer::Layer(types::IPV6_HOP_BY_HOP));
    }

    ctx.push_layer_bounded(
        LayerFields::Ipv6(fields),
        HEADER_LEN,
        payload_length as usize,
    );
    Ok(NextLayer::Layer(
        ip_protocol_layer(next_header).unwrap_or(types::PAYLOAD),
    ))
}

pub(crate) fn decode_hop_by_hop(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    let base = ctx.offset();
    if rest.len() < 8 {
        return Err(LayerError::too_short("IPv6HopByHop", 8, rest.len()));
    }
    let next_header = rest[0];
    let ext_len = (rest[1] as usize + 1) * 8;
    if rest.len() < ext_len {
        return Err(LayerError::too_short("IPv6HopByHop", ext_len, rest.len()));
    }

    let mut jumbo_length = None;
    let opts = &rest[2..ext_len];
    let mut i = 0;
    while i < opts.len() {
        if opts[i] == OPT_PAD1 {
            i += 1;
            continue;
        }
        if i + 2 > opts.len() {
            return Err(LayerError::invalid(
                "IPv6HopByHop",
                "option",
                "option header past extension end",
            ));
        }
        let opt_type = opts[i];
        let opt_len = opts[i + 1] as usize;
        if i + 2 + opt_len > opts.len() {
            return Err(LayerError::invalid(
                "IPv6HopByHop",
                "option",
                "option data past extension end",
            ));
        }
        if opt_type == OPT_JUMBO && opt_len == 4 {
            jumbo_length = Some(u32::from_be_bytes([
                opts[i + 2],
                opts[i + 3],
                opts[i + 4],
                opts[i + 5],
            ]));
        }
        i += 2 + opt_len;
    }

    let fields = Ipv6HopByHopFields {
        next_header,
        options: base + 2..base + ext_len,
        jumbo_length,
    };
    match jumbo_length {
        // Jumbo length counts from the start of this extension header.
        Some(jumbo) => ctx.push_layer_bounded(
            LayerFields::Ipv6HopByHop(fields),
            ext_len,
            (jumbo as usize).saturating_sub(ext_len),
        ),
        None => ctx.push_layer(LayerFields::Ipv6HopByHop(fields), ext_len),
    }
    Ok(NextLayer::Layer(
        ip_protocol_layer(next_header).unwrap_or(types::PAYLOAD),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_class_and_flow_label_split() {
        // version 6, traffic class 0xab, flow label 0xcdef1
        let rest = [0x6a, 0xbc, 0xde, 0xf1];
        assert_eq!(rest[0] >> 4, 6);
        assert_eq!((rest[0] << 4) | (rest[1] >> 4), 0xab);
        assert_eq!(
            u32::from_be_bytes([0, rest[1] & 0x0f, rest[2], rest[3]]),
            0xcdef1
        );
    }
}
