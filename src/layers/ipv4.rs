//! IPv4.
//!
//! The total-length field bounds the payload window, so Ethernet padding
//! after a short datagram never reaches the transport decoder; a
//! total length larger than the bytes present marks the packet truncated.

use std::net::Ipv4Addr;

use crate::error::LayerError;
use crate::flow::{Endpoint, Flow};
use crate::layer::{types, ByteRange, LayerFields};
use crate::layers::ip_protocol_layer;
use crate::packet::DecodeContext;
use crate::registry::NextLayer;

pub const FLAG_EVIL: u8 = 0x04;
pub const FLAG_DONT_FRAGMENT: u8 = 0x02;
pub const FLAG_MORE_FRAGMENTS: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Fields {
    pub version: u8,
    /// Header length in 32-bit words.
    pub ihl: u8,
    pub tos: u8,
    /// Total datagram length including the header.
    pub total_length: u16,
    pub identification: u16,
    /// Upper three bits of the fragment word.
    pub flags: u8,
    pub frag_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    /// Option bytes between the fixed header and the payload.
    pub options: ByteRange,
}

impl Ipv4Fields {
    pub fn flow(&self) -> Flow {
        Flow::from_pair(types::IPV4, Endpoint::ipv4(self.src), Endpoint::ipv4(self.dst))
    }
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    let base = ctx.offset();
    if rest.len() < 20 {
        return Err(LayerError::too_short("IPv4", 20, rest.len()));
    }
    let version = rest[0] >> 4;
    if version != 4 {
        return Err(LayerError::invalid(
            "IPv4",
            "version",
            format!("expected 4, got {version}"),
        ));
    }
    let ihl = rest[0] & 0x0f;
    if ihl < 5 {
        return Err(LayerError::invalid(
            "IPv4",
            "ihl",
            format!("{ihl} words is below the minimum header"),
        ));
    }
    let header_len = ihl as usize * 4;
    if rest.len() < header_len {
        return Err(LayerError::too_short("IPv4", header_len, rest.len()));
    }
    let total_length = u16::from_be_bytes([rest[2], rest[3]]);
    if (total_length as usize) < header_len {
        return Err(LayerError::invalid(
            "IPv4",
            "total_length",
            format!("{total_length} is shorter than the {header_len}-byte header"),
        ));
    }
    let frag_word = u16::from_be_bytes([rest[6], rest[7]]);
    let fields = Ipv4Fields {
        version,
        ihl,
        tos: rest[1],
        total_length,
        identification: u16::from_be_bytes([rest[4], rest[5]]),
        flags: (frag_word >> 13) as u8,
        frag_offset: frag_word & 0x1fff,
        ttl: rest[8],
        protocol: rest[9],
        checksum: u16::from_be_bytes([rest[10], rest[11]]),
        src: Ipv4Addr::new(rest[12], rest[13], rest[14], rest[15]),
        dst: Ipv4Addr::new(rest[16], rest[17], rest[18], rest[19]),
        options: base + 20..base + header_len,
    };
    let protocol = fields.protocol;
    let payload_len = total_length as usize - header_len;
    let has_payload = payload_len.min(rest.len() - header_len) > 0;
    ctx.push_layer_bounded(LayerFields::Ipv4(fields), header_len, payload_len);
    if !has_payload {
        return Ok(NextLayer::Done);
    }
    Ok(NextLayer::Layer(
        ip_protocol_layer(protocol).unwrap_or(types::PAYLOAD),
    ))
}
