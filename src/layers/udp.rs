//! UDP.

use crate::error::LayerError;
use crate::flow::{Endpoint, Flow};
use crate::layer::{types, LayerFields};
use crate::packet::DecodeContext;
use crate::registry::NextLayer;

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpFields {
    pub src_port: u16,
    pub dst_port: u16,
    /// Datagram length including the 8-byte header.
    pub length: u16,
    pub checksum: u16,
}

impl UdpFields {
    pub fn flow(&self) -> Flow {
        Flow::from_pair(
            types::UDP,
            Endpoint::port(self.src_port),
            Endpoint::port(self.dst_port),
        )
    }
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    if rest.len() < HEADER_LEN {
        return Err(LayerError::too_short("UDP", HEADER_LEN, rest.len()));
    }
    let fields = UdpFields {
        src_port: u16::from_be_bytes([rest[0], rest[1]]),
        dst_port: u16::from_be_bytes([rest[2], rest[3]]),
        length: u16::from_be_bytes([rest[4], rest[5]]),
        checksum: u16::from_be_bytes([rest[6], rest[7]]),
    };
    if (fields.length as usize) < HEADER_LEN {
        return Err(LayerError::invalid(
            "UDP",
            "length",
            format!("{} is shorter than the header", fields.length),
        ));
    }
    let declared = fields.length as usize - HEADER_LEN;
    let actual = declared.min(rest.len() - HEADER_LEN);
    ctx.push_layer_bounded(LayerFields::Udp(fields), HEADER_LEN, declared);
    if actual > 0 {
        Ok(NextLayer::Layer(types::PAYLOAD))
    } else {
        Ok(NextLayer::Done)
    }
}
