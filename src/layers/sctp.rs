//! SCTP: common header plus the chunk list.
//!
//! Chunks are TLV records padded to 4-byte boundaries; they are collected
//! onto the single SCTP layer rather than decoded further, with each
//! chunk's value kept as a range for callers that want to dig in.

use smallvec::SmallVec;

use crate::error::LayerError;
use crate::flow::{Endpoint, Flow};
use crate::layer::{types, ByteRange, LayerFields};
use crate::packet::DecodeContext;
use crate::registry::NextLayer;
use crate::tlv::{RawRecord, SctpChunkLayout, TlvIter};

const HEADER_LEN: usize = 12;

/// Chunk type assignments from RFC 4960.
pub mod chunk_types {
    pub const DATA: u8 = 0;
    pub const INIT: u8 = 1;
    pub const INIT_ACK: u8 = 2;
    pub const SACK: u8 = 3;
    pub const HEARTBEAT: u8 = 4;
    pub const HEARTBEAT_ACK: u8 = 5;
    pub const ABORT: u8 = 6;
    pub const SHUTDOWN: u8 = 7;
    pub const SHUTDOWN_ACK: u8 = 8;
    pub const ERROR: u8 = 9;
    pub const COOKIE_ECHO: u8 = 10;
    pub const COOKIE_ACK: u8 = 11;
    pub const SHUTDOWN_COMPLETE: u8 = 14;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SctpChunk {
    pub chunk_type: u8,
    pub flags: u8,
    /// Declared chunk length including its 4-byte header.
    pub length: u16,
    pub value: ByteRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SctpFields {
    pub src_port: u16,
    pub dst_port: u16,
    pub verification_tag: u32,
    pub checksum: u32,
    pub chunks: SmallVec<[SctpChunk; 4]>,
}

impl SctpFields {
    pub fn flow(&self) -> Flow {
        Flow::from_pair(
            types::SCTP,
            Endpoint::port(self.src_port),
            Endpoint::port(self.dst_port),
        )
    }

    pub fn chunk_types(&self) -> impl Iterator<Item = u8> + '_ {
        self.chunks.iter().map(|c| c.chunk_type)
    }
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    let base = ctx.offset();
    if rest.len() < HEADER_LEN {
        return Err(LayerError::too_short("SCTP", HEADER_LEN, rest.len()));
    }

    let mut chunks = SmallVec::new();
    let mut iter = TlvIter::<SctpChunkLayout>::new(&rest[HEADER_LEN..]);
    for tlv in iter.by_ref() {
        let rec = RawRecord::rebased(&tlv, base + HEADER_LEN);
        chunks.push(SctpChunk {
            chunk_type: rec.type_code as u8,
            flags: rec.flags,
            length: (tlv.declared_len + 4) as u16,
            value: rec.value,
        });
    }
    if iter.malformed() {
        return Err(LayerError::invalid(
            "SCTP",
            "chunk",
            "chunk length shorter than its header",
        ));
    }
    let truncated = iter.truncated();

    let fields = SctpFields {
        src_port: u16::from_be_bytes([rest[0], rest[1]]),
        dst_port: u16::from_be_bytes([rest[2], rest[3]]),
        verification_tag: u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]),
        checksum: u32::from_be_bytes([rest[8], rest[9], rest[10], rest[11]]),
        chunks,
    };
    if truncated {
        ctx.mark_truncated();
    }
    ctx.push_terminal(LayerFields::Sctp(fields));
    Ok(NextLayer::Done)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_type_constants_cover_the_handshake() {
        // setup, transfer, teardown
        let sequence = [
            chunk_types::INIT,
            chunk_types::INIT_ACK,
            chunk_types::COOKIE_ECHO,
            chunk_types::COOKIE_ACK,
            chunk_types::DATA,
            chunk_types::SACK,
            chunk_types::SHUTDOWN,
            chunk_types::SHUTDOWN_ACK,
            chunk_types::SHUTDOWN_COMPLETE,
        ];
        assert_eq!(sequence[0], 1);
        assert_eq!(sequence[8], 14);
    }
}
