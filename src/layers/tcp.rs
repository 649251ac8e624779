//! TCP.

use smallvec::SmallVec;

use crate::error::LayerError;
use crate::flow::{Endpoint, Flow};
use crate::layer::{types, ByteRange, LayerFields};
use crate::packet::DecodeContext;
use crate::registry::NextLayer;

pub const OPT_END_OF_LIST: u8 = 0;
pub const OPT_NOP: u8 = 1;
pub const OPT_MSS: u8 = 2;
pub const OPT_WINDOW_SCALE: u8 = 3;
pub const OPT_SACK_PERMITTED: u8 = 4;
pub const OPT_TIMESTAMPS: u8 = 8;

/// The twelve flag bits: NS plus the classic nine-bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags(pub u16);

impl TcpFlags {
    pub fn fin(&self) -> bool {
        self.0 & 0x001 != 0
    }
    pub fn syn(&self) -> bool {
        self.0 & 0x002 != 0
    }
    pub fn rst(&self) -> bool {
        self.0 & 0x004 != 0
    }
    pub fn psh(&self) -> bool {
        self.0 & 0x008 != 0
    }
    pub fn ack(&self) -> bool {
        self.0 & 0x010 != 0
    }
    pub fn urg(&self) -> bool {
        self.0 & 0x020 != 0
    }
    pub fn ece(&self) -> bool {
        self.0 & 0x040 != 0
    }
    pub fn cwr(&self) -> bool {
        self.0 & 0x080 != 0
    }
    pub fn ns(&self) -> bool {
        self.0 & 0x100 != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpOption {
    pub kind: u8,
    /// Declared option length; 1 for the single-byte kinds.
    pub length: u8,
    pub data: ByteRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpFields {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    /// Header length in 32-bit words.
    pub data_offset: u8,
    pub flags: TcpFlags,
    pub window: u16,
    pub checksum: u16,
    pub urgent: u16,
    pub options: SmallVec<[TcpOption; 4]>,
}

impl TcpFields {
    pub fn flow(&self) -> Flow {
        Flow::from_pair(
            types::TCP,
            Endpoint::port(self.src_port),
            Endpoint::port(self.dst_port),
        )
    }
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    let base = ctx.offset();
    if rest.len() < 20 {
        return Err(LayerError::too_short("TCP", 20, rest.len()));
    }
    let data_offset = rest[12] >> 4;
    if data_offset < 5 {
        return Err(LayerError::invalid(
            "TCP",
            "data_offset",
            format!("{data_offset} words is below the minimum header"),
        ));
    }
    let header_len = data_offset as usize * 4;
    if rest.len() < header_len {
        return Err(LayerError::too_short("TCP", header_len, rest.len()));
    }

    let mut options = SmallVec::new();
    let opt_bytes = &rest[20..header_len];
    let mut i = 0;
    while i < opt_bytes.len() {
        let kind = opt_bytes[i];
        match kind {
            OPT_END_OF_LIST => {
                options.push(TcpOption {
                    kind,
                    length: 1,
                    data: base + 20 + i + 1..base + 20 + i + 1,
                });
                break;
            }
            OPT_NOP => {
                options.push(TcpOption {
                    kind,
                    length: 1,
                    data: base + 20 + i + 1..base + 20 + i + 1,
                });
                i += 1;
            }
            _ => {
                if i + 2 > opt_bytes.len() {
                    return Err(LayerError::invalid(
                        "TCP",
                        "options",
                        "option header past header end",
                    ));
                }
                let length = opt_bytes[i + 1];
                if (length as usize) < 2 || i + length as usize > opt_bytes.len() {
                    return Err(LayerError::invalid(
                        "TCP",
                        "options",
                        format!("option {kind} has invalid length {length}"),
                    ));
                }
                options.push(TcpOption {
                    kind,
                    length,
                    data: base + 20 + i + 2..base + 20 + i + length as usize,
                });
                i += length as usize;
            }
        }
    }

    let fields = TcpFields {
        src_port: u16::from_be_bytes([rest[0], rest[1]]),
        dst_port: u16::from_be_bytes([rest[2], rest[3]]),
        seq: u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]),
        ack: u32::from_be_bytes([rest[8], rest[9], rest[10], rest[11]]),
        data_offset,
        flags: TcpFlags(u16::from_be_bytes([rest[12], rest[13]]) & 0x01ff),
        window: u16::from_be_bytes([rest[14], rest[15]]),
        checksum: u16::from_be_bytes([rest[16], rest[17]]),
        urgent: u16::from_be_bytes([rest[18], rest[19]]),
        options,
    };
    let has_payload = rest.len() > header_len;
    ctx.push_layer(LayerFields::Tcp(fields), header_len);
    if has_payload {
        Ok(NextLayer::Layer(types::PAYLOAD))
    } else {
        Ok(NextLayer::Done)
    }
}
