//! 802.2 LLC and SNAP.
//!
//! LLC follows an 802.3 length field; a SNAP header (SAPs 0xaa/0xaa)
//! re-enters EtherType dispatch through its OUI and protocol ID, which is
//! also how Cisco Discovery frames are recognized (OUI 00:00:0c, PID
//! 0x2000).

use crate::error::LayerError;
use crate::layer::{types, LayerFields};
use crate::packet::DecodeContext;
use crate::registry::NextLayer;

const SNAP_SAP: u8 = 0xaa;
const CISCO_OUI: [u8; 3] = [0x00, 0x00, 0x0c];
const CDP_PID: u16 = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlcFields {
    pub dsap: u8,
    pub ssap: u8,
    /// One control byte for U-format frames, two otherwise.
    pub control: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapFields {
    pub oui: [u8; 3],
    pub pid: u16,
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    if rest.len() < 3 {
        return Err(LayerError::too_short("LLC", 3, rest.len()));
    }
    let dsap = rest[0];
    let ssap = rest[1];
    // U-format (lower two control bits set) carries one control byte.
    let (control, header_len) = if rest[2] & 0x03 == 0x03 {
        (rest[2] as u16, 3)
    } else {
        if rest.len() < 4 {
            return Err(LayerError::too_short("LLC", 4, rest.len()));
        }
        (u16::from_be_bytes([rest[2], rest[3]]), 4)
    };
    let fields = LlcFields { dsap, ssap, control };
    ctx.push_layer(LayerFields::Llc(fields), header_len);
    if dsap == SNAP_SAP && ssap == SNAP_SAP {
        Ok(NextLayer::Layer(types::SNAP))
    } else {
        Ok(NextLayer::Layer(types::PAYLOAD))
    }
}

pub(crate) fn decode_snap(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    if rest.len() < 5 {
        return Err(LayerError::too_short("SNAP", 5, rest.len()));
    }
    let oui = [rest[0], rest[1], rest[2]];
    let pid = u16::from_be_bytes([rest[3], rest[4]]);
    let fields = SnapFields { oui, pid };
    let next = if oui == CISCO_OUI && pid == CDP_PID {
        types::CDP
    } else if oui == [0, 0, 0] {
        // Zero OUI means the PID is an EtherType.
        ctx.layer_for_ethertype(pid).unwrap_or(types::PAYLOAD)
    } else {
        types::PAYLOAD
    };
    ctx.push_layer(LayerFields::Snap(fields), 5);
    Ok(NextLayer::Layer(next))
}
