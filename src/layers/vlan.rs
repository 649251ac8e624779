//! 802.1Q VLAN tags.

use crate::error::LayerError;
use crate::layer::{types, LayerFields};
use crate::packet::DecodeContext;
use crate::registry::NextLayer;

const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dot1QFields {
    /// PCP, upper 3 bits of the TCI.
    pub priority: u8,
    /// DEI bit.
    pub drop_eligible: bool,
    /// VID, lower 12 bits of the TCI.
    pub vlan_id: u16,
    /// Inner type/length field.
    pub ethertype: u16,
}

pub(crate) fn decode(ctx: &mut DecodeContext<'_, '_>) -> Result<NextLayer, LayerError> {
    let rest = ctx.remaining();
    if rest.len() < HEADER_LEN {
        return Err(LayerError::too_short("Dot1Q", HEADER_LEN, rest.len()));
    }
    let tci = u16::from_be_bytes([rest[0], rest[1]]);
    let ethertype = u16::from_be_bytes([rest[2], rest[3]]);
    let fields = Dot1QFields {
        priority: (tci >> 13) as u8,
        drop_eligible: tci & 0x1000 != 0,
        vlan_id: tci & 0x0fff,
        ethertype,
    };

    // The inner field is a length for 802.3 frames, same rule as Ethernet.
    if ethertype < 0x0600 {
        ctx.push_layer_bounded(LayerFields::Dot1Q(fields), HEADER_LEN, ethertype as usize);
        return Ok(NextLayer::Layer(types::LLC));
    }
    let next = ctx.layer_for_ethertype(ethertype).unwrap_or(types::PAYLOAD);
    ctx.push_layer(LayerFields::Dot1Q(fields), HEADER_LEN);
    Ok(NextLayer::Layer(next))
}
