//! Builtin protocol decoders.
//!
//! Each module exposes a `decode` function matching [`DecodeFn`] plus the
//! typed fields struct its layer carries. Decoders read only from the
//! context's remaining window, push exactly one layer, and name what comes
//! next; truncation and window narrowing are handled by the push operations.
//!
//! [`DecodeFn`]: crate::registry::DecodeFn

use crate::layer::{types, LayerType};

pub mod cdp;
pub mod ethernet;
pub mod ipv4;
pub mod ipv6;
pub mod llc;
pub mod lldp;
pub mod payload;
pub mod sctp;
pub mod tcp;
pub mod udp;
pub mod vlan;

/// IP protocol number to layer type, shared by IPv4 and the IPv6 headers.
pub(crate) fn ip_protocol_layer(protocol: u8) -> Option<LayerType> {
    match protocol {
        0 => Some(types::IPV6_HOP_BY_HOP),
        4 => Some(types::IPV4),
        6 => Some(types::TCP),
        17 => Some(types::UDP),
        41 => Some(types::IPV6),
        132 => Some(types::SCTP),
        _ => None,
    }
}
