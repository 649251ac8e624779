//! Registry-driven network packet decoding.
//!
//! A packet is decoded as a chain of layers: each registered decoder reads
//! its header from the remaining bytes, produces typed fields, and names
//! the layer that follows. Decoding is best-effort over the bytes actually
//! present; truncation is a flag on the packet and a decoder fault becomes
//! a terminal decode-failure layer instead of an error return, so the
//! layers before the fault stay usable.
//!
//! Decode modes trade work for latency and memory:
//! eager/lazy ([`DecodeOptions::lazy`]) and copy/no-copy
//! ([`DecodeOptions::no_copy`]). All four produce identical layers.
//!
//! # Example
//!
//! ```
//! use layerstack::{decode_packet, types, DecodeOptions};
//!
//! // An Ethernet header with an unregistered ethertype and two data bytes.
//! let frame: Vec<u8> = [
//!     &[0x00, 0x00, 0x0c, 0x9f, 0xf0, 0x20][..],
//!     &[0xbc, 0x30, 0x5b, 0xe8, 0xd3, 0x49][..],
//!     &0x9999u16.to_be_bytes()[..],
//!     b"hi",
//! ]
//! .concat();
//!
//! let mut packet = decode_packet(&frame, types::ETHERNET, DecodeOptions::DEFAULT)?;
//! let chain: Vec<_> = packet.layers().map(|l| l.layer_type()).collect();
//! assert_eq!(chain, vec![types::ETHERNET, types::PAYLOAD]);
//! assert_eq!(packet.layer(types::PAYLOAD).unwrap().contents(), b"hi");
//! # Ok::<(), layerstack::DecodeError>(())
//! ```
//!
//! Applications extend the registry with their own layer types from
//! [`USER_BASE`] upward, and hook them into the Ethernet/VLAN/SNAP chains
//! via [`LayerRegistry::register_ethertype`].

pub mod error;
pub mod flow;
pub mod layer;
pub mod layers;
pub mod packet;
pub mod registry;
pub mod tlv;

pub use error::{DecodeError, FlowError, LayerError};
pub use flow::{Endpoint, EndpointKind, Flow, MAX_ENDPOINT_LEN};
pub use layer::{
    types, ByteRange, CustomFields, DecodeFailureFields, DecodedLayer, LayerCategory, LayerClass,
    LayerFields, LayerType, LayerView, USER_BASE,
};
pub use packet::{DecodeContext, DecodeOptions, Layers, Packet};
pub use registry::{decode_packet, default_registry, DecodeFn, LayerRegistry, NextLayer};

/// Crate version, for embedding in diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
