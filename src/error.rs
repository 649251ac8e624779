//! Error types for layerstack.
//!
//! Two kinds of failure exist and they propagate very differently:
//!
//! - [`DecodeError`] is returned synchronously from the decode entry points.
//!   The only way `decode` itself fails is an unregistered first-layer hint.
//! - [`LayerError`] describes a fault inside a single layer decoder. It is
//!   never returned from `decode`; the engine wraps it in a terminal
//!   decode-failure layer carried inside the returned [`Packet`], and callers
//!   discover it through [`Packet::error_layer`].
//!
//! [`Packet`]: crate::packet::Packet
//! [`Packet::error_layer`]: crate::packet::Packet::error_layer

use thiserror::Error;

use crate::flow::EndpointKind;
use crate::layer::LayerType;

/// Errors returned synchronously from decode entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The first-layer hint names a type with no registered decoder.
    #[error("no decoder registered for layer type {0}")]
    UnknownLayerType(LayerType),
}

/// Per-layer decoding faults, carried as data inside the packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    /// The fixed header of a layer does not fit in the bytes present.
    #[error("{protocol}: packet too short (need {needed} bytes, have {have})")]
    PacketTooShort {
        protocol: &'static str,
        needed: usize,
        have: usize,
    },

    /// A fixed-layout field failed an internal consistency check.
    #[error("{protocol}: invalid {field}: {reason}")]
    InvalidField {
        protocol: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl LayerError {
    pub(crate) fn too_short(protocol: &'static str, needed: usize, have: usize) -> Self {
        LayerError::PacketTooShort {
            protocol,
            needed,
            have,
        }
    }

    pub(crate) fn invalid(
        protocol: &'static str,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        LayerError::InvalidField {
            protocol,
            field,
            reason: reason.into(),
        }
    }
}

/// Errors from flow/endpoint construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A flow was built from endpoints of different kinds.
    #[error("endpoint kind mismatch: src is {src:?}, dst is {dst:?}")]
    KindMismatch { src: EndpointKind, dst: EndpointKind },

    /// An endpoint address exceeds the fixed-size representation.
    #[error("endpoint address too long: {len} bytes (max {max})")]
    AddressTooLong { len: usize, max: usize },
}
