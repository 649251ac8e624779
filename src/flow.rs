//! Flow and endpoint addressing.
//!
//! An [`Endpoint`] is a single address value (MAC, IP, port) tagged with its
//! kind; a [`Flow`] is a directed (src, dst) pair of same-kind endpoints plus
//! the layer type that produced it. Both are fixed-size comparable values so
//! they work as keys in `HashMap`/`BTreeMap` without referencing packet
//! memory: two flows compare equal iff kind, layer type, and both address
//! byte strings are equal.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::FlowError;
use crate::layer::LayerType;

/// Largest address an endpoint can carry (IPv6).
pub const MAX_ENDPOINT_LEN: usize = 16;

/// Discriminates endpoint address families. Endpoints of different kinds
/// never compare equal, even when their raw bytes coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndpointKind {
    /// A link-layer hardware address (usually 6 bytes, colon-hex rendering).
    Mac,
    /// An IPv4 address.
    Ipv4,
    /// An IPv6 address.
    Ipv6,
    /// A 16-bit transport port (TCP/UDP/SCTP).
    Port,
}

/// A single address value. Unused tail bytes are zeroed at construction so
/// derived equality and hashing see a canonical representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    kind: EndpointKind,
    len: u8,
    raw: [u8; MAX_ENDPOINT_LEN],
}

impl Endpoint {
    /// Build an endpoint from raw address bytes plus a kind tag.
    ///
    /// Variable-length link addresses are accepted up to
    /// [`MAX_ENDPOINT_LEN`]; the stored length keeps addresses of different
    /// sizes distinct.
    pub fn new(kind: EndpointKind, bytes: &[u8]) -> Result<Self, FlowError> {
        if bytes.len() > MAX_ENDPOINT_LEN {
            return Err(FlowError::AddressTooLong {
                len: bytes.len(),
                max: MAX_ENDPOINT_LEN,
            });
        }
        let mut raw = [0u8; MAX_ENDPOINT_LEN];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Endpoint {
            kind,
            len: bytes.len() as u8,
            raw,
        })
    }

    /// MAC endpoint from a 6-byte hardware address.
    pub fn mac(addr: &[u8; 6]) -> Self {
        let mut raw = [0u8; MAX_ENDPOINT_LEN];
        raw[..6].copy_from_slice(addr);
        Endpoint {
            kind: EndpointKind::Mac,
            len: 6,
            raw,
        }
    }

    /// IPv4 endpoint.
    pub fn ipv4(addr: Ipv4Addr) -> Self {
        let mut raw = [0u8; MAX_ENDPOINT_LEN];
        raw[..4].copy_from_slice(&addr.octets());
        Endpoint {
            kind: EndpointKind::Ipv4,
            len: 4,
            raw,
        }
    }

    /// IPv6 endpoint.
    pub fn ipv6(addr: Ipv6Addr) -> Self {
        Endpoint {
            kind: EndpointKind::Ipv6,
            len: 16,
            raw: addr.octets(),
        }
    }

    /// Transport port endpoint (big-endian byte order internally).
    pub fn port(port: u16) -> Self {
        let mut raw = [0u8; MAX_ENDPOINT_LEN];
        raw[..2].copy_from_slice(&port.to_be_bytes());
        Endpoint {
            kind: EndpointKind::Port,
            len: 2,
            raw,
        }
    }

    /// The endpoint's kind tag.
    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// The address bytes (length depends on kind).
    pub fn raw(&self) -> &[u8] {
        &self.raw[..self.len as usize]
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EndpointKind::Mac => {
                for (i, b) in self.raw().iter().enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            EndpointKind::Ipv4 => {
                let mut o = [0u8; 4];
                o.copy_from_slice(&self.raw[..4]);
                write!(f, "{}", Ipv4Addr::from(o))
            }
            EndpointKind::Ipv6 => write!(f, "{}", Ipv6Addr::from(self.raw)),
            EndpointKind::Port => {
                write!(f, "{}", u16::from_be_bytes([self.raw[0], self.raw[1]]))
            }
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({:?}, {})", self.kind, self)
    }
}

/// A directed (src, dst) addressing pair for one protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flow {
    protocol: LayerType,
    src: Endpoint,
    dst: Endpoint,
}

impl Flow {
    /// Build a flow from two endpoints of the same kind.
    pub fn new(protocol: LayerType, src: Endpoint, dst: Endpoint) -> Result<Self, FlowError> {
        if src.kind != dst.kind {
            return Err(FlowError::KindMismatch {
                src: src.kind,
                dst: dst.kind,
            });
        }
        Ok(Flow { protocol, src, dst })
    }

    /// Internal constructor for decoders, which build both endpoints from
    /// the same header and cannot mismatch kinds.
    pub(crate) fn from_pair(protocol: LayerType, src: Endpoint, dst: Endpoint) -> Self {
        debug_assert_eq!(src.kind, dst.kind);
        Flow { protocol, src, dst }
    }

    /// The layer type that produced this flow.
    pub fn protocol(&self) -> LayerType {
        self.protocol
    }

    /// The shared endpoint kind.
    pub fn kind(&self) -> EndpointKind {
        self.src.kind
    }

    /// Source endpoint.
    pub fn src(&self) -> Endpoint {
        self.src
    }

    /// Destination endpoint.
    pub fn dst(&self) -> Endpoint {
        self.dst
    }

    /// Both endpoints as a (src, dst) pair.
    pub fn endpoints(&self) -> (Endpoint, Endpoint) {
        (self.src, self.dst)
    }

    /// The same flow in the opposite direction.
    #[must_use]
    pub fn reverse(&self) -> Flow {
        Flow {
            protocol: self.protocol,
            src: self.dst,
            dst: self.src,
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}
