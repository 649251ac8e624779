//! The packet decode engine.
//!
//! Decoding is a chain: each decoder consumes its header from the front of
//! the remaining window, pushes one [`DecodedLayer`], and names the next
//! layer type. The engine owns the cursor and the window limit; decoders
//! narrow the limit when their header declares a payload length smaller
//! than the bytes present (link-layer trailers), and mark the packet
//! truncated when it declares more than are present.
//!
//! A decoder fault never aborts the chain retroactively: layers already
//! decoded stay, and the fault becomes a terminal decode-failure layer over
//! the bytes that could not be decoded.
//!
//! Lazy accessors take `&mut self` because they decode on demand; the
//! packet is a single-owner handle. `truncated` and `is_complete` are
//! observations of progress so far and stay `&self`.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::{DecodeError, LayerError};
use crate::layer::{
    types, DecodeFailureFields, DecodedLayer, LayerCategory, LayerClass, LayerFields, LayerType,
    LayerView,
};
use crate::registry::{LayerRegistry, NextLayer};

/// How the engine treats work and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Decode layers on demand instead of up front.
    pub lazy: bool,
    /// Borrow the caller's buffer instead of copying it. The packet then
    /// cannot outlive the input slice.
    pub no_copy: bool,
}

impl DecodeOptions {
    /// Eager, copying. Safe to hold after the input buffer is gone.
    pub const DEFAULT: DecodeOptions = DecodeOptions {
        lazy: false,
        no_copy: false,
    };
    pub const LAZY: DecodeOptions = DecodeOptions {
        lazy: true,
        no_copy: false,
    };
    pub const NO_COPY: DecodeOptions = DecodeOptions {
        lazy: false,
        no_copy: true,
    };
    pub const LAZY_NO_COPY: DecodeOptions = DecodeOptions {
        lazy: true,
        no_copy: true,
    };
}

/// A decoded (or decoding) packet.
pub struct Packet<'a> {
    buffer: Cow<'a, [u8]>,
    registry: Arc<LayerRegistry>,
    layers: Vec<DecodedLayer>,
    /// Start of the undecoded window.
    cursor: usize,
    /// End of the undecoded window; narrowed below the buffer end when a
    /// header's declared length excludes trailer bytes.
    limit: usize,
    next_layer: Option<LayerType>,
    truncated: bool,
    link: Option<usize>,
    network: Option<usize>,
    transport: Option<usize>,
    application: Option<usize>,
    failure: Option<usize>,
}

impl<'a> Packet<'a> {
    pub(crate) fn decode(
        registry: Arc<LayerRegistry>,
        data: &'a [u8],
        first: LayerType,
        options: DecodeOptions,
    ) -> Result<Self, DecodeError> {
        if !registry.contains(first) {
            return Err(DecodeError::UnknownLayerType(first));
        }
        let buffer = if options.no_copy {
            Cow::Borrowed(data)
        } else {
            Cow::Owned(data.to_vec())
        };
        let mut packet = Packet {
            limit: buffer.len(),
            buffer,
            registry,
            layers: Vec::new(),
            cursor: 0,
            next_layer: Some(first),
            truncated: false,
            link: None,
            network: None,
            transport: None,
            application: None,
            failure: None,
        };
        if !options.lazy {
            packet.decode_all();
        }
        Ok(packet)
    }

    /// The full backing buffer.
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// True once any decoder found fewer bytes than a header declared.
    /// Under lazy decoding this reflects the layers decoded so far.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// True once the chain has ended, by completion, unknown next layer,
    /// or decoder fault.
    pub fn is_complete(&self) -> bool {
        self.next_layer.is_none()
    }

    /// Decode one more layer. Returns its index, or `None` once the chain
    /// has ended.
    pub fn decode_next_layer(&mut self) -> Option<usize> {
        let before = self.layers.len();
        if self.advance() && self.layers.len() > before {
            Some(before)
        } else {
            None
        }
    }

    /// Decode everything that remains.
    pub fn decode_all(&mut self) {
        while self.advance() {}
    }

    fn advance(&mut self) -> bool {
        let Some(next) = self.next_layer else {
            return false;
        };
        if self.cursor >= self.limit {
            self.next_layer = None;
            return false;
        }
        let Some(decode) = self.registry.decoder(next) else {
            trace!(layer_type = next.0, "no decoder, finishing with payload");
            self.finish_with_payload();
            return true;
        };
        trace!(layer_type = next.0, offset = self.cursor, "decoding layer");
        let mut ctx = DecodeContext { packet: self };
        match decode(&mut ctx) {
            Ok(NextLayer::Layer(t)) => self.next_layer = Some(t),
            Ok(NextLayer::Done) => self.next_layer = None,
            Err(error) => self.push_failure(error),
        }
        true
    }

    fn finish_with_payload(&mut self) {
        let window = self.cursor..self.limit;
        self.push(DecodedLayer {
            layer_type: types::PAYLOAD,
            contents: window.clone(),
            payload: window,
            fields: LayerFields::Payload,
        });
        self.cursor = self.limit;
        self.next_layer = None;
    }

    fn push_failure(&mut self, error: LayerError) {
        let window = self.cursor..self.limit;
        self.push(DecodedLayer {
            layer_type: types::DECODE_FAILURE,
            contents: window,
            payload: self.limit..self.limit,
            fields: LayerFields::DecodeFailure(DecodeFailureFields { error }),
        });
        self.failure = Some(self.layers.len() - 1);
        self.cursor = self.limit;
        self.next_layer = None;
    }

    fn push(&mut self, layer: DecodedLayer) {
        let index = self.layers.len();
        // Last writer wins: an inner tunneled layer re-designates its
        // category.
        match layer.fields.category() {
            Some(LayerCategory::Link) => self.link = Some(index),
            Some(LayerCategory::Network) => self.network = Some(index),
            Some(LayerCategory::Transport) => self.transport = Some(index),
            Some(LayerCategory::Application) => self.application = Some(index),
            None => {}
        }
        self.layers.push(layer);
    }

    fn find_or_decode(&mut self, pred: impl Fn(&DecodedLayer) -> bool) -> Option<usize> {
        let mut i = 0;
        loop {
            while i < self.layers.len() {
                if pred(&self.layers[i]) {
                    return Some(i);
                }
                i += 1;
            }
            if self.decode_next_layer().is_none() {
                return None;
            }
        }
    }

    /// The first layer of the given type, decoding as far as needed.
    pub fn layer(&mut self, layer_type: LayerType) -> Option<LayerView<'_, 'a>> {
        self.find_or_decode(|l| l.layer_type == layer_type)
            .map(|index| LayerView {
                packet: self,
                index,
            })
    }

    /// The first layer whose type belongs to the class.
    pub fn layer_class(&mut self, class: &LayerClass) -> Option<LayerView<'_, 'a>> {
        self.find_or_decode(|l| class.contains(l.layer_type))
            .map(|index| LayerView {
                packet: self,
                index,
            })
    }

    /// All layers of the given type, in decode order.
    pub fn layers_of(
        &mut self,
        layer_type: LayerType,
    ) -> impl Iterator<Item = LayerView<'_, 'a>> {
        self.decode_all();
        let packet: &Packet<'a> = self;
        packet
            .layers
            .iter()
            .enumerate()
            .filter(move |(_, l)| l.layer_type == layer_type)
            .map(move |(index, _)| LayerView { packet, index })
    }

    /// All layers whose type belongs to the class, in decode order.
    pub fn layers_of_class<'p>(
        &'p mut self,
        class: &LayerClass,
    ) -> impl Iterator<Item = LayerView<'p, 'a>> {
        self.decode_all();
        let class = class.clone();
        let packet: &'p Packet<'a> = self;
        packet
            .layers
            .iter()
            .enumerate()
            .filter(move |(_, l)| class.contains(l.layer_type))
            .map(move |(index, _)| LayerView { packet, index })
    }

    /// All layers in decode order, forcing a full decode.
    pub fn layers(&mut self) -> Layers<'_, 'a> {
        self.decode_all();
        Layers {
            packet: self,
            index: 0,
        }
    }

    /// Number of layers decoded so far.
    pub fn decoded_len(&self) -> usize {
        self.layers.len()
    }

    fn category_layer(&mut self, category: LayerCategory) -> Option<LayerView<'_, 'a>> {
        // Designation is last-wins, so only a full decode gives the final
        // answer.
        self.decode_all();
        let index = match category {
            LayerCategory::Link => self.link,
            LayerCategory::Network => self.network,
            LayerCategory::Transport => self.transport,
            LayerCategory::Application => self.application,
        }?;
        Some(LayerView {
            packet: self,
            index,
        })
    }

    /// The designated link layer (innermost when tunneled).
    pub fn link_layer(&mut self) -> Option<LayerView<'_, 'a>> {
        self.category_layer(LayerCategory::Link)
    }

    /// The designated network layer (innermost when tunneled).
    pub fn network_layer(&mut self) -> Option<LayerView<'_, 'a>> {
        self.category_layer(LayerCategory::Network)
    }

    /// The designated transport layer (innermost when tunneled).
    pub fn transport_layer(&mut self) -> Option<LayerView<'_, 'a>> {
        self.category_layer(LayerCategory::Transport)
    }

    /// The designated application layer.
    pub fn application_layer(&mut self) -> Option<LayerView<'_, 'a>> {
        self.category_layer(LayerCategory::Application)
    }

    /// The terminal decode-failure layer, if any decoder faulted.
    pub fn error_layer(&mut self) -> Option<LayerView<'_, 'a>> {
        self.decode_all();
        let index = self.failure?;
        Some(LayerView {
            packet: self,
            index,
        })
    }

    /// View of an already-decoded layer by index.
    pub fn view(&self, index: usize) -> Option<LayerView<'_, 'a>> {
        (index < self.layers.len()).then_some(LayerView {
            packet: self,
            index,
        })
    }

    /// Detach the packet from the input buffer's lifetime, copying the
    /// buffer if it was borrowed. Free when the packet was decoded in copy
    /// mode.
    pub fn into_owned(self) -> Packet<'static> {
        Packet {
            buffer: Cow::Owned(self.buffer.into_owned()),
            registry: self.registry,
            layers: self.layers,
            cursor: self.cursor,
            limit: self.limit,
            next_layer: self.next_layer,
            truncated: self.truncated,
            link: self.link,
            network: self.network,
            transport: self.transport,
            application: self.application,
            failure: self.failure,
        }
    }

    pub(crate) fn layer_record(&self, index: usize) -> &DecodedLayer {
        &self.layers[index]
    }

    pub(crate) fn registry(&self) -> &LayerRegistry {
        &self.registry
    }
}

impl fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<String> = self.layers.iter().map(|l| l.layer_type.to_string()).collect();
        f.debug_struct("Packet")
            .field("len", &self.buffer.len())
            .field("layers", &types)
            .field("truncated", &self.truncated)
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// Iterator over all decoded layers of a packet.
pub struct Layers<'p, 'a> {
    packet: &'p Packet<'a>,
    index: usize,
}

impl<'p, 'a> Iterator for Layers<'p, 'a> {
    type Item = LayerView<'p, 'a>;

    fn next(&mut self) -> Option<LayerView<'p, 'a>> {
        let view = self.packet.view(self.index)?;
        self.index += 1;
        Some(view)
    }
}

/// What a decoder sees: the remaining window plus push operations.
pub struct DecodeContext<'p, 'a> {
    packet: &'p mut Packet<'a>,
}

impl DecodeContext<'_, '_> {
    /// The undecoded window this decoder must read its header from.
    pub fn remaining(&self) -> &[u8] {
        &self.packet.buffer[self.packet.cursor..self.packet.limit]
    }

    /// Absolute offset of the window start, for building stored byte ranges.
    pub fn offset(&self) -> usize {
        self.packet.cursor
    }

    /// Record that declared lengths exceed the bytes present.
    pub fn mark_truncated(&mut self) {
        self.packet.truncated = true;
    }

    pub fn truncated(&self) -> bool {
        self.packet.truncated
    }

    /// EtherType dispatch against the packet's registry.
    pub fn layer_for_ethertype(&self, ethertype: u16) -> Option<LayerType> {
        self.packet.registry().layer_for_ethertype(ethertype)
    }

    /// Push a layer whose payload is everything after its header.
    pub fn push_layer(&mut self, fields: LayerFields, header_len: usize) {
        let start = self.packet.cursor;
        let header_end = start + header_len;
        debug_assert!(header_end <= self.packet.limit);
        self.packet.push(DecodedLayer {
            layer_type: fields.layer_type(),
            contents: start..header_end,
            payload: header_end..self.packet.limit,
            fields,
        });
        self.packet.cursor = header_end;
    }

    /// Push a layer whose header declares its payload length.
    ///
    /// A declared length beyond the window marks the packet truncated and
    /// clamps to the bytes present; a shorter one narrows the window so
    /// trailer bytes never reach inner decoders.
    pub fn push_layer_bounded(
        &mut self,
        fields: LayerFields,
        header_len: usize,
        payload_len: usize,
    ) {
        let start = self.packet.cursor;
        let header_end = start + header_len;
        debug_assert!(header_end <= self.packet.limit);
        let available = self.packet.limit - header_end;
        let actual = if payload_len > available {
            self.packet.truncated = true;
            available
        } else {
            payload_len
        };
        self.packet.limit = header_end + actual;
        self.packet.push(DecodedLayer {
            layer_type: fields.layer_type(),
            contents: start..header_end,
            payload: header_end..self.packet.limit,
            fields,
        });
        self.packet.cursor = header_end;
    }

    /// Push a terminal layer consuming the whole window. A payload layer's
    /// contents and payload are both the window; any other terminal owns
    /// the window as contents and carries no payload.
    pub fn push_terminal(&mut self, fields: LayerFields) {
        let window = self.packet.cursor..self.packet.limit;
        let payload = if matches!(fields, LayerFields::Payload) {
            window.clone()
        } else {
            self.packet.limit..self.packet.limit
        };
        self.packet.push(DecodedLayer {
            layer_type: fields.layer_type(),
            contents: window,
            payload,
            fields,
        });
        self.packet.cursor = self.packet.limit;
    }
}
