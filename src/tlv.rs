//! Generic type-length-value record walking.
//!
//! CDP, LLDP, and SCTP chunk bodies all share the same shape: a run of
//! (type, length, value) records back to back in a buffer. The wire layouts
//! of the headers differ, but the validation discipline is identical and
//! lives here once: a record whose declared length exceeds the bytes that
//! remain marks the walk truncated and stops it. Iteration always
//! terminates because every record consumes at least its own header.
//!
//! Protocol decoders supply a [`TlvLayout`] describing only how to read one
//! record header, then drive a [`TlvIter`] and dispatch on type codes.

use std::marker::PhantomData;
use std::ops::Range;

/// Outcome of reading one record header from the front of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRead {
    /// Fewer bytes remain than the header itself needs.
    NeedMore,
    /// The length field is structurally impossible (e.g. a CDP length
    /// smaller than its own header).
    Malformed,
    /// A well-formed header.
    Ok(TlvHeader),
}

/// Parsed header of a single TLV record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvHeader {
    /// Record type code, widened to u16 for all layouts.
    pub type_code: u16,
    /// Flags byte for layouts that carry one (SCTP chunks); zero otherwise.
    pub flags: u8,
    /// Declared length of the value in bytes (excluding the header).
    pub value_len: usize,
    /// Bytes occupied by the type/length header itself.
    pub header_len: usize,
    /// Total record stride including any trailing padding.
    pub advance: usize,
}

/// Wire layout of one TLV family. Implementations only describe how to read
/// a record header; remaining-length validation and truncation handling are
/// shared by [`TlvIter`].
pub trait TlvLayout {
    fn header(data: &[u8]) -> HeaderRead;
}

/// LLDP TLV: 7-bit type and 9-bit length packed into a big-endian u16.
pub enum LldpTlvLayout {}

impl TlvLayout for LldpTlvLayout {
    fn header(data: &[u8]) -> HeaderRead {
        if data.len() < 2 {
            return HeaderRead::NeedMore;
        }
        let tl = u16::from_be_bytes([data[0], data[1]]);
        let value_len = (tl & 0x01ff) as usize;
        HeaderRead::Ok(TlvHeader {
            type_code: tl >> 9,
            flags: 0,
            value_len,
            header_len: 2,
            advance: 2 + value_len,
        })
    }
}

/// CDP TLV: big-endian u16 type and u16 length, length counting the 4-byte
/// header itself.
pub enum CdpTlvLayout {}

impl TlvLayout for CdpTlvLayout {
    fn header(data: &[u8]) -> HeaderRead {
        if data.len() < 4 {
            return HeaderRead::NeedMore;
        }
        let type_code = u16::from_be_bytes([data[0], data[1]]);
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;
        if length < 4 {
            return HeaderRead::Malformed;
        }
        HeaderRead::Ok(TlvHeader {
            type_code,
            flags: 0,
            value_len: length - 4,
            header_len: 4,
            advance: length,
        })
    }
}

/// SCTP chunk: u8 type, u8 flags, big-endian u16 length counting the 4-byte
/// header; records are padded out to 4-byte boundaries.
pub enum SctpChunkLayout {}

impl TlvLayout for SctpChunkLayout {
    fn header(data: &[u8]) -> HeaderRead {
        if data.len() < 4 {
            return HeaderRead::NeedMore;
        }
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;
        if length < 4 {
            return HeaderRead::Malformed;
        }
        HeaderRead::Ok(TlvHeader {
            type_code: data[0] as u16,
            flags: data[1],
            value_len: length - 4,
            header_len: 4,
            advance: (length + 3) & !3,
        })
    }
}

/// A raw record as encountered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTlv<'a> {
    pub type_code: u16,
    pub flags: u8,
    /// Declared value length (equals `value.len()` for yielded records).
    pub declared_len: usize,
    /// Offset of the value within the walked buffer.
    pub value_offset: usize,
    pub value: &'a [u8],
}

/// An unrecognized record preserved in a layer's residual list, with the
/// value kept as a range into the packet's backing buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub type_code: u16,
    pub flags: u8,
    pub declared_len: usize,
    pub value: Range<usize>,
}

impl RawRecord {
    /// Convert a wire record into its stored form, rebasing the value range
    /// onto the packet buffer (`base` = absolute offset of the walked
    /// buffer's first byte).
    pub(crate) fn rebased(tlv: &RawTlv<'_>, base: usize) -> Self {
        RawRecord {
            type_code: tlv.type_code,
            flags: tlv.flags,
            declared_len: tlv.declared_len,
            value: base + tlv.value_offset..base + tlv.value_offset + tlv.value.len(),
        }
    }
}

/// Iterator over the TLV records of a buffer. Never reads past the buffer
/// end; a declared length exceeding the remaining bytes stops the walk and
/// records truncation instead.
pub struct TlvIter<'a, L: TlvLayout> {
    data: &'a [u8],
    offset: usize,
    truncated: bool,
    malformed: bool,
    done: bool,
    _layout: PhantomData<L>,
}

impl<'a, L: TlvLayout> TlvIter<'a, L> {
    pub fn new(data: &'a [u8]) -> Self {
        TlvIter {
            data,
            offset: 0,
            truncated: false,
            malformed: false,
            done: false,
            _layout: PhantomData,
        }
    }

    /// True once a record's declared length exceeded the bytes remaining.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// True once a record header was structurally impossible.
    pub fn malformed(&self) -> bool {
        self.malformed
    }
}

impl<'a, L: TlvLayout> Iterator for TlvIter<'a, L> {
    type Item = RawTlv<'a>;

    fn next(&mut self) -> Option<RawTlv<'a>> {
        if self.done || self.offset >= self.data.len() {
            self.done = true;
            return None;
        }
        let rest = &self.data[self.offset..];
        let header = match L::header(rest) {
            HeaderRead::NeedMore => {
                self.truncated = true;
                self.done = true;
                return None;
            }
            HeaderRead::Malformed => {
                self.malformed = true;
                self.done = true;
                return None;
            }
            HeaderRead::Ok(h) => h,
        };
        if header.header_len + header.value_len > rest.len() {
            self.truncated = true;
            self.done = true;
            return None;
        }
        let value_offset = self.offset + header.header_len;
        let value = &self.data[value_offset..value_offset + header.value_len];
        // Padding past the final record is tolerated.
        self.offset += header.advance.max(header.header_len).min(rest.len());
        Some(RawTlv {
            type_code: header.type_code,
            flags: header.flags,
            declared_len: header.value_len,
            value_offset,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn lldp_walk_yields_records_in_order() {
        // (type 1, len 2), (type 2, len 1), (type 0, len 0) end marker
        let buf = [0x02, 0x02, 0xaa, 0xbb, 0x04, 0x01, 0xcc, 0x00, 0x00];
        let mut iter = TlvIter::<LldpTlvLayout>::new(&buf);
        let first = iter.next().unwrap();
        assert_eq!((first.type_code, first.value), (1, &[0xaa, 0xbb][..]));
        let second = iter.next().unwrap();
        assert_eq!((second.type_code, second.value), (2, &[0xcc][..]));
        let end = iter.next().unwrap();
        assert_eq!((end.type_code, end.value.len()), (0, 0));
        assert!(iter.next().is_none());
        assert!(!iter.truncated());
    }

    #[test]
    fn lldp_declared_length_beyond_buffer_truncates() {
        // type 1, declared len 8, but only 2 value bytes present
        let buf = [0x02, 0x08, 0xaa, 0xbb];
        let mut iter = TlvIter::<LldpTlvLayout>::new(&buf);
        assert!(iter.next().is_none());
        assert!(iter.truncated());
    }

    #[test]
    fn cdp_length_counts_header() {
        // type 0x0001, length 0x0010 = 16 -> 12 value bytes
        let mut buf = vec![0x00, 0x01, 0x00, 0x10];
        buf.extend_from_slice(b"myswitch0123");
        let mut iter = TlvIter::<CdpTlvLayout>::new(&buf);
        let rec = iter.next().unwrap();
        assert_eq!(rec.type_code, 1);
        assert_eq!(rec.value, b"myswitch0123");
        assert!(iter.next().is_none());
    }

    #[test]
    fn cdp_length_below_header_is_malformed() {
        let buf = [0x00, 0x01, 0x00, 0x02, 0xff, 0xff];
        let mut iter = TlvIter::<CdpTlvLayout>::new(&buf);
        assert!(iter.next().is_none());
        assert!(iter.malformed());
        assert!(!iter.truncated());
    }

    #[test]
    fn sctp_chunks_are_padded_to_four_bytes() {
        // DATA chunk, length 6 (2 value bytes), padded to 8; then SACK, length 4
        let buf = [
            0x00, 0x03, 0x00, 0x06, 0xde, 0xad, 0x00, 0x00, // DATA + pad
            0x03, 0x00, 0x00, 0x04, // SACK
        ];
        let mut iter = TlvIter::<SctpChunkLayout>::new(&buf);
        let data = iter.next().unwrap();
        assert_eq!((data.type_code, data.flags, data.value), (0, 3, &[0xde, 0xad][..]));
        let sack = iter.next().unwrap();
        assert_eq!((sack.type_code, sack.value.len()), (3, 0));
        assert!(iter.next().is_none());
        assert!(!iter.truncated());
    }

    #[test]
    fn sctp_missing_final_padding_is_tolerated() {
        // Last chunk declares 5 bytes; padding to 8 is absent at buffer end.
        let buf = [0x00, 0x00, 0x00, 0x05, 0x66];
        let mut iter = TlvIter::<SctpChunkLayout>::new(&buf);
        let chunk = iter.next().unwrap();
        assert_eq!(chunk.value, &[0x66]);
        assert!(iter.next().is_none());
        assert!(!iter.truncated());
    }

    proptest! {
        /// The walk never reads past the buffer and always terminates, for
        /// arbitrary byte soup under every layout.
        #[test]
        fn walk_is_bounded_and_terminates(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut total = 0usize;
            for rec in TlvIter::<LldpTlvLayout>::new(&data) {
                prop_assert!(rec.value_offset + rec.value.len() <= data.len());
                total += 1;
            }
            prop_assert!(total <= data.len() / 2 + 1);

            for rec in TlvIter::<SctpChunkLayout>::new(&data) {
                prop_assert!(rec.value_offset + rec.value.len() <= data.len());
            }
            for rec in TlvIter::<CdpTlvLayout>::new(&data) {
                prop_assert!(rec.value_offset + rec.value.len() <= data.len());
            }
        }
    }
}
