//! Capacity-bounded section writer.
//!
//! A [`Section`] is an append-only bit buffer with a hard byte budget.
//! Writes that would exceed the budget are rejected and leave the buffer
//! untouched. Length fields whose value is only known once the content is
//! final are written as placeholders and backpatched.
//!
//! Sealing a section fills in `section_length`, hands the bytes to a
//! [`SectionTrailer`] (normally [`Crc32Mpeg2`]) and freezes the result into
//! a read-only [`SealedSection`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::bits;
use crate::crc::crc32_mpeg2;
use crate::error::SectionError;

/// Bytes up to and including the section_length field.
pub const SECTION_PREFIX_LEN: usize = 3;

/// Offset of the 16-bit word holding the 12-bit section_length.
const SECTION_LENGTH_OFFSET: usize = 1;

/// Appends trailing integrity bytes to a finished section.
pub trait SectionTrailer {
    /// Number of bytes `append` adds.
    fn trailer_len(&self) -> usize;

    /// Appends the trailer computed over `section`.
    fn append(&self, section: &mut BytesMut);
}

/// MPEG-2 CRC32 trailer (4 bytes, big endian).
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Mpeg2;

impl SectionTrailer for Crc32Mpeg2 {
    fn trailer_len(&self) -> usize {
        4
    }

    fn append(&self, section: &mut BytesMut) {
        let crc = crc32_mpeg2(&section[..]);
        section.put_u32(crc);
    }
}

/// No trailer at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrailer;

impl SectionTrailer for NoTrailer {
    fn trailer_len(&self) -> usize {
        0
    }

    fn append(&self, _section: &mut BytesMut) {}
}

/// A section under construction.
#[derive(Debug)]
pub struct Section {
    buf: BytesMut,
    /// Bits not yet flushed to `buf` (right aligned).
    pending: u16,
    pending_bits: u8,
    capacity: usize,
    /// Tail bytes held back for fields written later (trailer included).
    reserved: usize,
    trailer_len: usize,
}

impl Section {
    /// Create an empty section with a total byte budget of `capacity`,
    /// `trailer_len` of which is held back for the trailer.
    pub fn new(capacity: usize, trailer_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            pending: 0,
            pending_bits: 0,
            capacity,
            reserved: trailer_len,
            trailer_len,
        }
    }

    /// Total byte budget, trailer included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes touched so far, counting a partially written byte.
    pub fn len(&self) -> usize {
        self.buf.len() + usize::from(self.pending_bits > 0)
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free byte budget after content and reservations.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity
            .saturating_sub(self.reserved)
            .saturating_sub(self.len())
    }

    /// Fully written bytes. A trailing partial byte is not included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Current byte offset. Fails mid-byte.
    pub fn position(&self) -> Result<usize, SectionError> {
        if self.pending_bits != 0 {
            return Err(SectionError::Unaligned);
        }
        Ok(self.buf.len())
    }

    /// Append the low `width` bits of `value`, most significant bit first.
    pub fn write(&mut self, value: u32, width: u8) -> Result<(), SectionError> {
        if width == 0 || width > 32 {
            return Err(SectionError::InvalidWidth(width));
        }
        if !bits::fits(value, width) {
            return Err(SectionError::ValueTooWide { value, width });
        }

        let total_bits = self.buf.len() * 8 + self.pending_bits as usize + width as usize;
        self.check_room(total_bits.div_ceil(8))?;

        let mut remaining = width;
        while remaining > 0 {
            let take = remaining.min(8 - self.pending_bits);
            let shift = remaining - take;
            let chunk = (value >> shift) & bits::mask(take);
            self.pending = (self.pending << take) | chunk as u16;
            self.pending_bits += take;
            remaining -= take;

            if self.pending_bits == 8 {
                self.buf.put_u8(self.pending as u8);
                self.pending = 0;
                self.pending_bits = 0;
            }
        }
        Ok(())
    }

    /// Append a boolean as a single bit.
    pub fn write_flag(&mut self, flag: bool) -> Result<(), SectionError> {
        self.write(u32::from(flag), 1)
    }

    /// Append raw bytes. Requires byte alignment.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), SectionError> {
        if self.pending_bits != 0 {
            return Err(SectionError::Unaligned);
        }
        self.check_room(self.buf.len() + data.len())?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// Append an 8-bit length followed by the bytes of `text`.
    pub fn write_string(&mut self, text: &[u8]) -> Result<(), SectionError> {
        if text.len() > u8::MAX as usize {
            return Err(SectionError::StringTooLong(text.len()));
        }
        if self.pending_bits != 0 {
            return Err(SectionError::Unaligned);
        }
        self.check_room(self.buf.len() + 1 + text.len())?;
        self.buf.put_u8(text.len() as u8);
        self.buf.put_slice(text);
        Ok(())
    }

    /// Hold back `n` bytes of budget for a field written later.
    pub fn reserve(&mut self, n: usize) -> Result<(), SectionError> {
        let remaining = self.remaining_capacity();
        if n > remaining {
            return Err(SectionError::CapacityExceeded {
                needed: n,
                remaining,
            });
        }
        self.reserved += n;
        Ok(())
    }

    /// Return `n` previously reserved bytes to the budget.
    ///
    /// The trailer reservation is never released this way.
    pub fn release(&mut self, n: usize) {
        let releasable = self.reserved - self.trailer_len;
        debug_assert!(n <= releasable, "releasing more than was reserved");
        self.reserved -= n.min(releasable);
    }

    /// Overwrite the bits selected by `mask` in the big-endian word at
    /// `offset`.
    pub fn patch_u16(&mut self, offset: usize, mask: u16, value: u16) -> Result<(), SectionError> {
        let len = self.buf.len();
        if offset + 2 > len {
            return Err(SectionError::PatchOutOfRange { offset, len });
        }
        let word = u16::from_be_bytes([self.buf[offset], self.buf[offset + 1]]);
        let patched = (word & !mask) | (value & mask);
        self.buf[offset..offset + 2].copy_from_slice(&patched.to_be_bytes());
        Ok(())
    }

    /// Overwrite the byte at `offset`.
    pub fn patch_u8(&mut self, offset: usize, value: u8) -> Result<(), SectionError> {
        let len = self.buf.len();
        if offset >= len {
            return Err(SectionError::PatchOutOfRange { offset, len });
        }
        self.buf[offset] = value;
        Ok(())
    }

    /// Backpatch `section_length`, append the trailer and freeze.
    ///
    /// `trailer` must report the same length the section was created with.
    pub fn seal(mut self, trailer: &dyn SectionTrailer) -> Result<SealedSection, SectionError> {
        if self.pending_bits != 0 {
            return Err(SectionError::Unaligned);
        }
        debug_assert_eq!(trailer.trailer_len(), self.trailer_len);

        let used = self.buf.len();
        if used < SECTION_PREFIX_LEN {
            return Err(SectionError::PatchOutOfRange {
                offset: SECTION_LENGTH_OFFSET,
                len: used,
            });
        }
        let section_length = used - SECTION_PREFIX_LEN + trailer.trailer_len();
        if !bits::fits(section_length as u32, bits::LENGTH_BITS) {
            return Err(SectionError::LengthOverflow(section_length));
        }
        self.patch_u16(
            SECTION_LENGTH_OFFSET,
            bits::length_mask(),
            section_length as u16,
        )?;

        trailer.append(&mut self.buf);
        Ok(SealedSection {
            data: self.buf.freeze(),
            trailer_len: trailer.trailer_len(),
        })
    }

    fn check_room(&self, total_after: usize) -> Result<(), SectionError> {
        let limit = self.capacity.saturating_sub(self.reserved);
        if total_after > limit {
            return Err(SectionError::CapacityExceeded {
                needed: total_after - self.len(),
                remaining: self.remaining_capacity(),
            });
        }
        Ok(())
    }
}

/// A finished, read-only section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSection {
    data: Bytes,
    trailer_len: usize,
}

impl SealedSection {
    /// Complete section bytes, trailer included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Cheap clone of the underlying buffer.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length section (never produced by a table).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Table ID (first byte).
    pub fn table_id(&self) -> u8 {
        self.data[0]
    }

    /// The 12-bit section_length field.
    pub fn section_length(&self) -> u16 {
        u16::from_be_bytes([self.data[1], self.data[2]]) & bits::length_mask()
    }

    /// section_number of a long-form section.
    pub fn section_number(&self) -> Option<u8> {
        self.data.get(6).copied()
    }

    /// last_section_number of a long-form section.
    pub fn last_section_number(&self) -> Option<u8> {
        self.data.get(7).copied()
    }

    /// Bytes after the 8-byte long header and before the trailer.
    pub fn body(&self) -> &[u8] {
        let end = self.data.len() - self.trailer_len;
        self.data.get(8..end).unwrap_or(&[])
    }

    /// Trailer bytes.
    pub fn trailer(&self) -> &[u8] {
        &self.data[self.data.len() - self.trailer_len..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits_msb_first() {
        let mut s = Section::new(16, 0);
        s.write(0b101, 3).unwrap();
        s.write(0x1F, 5).unwrap();
        s.write(0xE100 & 0x1FFF, 13).unwrap();
        s.write(0b111, 3).unwrap();
        assert_eq!(s.as_bytes(), &[0xBF, 0x08, 0x07]);
    }

    #[test]
    fn test_write_32_bits() {
        let mut s = Section::new(8, 0);
        s.write(0xDEADBEEF, 32).unwrap();
        assert_eq!(s.as_bytes(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_write_rejects_bad_width_and_value() {
        let mut s = Section::new(8, 0);
        assert_eq!(s.write(0, 0), Err(SectionError::InvalidWidth(0)));
        assert_eq!(s.write(0, 33), Err(SectionError::InvalidWidth(33)));
        assert_eq!(
            s.write(0x2000, 13),
            Err(SectionError::ValueTooWide {
                value: 0x2000,
                width: 13
            })
        );
        assert!(s.is_empty());
    }

    #[test]
    fn test_capacity_rejects_without_side_effect() {
        let mut s = Section::new(4, 0);
        s.write_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(s.remaining_capacity(), 1);

        let err = s.write(0xABCD, 16).unwrap_err();
        assert_eq!(
            err,
            SectionError::CapacityExceeded {
                needed: 2,
                remaining: 1
            }
        );
        assert!(s.write_bytes(&[4, 5]).is_err());
        assert_eq!(s.as_bytes(), &[1, 2, 3]);

        s.write(0xAB, 8).unwrap();
        assert_eq!(s.remaining_capacity(), 0);
    }

    #[test]
    fn test_partial_byte_counts_against_capacity() {
        let mut s = Section::new(1, 0);
        s.write(1, 1).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.remaining_capacity(), 0);
        s.write(0x7F, 7).unwrap();
        assert!(s.write(1, 1).is_err());
        assert_eq!(s.as_bytes(), &[0xFF]);
    }

    #[test]
    fn test_byte_ops_need_alignment() {
        let mut s = Section::new(8, 0);
        s.write(1, 4).unwrap();
        assert_eq!(s.write_bytes(&[1]), Err(SectionError::Unaligned));
        assert_eq!(s.write_string(b"a"), Err(SectionError::Unaligned));
        assert_eq!(s.position(), Err(SectionError::Unaligned));
    }

    #[test]
    fn test_write_string() {
        let mut s = Section::new(8, 0);
        s.write_string(b"abc").unwrap();
        assert_eq!(s.as_bytes(), &[3, b'a', b'b', b'c']);

        let long = vec![0u8; 256];
        let mut big = Section::new(512, 0);
        assert_eq!(big.write_string(&long), Err(SectionError::StringTooLong(256)));
    }

    #[test]
    fn test_reserve_and_release() {
        let mut s = Section::new(10, 4);
        assert_eq!(s.remaining_capacity(), 6);
        s.reserve(2).unwrap();
        assert_eq!(s.remaining_capacity(), 4);
        assert!(s.write_bytes(&[0; 5]).is_err());
        s.write_bytes(&[0; 4]).unwrap();
        s.release(2);
        assert_eq!(s.remaining_capacity(), 2);
        assert!(s.reserve(3).is_err());
    }

    #[test]
    fn test_patch() {
        let mut s = Section::new(8, 0);
        s.write(0xF, 4).unwrap();
        s.write(0, 12).unwrap();
        s.patch_u16(0, bits::length_mask(), 0x123).unwrap();
        assert_eq!(s.as_bytes(), &[0xF1, 0x23]);
        s.patch_u8(1, 0x45).unwrap();
        assert_eq!(s.as_bytes(), &[0xF1, 0x45]);
        assert!(s.patch_u16(1, 0xFFFF, 0).is_err());
        assert!(s.patch_u8(2, 0).is_err());
    }

    #[test]
    fn test_seal_backpatches_length_and_appends_crc() {
        let mut s = Section::new(32, 4);
        s.write(0x40, 8).unwrap();
        s.write(0xF, 4).unwrap();
        s.write(0, 12).unwrap();
        s.write_bytes(&[0xAA, 0xBB]).unwrap();

        let sealed = s.seal(&Crc32Mpeg2).unwrap();
        assert_eq!(sealed.len(), 9);
        assert_eq!(sealed.table_id(), 0x40);
        assert_eq!(sealed.section_length(), 6);
        assert_eq!(&sealed.as_bytes()[..5], &[0x40, 0xF0, 0x06, 0xAA, 0xBB]);
        assert_eq!(crc32_mpeg2(sealed.as_bytes()), 0);
        assert_eq!(sealed.trailer().len(), 4);
    }

    #[test]
    fn test_seal_without_trailer() {
        let mut s = Section::new(8, 0);
        s.write_bytes(&[0x02, 0xB0, 0x00, 0x01]).unwrap();
        let sealed = s.seal(&NoTrailer).unwrap();
        assert_eq!(sealed.as_bytes(), &[0x02, 0xB0, 0x01, 0x01]);
    }

    #[test]
    fn test_seal_requires_header() {
        let mut s = Section::new(8, 0);
        s.write(0x40, 8).unwrap();
        assert!(s.seal(&NoTrailer).is_err());
    }
}
