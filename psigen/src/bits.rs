//! Shift/mask helpers for packed sub-byte fields.
//!
//! PSI syntax packs narrow fields (13-bit PIDs, 5-bit versions, 12-bit
//! lengths) together with reserved bits. These helpers keep that packing
//! explicit instead of relying on any native bit-field layout.

/// Width of a PID field.
pub const PID_BITS: u8 = 13;

/// Width of a version_number field.
pub const VERSION_BITS: u8 = 5;

/// Width of the 12-bit length fields (section_length, loop lengths).
pub const LENGTH_BITS: u8 = 12;

/// Largest valid PID.
pub const MAX_PID: u16 = 0x1FFF;

/// Low `width` bits set. `width` of 32 or more yields all ones.
pub const fn mask(width: u8) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Returns true if `value` is representable in `width` bits.
pub const fn fits(value: u32, width: u8) -> bool {
    value & !mask(width) == 0
}

/// Packs `value` into the low `width` bits of a `total`-bit word, setting
/// every higher (reserved) bit to 1.
///
/// `with_reserved(0x100, 13, 16)` is the on-wire form of PID 0x100:
/// `0xE100`.
pub const fn with_reserved(value: u32, width: u8, total: u8) -> u32 {
    (mask(total) & !mask(width)) | (value & mask(width))
}

/// Mask selecting a 12-bit length inside its 16-bit word.
pub const fn length_mask() -> u16 {
    mask(LENGTH_BITS) as u16
}
