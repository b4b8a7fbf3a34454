//! Error types for section, descriptor and table encoding.

use thiserror::Error;

/// Errors raised by the section bit writer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    /// The write would run past the section's byte budget.
    #[error("Section capacity exceeded: need {needed} bytes, {remaining} remaining")]
    CapacityExceeded { needed: usize, remaining: usize },

    /// Bit width outside 1..=32.
    #[error("Invalid bit width: {0} (expected 1..=32)")]
    InvalidWidth(u8),

    /// Value has bits set above the requested width.
    #[error("Value 0x{value:X} does not fit in {width} bits")]
    ValueTooWide { value: u32, width: u8 },

    /// Byte-oriented operation attempted mid-byte.
    #[error("Write position is not byte aligned")]
    Unaligned,

    /// String longer than an 8-bit length prefix can express.
    #[error("String too long for 8-bit length prefix: {0} bytes")]
    StringTooLong(usize),

    /// Backpatch target lies outside the written bytes.
    #[error("Patch offset {offset} out of range (section is {len} bytes)")]
    PatchOutOfRange { offset: usize, len: usize },

    /// Content does not fit the 12-bit section_length field.
    #[error("Section length {0} exceeds the 12-bit length field")]
    LengthOverflow(usize),
}

/// Construction-time refusals of descriptor content.
///
/// The descriptor is left unchanged whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Adding the content would push the payload past 255 bytes.
    #[error("Descriptor 0x{tag:02X} full: {requested} bytes requested, {available} available")]
    CapacityExceeded {
        tag: u8,
        requested: usize,
        available: usize,
    },

    /// No cell with the given id has been added.
    #[error("Unknown cell id: 0x{0:04X}")]
    UnknownCell(u16),

    /// A sub-cell was added before any cell.
    #[error("No cell to attach the sub-cell to")]
    NoCell,

    /// Language codes are exactly three ASCII characters.
    #[error("Invalid ISO 639 language code: {0:?}")]
    InvalidLanguageCode(String),

    /// A field value is wider than its wire representation.
    #[error("Field {field} out of range: 0x{value:X}")]
    FieldOutOfRange { field: &'static str, value: u32 },
}

/// Errors raised while building or paginating a table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// No transport stream with the given id exists in the NIT.
    #[error("Unknown transport stream: 0x{0:04X}")]
    UnknownTransportStream(u16),

    /// A transport stream descriptor was added before any transport stream.
    #[error("No transport stream to attach the descriptor to")]
    NoTransportStream,

    /// No elementary stream with the given PID exists in the PMT.
    #[error("Unknown elementary stream PID: 0x{0:04X}")]
    UnknownElementaryStream(u16),

    /// An elementary stream descriptor was added before any stream.
    #[error("No elementary stream to attach the descriptor to")]
    NoElementaryStream,

    /// The PID is already used by another elementary stream of this program.
    #[error("Duplicate elementary stream PID: 0x{0:04X}")]
    DuplicateElementaryStream(u16),

    /// PIDs are 13 bits wide.
    #[error("Invalid PID: 0x{0:04X}")]
    InvalidPid(u16),

    /// Version numbers are 5 bits wide.
    #[error("Invalid version number: {0}")]
    InvalidVersion(u8),

    /// Configured maximum section length cannot hold every valid item.
    #[error("Invalid maximum section length: {len} (allowed {min}..={max})")]
    InvalidSectionLength { len: usize, min: usize, max: usize },

    /// A single item does not fit in an empty section.
    ///
    /// This is a configuration fault: no valid encoding exists.
    #[error("Table 0x{table_id:02X}: item does not fit in empty section {section_number} ({capacity} bytes)")]
    ItemTooLarge {
        table_id: u8,
        section_number: usize,
        capacity: usize,
    },

    /// section_number is 8 bits wide.
    #[error("Table 0x{table_id:02X}: content needs more than 256 sections")]
    TooManySections { table_id: u8 },

    /// Error from the underlying section writer.
    #[error(transparent)]
    Section(#[from] SectionError),
}
