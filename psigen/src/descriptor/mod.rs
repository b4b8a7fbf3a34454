//! Descriptors: self-describing `tag | length | payload` records.
//!
//! Every descriptor is a closed [`Descriptor`] variant whose body
//! implements [`DescriptorBody`]. The 8-bit length on the wire is always
//! computed from the current payload, never stored.
//!
//! Payloads share one ceiling, [`MAX_PAYLOAD_LEN`]. Fixed-shape additions
//! that would cross it are refused via [`try_grow`]; free text is cut at
//! the ceiling via [`grow_with_truncation`].

mod data_broadcast;
mod frequency;
mod linkage;
mod numeric;
mod text;

pub use data_broadcast::{SsuDataBroadcastIdDescriptor, SsuOuiEntry, SSU_DATA_BROADCAST_ID};
pub use frequency::{Cell, CellFrequencyLinkDescriptor, FrequencyListDescriptor, SubCell};
pub use linkage::{OuiEntry, ScanTableType, SsuLinkageDescriptor, SsuScanLinkageDescriptor};
pub use numeric::{NumericDescriptor, NumericWidth};
pub use text::{LanguageCode, LanguageText, MultilingualTextDescriptor, TextDescriptor};

use log::debug;

use crate::error::{DescriptorError, SectionError};
use crate::section::Section;

/// tag + length bytes.
pub const HEADER_LEN: usize = 2;

/// Largest payload an 8-bit length can describe.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Largest on-wire descriptor.
pub const MAX_DESCRIPTOR_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN;

/// Descriptor tags used by this crate.
pub mod tag {
    /// Network name descriptor.
    pub const NETWORK_NAME: u8 = 0x40;
    /// Stuffing descriptor.
    pub const STUFFING: u8 = 0x42;
    /// Bouquet name descriptor.
    pub const BOUQUET_NAME: u8 = 0x47;
    /// Linkage descriptor.
    pub const LINKAGE: u8 = 0x4A;
    /// Time shifted service descriptor.
    pub const TIME_SHIFTED_SERVICE: u8 = 0x4C;
    /// Stream identifier descriptor.
    pub const STREAM_IDENTIFIER: u8 = 0x52;
    /// Multilingual network name descriptor.
    pub const MULTILINGUAL_NETWORK_NAME: u8 = 0x5B;
    /// Multilingual bouquet name descriptor.
    pub const MULTILINGUAL_BOUQUET_NAME: u8 = 0x5C;
    /// Private data specifier descriptor.
    pub const PRIVATE_DATA_SPECIFIER: u8 = 0x5F;
    /// Frequency list descriptor.
    pub const FREQUENCY_LIST: u8 = 0x62;
    /// Data broadcast id descriptor.
    pub const DATA_BROADCAST_ID: u8 = 0x66;
    /// Cell frequency link descriptor.
    pub const CELL_FREQUENCY_LINK: u8 = 0x6D;
}

/// Encoding contract shared by every descriptor body.
pub trait DescriptorBody {
    /// Descriptor tag.
    fn tag(&self) -> u8;

    /// Payload bytes, excluding the 2-byte header. Never above
    /// [`MAX_PAYLOAD_LEN`].
    fn payload_len(&self) -> usize;

    /// Write the payload (header excluded).
    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError>;
}

/// Check that `extra` payload bytes can be added on top of `current`.
///
/// Succeeds iff the resulting payload stays within [`MAX_PAYLOAD_LEN`].
pub fn try_grow(tag: u8, current: usize, extra: usize) -> Result<(), DescriptorError> {
    let available = MAX_PAYLOAD_LEN.saturating_sub(current);
    if extra > available {
        return Err(DescriptorError::CapacityExceeded {
            tag,
            requested: extra,
            available,
        });
    }
    Ok(())
}

/// Take as much of `text` as fits on top of `current` payload bytes.
///
/// Always succeeds; bytes past the ceiling are dropped.
pub fn grow_with_truncation(tag: u8, current: usize, text: &[u8]) -> Vec<u8> {
    let available = MAX_PAYLOAD_LEN.saturating_sub(current);
    if text.len() > available {
        debug!(
            "descriptor 0x{:02X}: truncated {} byte(s) of text",
            tag,
            text.len() - available
        );
    }
    text[..text.len().min(available)].to_vec()
}

/// Descriptor with caller-supplied payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDescriptor {
    tag: u8,
    payload: Vec<u8>,
}

impl RawDescriptor {
    /// Payloads above the ceiling are refused.
    pub fn new(tag: u8, payload: impl Into<Vec<u8>>) -> Result<Self, DescriptorError> {
        let payload = payload.into();
        try_grow(tag, 0, payload.len())?;
        Ok(Self { tag, payload })
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl DescriptorBody for RawDescriptor {
    fn tag(&self) -> u8 {
        self.tag
    }

    fn payload_len(&self) -> usize {
        self.payload.len()
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        section.write_bytes(&self.payload)
    }
}

/// Any descriptor this crate can encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Numeric(NumericDescriptor),
    Text(TextDescriptor),
    Multilingual(MultilingualTextDescriptor),
    FrequencyList(FrequencyListDescriptor),
    CellFrequencyLink(CellFrequencyLinkDescriptor),
    SsuLinkage(SsuLinkageDescriptor),
    SsuScanLinkage(SsuScanLinkageDescriptor),
    SsuDataBroadcastId(SsuDataBroadcastIdDescriptor),
    Raw(RawDescriptor),
}

impl Descriptor {
    fn body(&self) -> &dyn DescriptorBody {
        match self {
            Descriptor::Numeric(d) => d,
            Descriptor::Text(d) => d,
            Descriptor::Multilingual(d) => d,
            Descriptor::FrequencyList(d) => d,
            Descriptor::CellFrequencyLink(d) => d,
            Descriptor::SsuLinkage(d) => d,
            Descriptor::SsuScanLinkage(d) => d,
            Descriptor::SsuDataBroadcastId(d) => d,
            Descriptor::Raw(d) => d,
        }
    }

    /// Descriptor tag.
    pub fn tag(&self) -> u8 {
        self.body().tag()
    }

    /// Total on-wire size, 2-byte header included.
    pub fn length(&self) -> usize {
        HEADER_LEN + self.body().payload_len()
    }

    /// Write `tag | length | payload`.
    ///
    /// Fails without writing anything if `section` lacks room or is not
    /// byte-aligned.
    pub fn serialize(&self, section: &mut Section) -> Result<(), SectionError> {
        section.position()?;
        let length = self.length();
        let remaining = section.remaining_capacity();
        if length > remaining {
            return Err(SectionError::CapacityExceeded {
                needed: length,
                remaining,
            });
        }

        let body = self.body();
        section.write(u32::from(body.tag()), 8)?;
        section.write(body.payload_len() as u32, 8)?;
        body.write_payload(section)
    }

    /// Serialize into a standalone buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SectionError> {
        let mut section = Section::new(self.length(), 0);
        self.serialize(&mut section)?;
        Ok(section.as_bytes().to_vec())
    }
}

macro_rules! impl_from_body {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Descriptor {
                fn from(d: $ty) -> Self {
                    Descriptor::$variant(d)
                }
            }
        )*
    };
}

impl_from_body!(
    Numeric(NumericDescriptor),
    Text(TextDescriptor),
    Multilingual(MultilingualTextDescriptor),
    FrequencyList(FrequencyListDescriptor),
    CellFrequencyLink(CellFrequencyLinkDescriptor),
    SsuLinkage(SsuLinkageDescriptor),
    SsuScanLinkage(SsuScanLinkageDescriptor),
    SsuDataBroadcastId(SsuDataBroadcastIdDescriptor),
    Raw(RawDescriptor),
);
