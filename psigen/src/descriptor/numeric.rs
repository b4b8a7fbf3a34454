//! Descriptors whose payload is a single unsigned integer.

use super::{tag, DescriptorBody};
use crate::error::SectionError;
use crate::section::Section;

/// Byte width of a numeric payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericWidth {
    U8,
    U16,
    U32,
}

impl NumericWidth {
    /// Payload size in bytes.
    pub fn bytes(self) -> usize {
        match self {
            NumericWidth::U8 => 1,
            NumericWidth::U16 => 2,
            NumericWidth::U32 => 4,
        }
    }
}

/// A descriptor carrying exactly one fixed-width field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericDescriptor {
    tag: u8,
    value: u32,
    width: NumericWidth,
}

impl NumericDescriptor {
    pub fn u8(tag: u8, value: u8) -> Self {
        Self {
            tag,
            value: u32::from(value),
            width: NumericWidth::U8,
        }
    }

    pub fn u16(tag: u8, value: u16) -> Self {
        Self {
            tag,
            value: u32::from(value),
            width: NumericWidth::U16,
        }
    }

    pub fn u32(tag: u8, value: u32) -> Self {
        Self {
            tag,
            value,
            width: NumericWidth::U32,
        }
    }

    /// Stream identifier descriptor (0x52): `component_tag`.
    pub fn stream_identifier(component_tag: u8) -> Self {
        Self::u8(tag::STREAM_IDENTIFIER, component_tag)
    }

    /// Time shifted service descriptor (0x4C): `reference_service_id`.
    pub fn time_shifted_service(reference_service_id: u16) -> Self {
        Self::u16(tag::TIME_SHIFTED_SERVICE, reference_service_id)
    }

    /// Private data specifier descriptor (0x5F).
    pub fn private_data_specifier(specifier: u32) -> Self {
        Self::u32(tag::PRIVATE_DATA_SPECIFIER, specifier)
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn width(&self) -> NumericWidth {
        self.width
    }
}

impl DescriptorBody for NumericDescriptor {
    fn tag(&self) -> u8 {
        self.tag
    }

    fn payload_len(&self) -> usize {
        self.width.bytes()
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        section.write(self.value, (self.width.bytes() * 8) as u8)
    }
}
