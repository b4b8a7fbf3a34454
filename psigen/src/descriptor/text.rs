//! Text payloads: single strings and multilingual text loops.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{grow_with_truncation, tag, try_grow, DescriptorBody};
use crate::error::{DescriptorError, SectionError};
use crate::section::Section;

/// A descriptor whose whole payload is one byte string.
///
/// Input longer than the payload ceiling is truncated, not refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDescriptor {
    tag: u8,
    data: Vec<u8>,
}

impl TextDescriptor {
    pub fn new(tag: u8, text: impl AsRef<[u8]>) -> Self {
        Self {
            tag,
            data: grow_with_truncation(tag, 0, text.as_ref()),
        }
    }

    /// Network name descriptor (0x40).
    pub fn network_name(name: impl AsRef<[u8]>) -> Self {
        Self::new(tag::NETWORK_NAME, name)
    }

    /// Bouquet name descriptor (0x47).
    pub fn bouquet_name(name: impl AsRef<[u8]>) -> Self {
        Self::new(tag::BOUQUET_NAME, name)
    }

    /// Stuffing descriptor (0x42) made of `count` copies of `byte`.
    pub fn stuffing(byte: u8, count: usize) -> Self {
        Self::new(tag::STUFFING, vec![byte; count])
    }

    /// Stuffing descriptor (0x42) carrying the given bytes.
    pub fn stuffing_bytes(data: impl AsRef<[u8]>) -> Self {
        Self::new(tag::STUFFING, data)
    }

    /// The stored (possibly truncated) text.
    pub fn text(&self) -> &[u8] {
        &self.data
    }
}

impl DescriptorBody for TextDescriptor {
    fn tag(&self) -> u8 {
        self.tag
    }

    fn payload_len(&self) -> usize {
        self.data.len()
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        section.write_bytes(&self.data)
    }
}

/// ISO 639-2 language code: three ASCII characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode([u8; 3]);

impl LanguageCode {
    pub const fn new(code: [u8; 3]) -> Self {
        Self(code)
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// The 24-bit on-wire value.
    pub fn as_u32(&self) -> u32 {
        u32::from_be_bytes([0, self.0[0], self.0[1], self.0[2]])
    }
}

impl TryFrom<&str> for LanguageCode {
    type Error = DescriptorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.as_bytes() {
            &[a, b, c] if value.is_ascii() => Ok(Self([a, b, c])),
            _ => Err(DescriptorError::InvalidLanguageCode(value.to_string())),
        }
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = DescriptorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // constructed from ASCII only
        for &b in &self.0 {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

/// One entry of a multilingual text loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageText {
    pub code: LanguageCode,
    pub text: Vec<u8>,
}

impl LanguageText {
    /// language_code (3) + text_length (1).
    pub const BASE_LEN: usize = 4;

    pub fn length(&self) -> usize {
        Self::BASE_LEN + self.text.len()
    }
}

/// A descriptor made of `(language, text)` entries in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultilingualTextDescriptor {
    tag: u8,
    entries: Vec<LanguageText>,
}

impl MultilingualTextDescriptor {
    pub fn new(tag: u8) -> Self {
        Self {
            tag,
            entries: Vec::new(),
        }
    }

    /// Multilingual network name descriptor (0x5B).
    pub fn network_name() -> Self {
        Self::new(tag::MULTILINGUAL_NETWORK_NAME)
    }

    /// Multilingual bouquet name descriptor (0x5C).
    pub fn bouquet_name() -> Self {
        Self::new(tag::MULTILINGUAL_BOUQUET_NAME)
    }

    /// Append an entry. Refused if the entry would not fit.
    pub fn add_text(
        &mut self,
        code: LanguageCode,
        text: impl AsRef<[u8]>,
    ) -> Result<(), DescriptorError> {
        let text = text.as_ref();
        try_grow(
            self.tag,
            self.payload_len(),
            LanguageText::BASE_LEN + text.len(),
        )?;
        self.entries.push(LanguageText {
            code,
            text: text.to_vec(),
        });
        Ok(())
    }

    pub fn entries(&self) -> &[LanguageText] {
        &self.entries
    }
}

impl DescriptorBody for MultilingualTextDescriptor {
    fn tag(&self) -> u8 {
        self.tag
    }

    fn payload_len(&self) -> usize {
        self.entries.iter().map(LanguageText::length).sum()
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        for entry in &self.entries {
            section.write(entry.code.as_u32(), 24)?;
            section.write_string(&entry.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::Descriptor;

    use super::*;

    #[test]
    fn test_text_truncated_at_ceiling() {
        let input = vec![b'c'; 259];
        let desc = TextDescriptor::network_name(&input);
        assert_eq!(desc.text(), &input[..255]);

        let desc = Descriptor::from(desc);
        assert_eq!(desc.length(), 257);
        let bytes = desc.to_bytes().unwrap();
        assert_eq!(&bytes[..2], &[0x40, 0xFF]);
        assert_eq!(bytes.len(), 257);
    }

    #[test]
    fn test_text_below_ceiling_kept() {
        let data = "zzzzzzzzzzzzzzzzzzzzzzz";
        assert_eq!(data.len(), 23);
        let desc = TextDescriptor::stuffing_bytes(data);
        assert_eq!(desc.text(), data.as_bytes());
        assert_eq!(Descriptor::from(desc).length(), 25);
    }

    #[test]
    fn test_stuffing_repeat() {
        let desc = Descriptor::from(TextDescriptor::stuffing(b'z', 13));
        assert_eq!(desc.length(), 15);
        assert_eq!(desc.to_bytes().unwrap()[..3], [0x42, 0x0D, b'z']);
    }

    #[test]
    fn test_language_code() {
        let code = LanguageCode::try_from("fre").unwrap();
        assert_eq!(code.as_u32(), 0x667265);
        assert_eq!(code.to_string(), "fre");
        assert_eq!("deu".parse::<LanguageCode>().unwrap().as_bytes(), b"deu");

        assert!(LanguageCode::try_from("fr").is_err());
        assert!(LanguageCode::try_from("fren").is_err());
        assert!(LanguageCode::try_from("fré").is_err());
    }

    #[test]
    fn test_multilingual_network_name() {
        let mut desc = MultilingualTextDescriptor::network_name();
        desc.add_text(LanguageCode::new(*b"fre"), "France").unwrap();
        desc.add_text(LanguageCode::new(*b"spa"), "Francia").unwrap();
        desc.add_text(LanguageCode::new(*b"eng"), "France").unwrap();
        desc.add_text(LanguageCode::new(*b"deu"), "Frankreich").unwrap();
        assert_eq!(desc.entries().len(), 4);

        let desc = Descriptor::from(desc);
        // 4 entries of 4 bytes overhead + 6 + 7 + 6 + 10 text bytes
        assert_eq!(desc.length(), 2 + 16 + 29);

        let bytes = desc.to_bytes().unwrap();
        assert_eq!(&bytes[..2], &[0x5B, 45]);
        assert_eq!(&bytes[2..12], b"fre\x06France");
        assert_eq!(&bytes[12..23], b"spa\x07Francia");
    }

    #[test]
    fn test_multilingual_refuses_overflow() {
        let mut desc = MultilingualTextDescriptor::network_name();
        let code = LanguageCode::new(*b"eng");
        desc.add_text(code, vec![b'a'; 200]).unwrap();
        assert_eq!(desc.payload_len(), 204);

        // 51 bytes left: 4 overhead + 47 text fits, 48 does not
        let err = desc.add_text(code, vec![b'b'; 48]).unwrap_err();
        assert_eq!(
            err,
            DescriptorError::CapacityExceeded {
                tag: 0x5B,
                requested: 52,
                available: 51
            }
        );
        assert_eq!(desc.entries().len(), 1);
        assert_eq!(desc.payload_len(), 204);

        desc.add_text(code, vec![b'b'; 47]).unwrap();
        assert_eq!(desc.payload_len(), 255);
    }
}
