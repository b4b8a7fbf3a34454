//! Ordered output of finished sections.

use std::io::{self, Write};
use std::slice;

use bytes::{BufMut, Bytes, BytesMut};

use crate::section::SealedSection;

/// An append-only sequence of sealed sections.
///
/// Several tables may be filled into the same stream; their sections keep
/// the order in which the tables were filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stream {
    sections: Vec<SealedSection>,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished section.
    pub fn push(&mut self, section: SealedSection) {
        self.sections.push(section);
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, SealedSection> {
        self.sections.iter()
    }

    pub fn sections(&self) -> &[SealedSection] {
        &self.sections
    }

    /// Total byte count over all sections.
    pub fn total_len(&self) -> usize {
        self.sections.iter().map(SealedSection::len).sum()
    }

    /// Concatenate every section into one buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.total_len());
        for section in &self.sections {
            buf.put_slice(section.as_bytes());
        }
        buf.freeze()
    }

    /// Write every section, in order, to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for section in &self.sections {
            writer.write_all(section.as_bytes())?;
        }
        writer.flush()
    }
}

impl<'a> IntoIterator for &'a Stream {
    type Item = &'a SealedSection;
    type IntoIter = slice::Iter<'a, SealedSection>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
