//! Tables and the pagination engine.
//!
//! A table turns its model into sections one step at a time. Each step is
//! the pure function [`Table::write_body`]: given a [`Cursor`] and a fresh
//! [`Section`] that already carries the long header, it places items
//! greedily and returns where the next section must resume.
//!
//! Placement rule, identical at every nesting level: an item (a descriptor
//! or a child entry header) is written iff it fits in the remaining
//! capacity, otherwise the section ends and the same item opens the next
//! one. Descriptors are never split. A child entry that continues into a
//! new section has its header written again at the top of its loop.
//!
//! ```text
//! +--------------+-----------+-------------+------------------+-------+
//! | long header  | table     | table-level | child entries    | CRC32 |
//! | (8 bytes)    | fields    | descriptors | (header + descs) |       |
//! +--------------+-----------+-------------+------------------+-------+
//! ```

mod cursor;
mod nit;
mod pmt;

pub use cursor::Cursor;
pub use nit::{Nit, TransportStreamEntry};
pub use pmt::{ElementaryStream, Pmt};

use log::{debug, trace};

use crate::bits;
use crate::descriptor::{Descriptor, MAX_DESCRIPTOR_LEN};
use crate::error::{SectionError, TableError};
use crate::section::{Crc32Mpeg2, Section, SectionTrailer};
use crate::stream::Stream;

/// Largest section a PSI table may use.
pub const MAX_SECTION_LEN: usize = 1024;

/// Long-form section header, up to and including last_section_number.
pub const LONG_HEADER_LEN: usize = 8;

/// Number of sections a section_number can address.
pub const MAX_SECTIONS: usize = 256;

/// Trailer size assumed when checking a table's minimum section length.
pub(crate) const CRC_LEN: usize = 4;

const LAST_SECTION_NUMBER_OFFSET: usize = 7;

/// Fields shared by every long-form section of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub table_id: u8,
    pub private_indicator: bool,
    pub table_id_extension: u16,
    pub version: u8,
    pub current_next: bool,
}

impl TableHeader {
    /// Write the 8-byte long header.
    ///
    /// section_length and last_section_number are left as placeholders and
    /// patched once the whole table has been paginated.
    pub fn write(&self, section: &mut Section, section_number: u8) -> Result<(), SectionError> {
        section.write(u32::from(self.table_id), 8)?;
        section.write_flag(true)?; // section_syntax_indicator
        section.write_flag(self.private_indicator)?;
        section.write(0x3, 2)?;
        section.write(0, bits::LENGTH_BITS)?;
        section.write(u32::from(self.table_id_extension), 16)?;
        section.write(0x3, 2)?;
        section.write(u32::from(self.version), bits::VERSION_BITS)?;
        section.write_flag(self.current_next)?;
        section.write(u32::from(section_number), 8)?;
        section.write(0, 8)
    }
}

/// Outcome of one pagination step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Content remains; the next section resumes here.
    More(Cursor),
    /// Everything has been placed.
    Done,
}

/// A table that can paginate itself into sections.
pub trait Table {
    /// Header fields shared by every section of the table.
    fn header(&self) -> &TableHeader;

    /// Configured maximum section length, trailer included.
    fn max_section_len(&self) -> usize;

    /// Fill `section` (header already written) starting at `cursor`.
    fn write_body(&self, cursor: Cursor, section: &mut Section) -> Result<Step, TableError>;

    /// Produce one unsealed section starting at `cursor`.
    ///
    /// Fails with [`TableError::ItemTooLarge`] when the section could not
    /// take a single pending item.
    fn next_section(
        &self,
        cursor: Cursor,
        section_number: u8,
        trailer: &dyn SectionTrailer,
    ) -> Result<(Section, Step), TableError> {
        let mut section = Section::new(self.max_section_len(), trailer.trailer_len());
        self.header().write(&mut section, section_number)?;
        let step = self.write_body(cursor, &mut section)?;
        if step == Step::More(cursor) {
            return Err(TableError::ItemTooLarge {
                table_id: self.header().table_id,
                section_number: usize::from(section_number),
                capacity: self.max_section_len(),
            });
        }
        Ok((section, step))
    }

    /// Paginate the table into `stream` with a CRC32 trailer on every
    /// section. Returns the number of sections produced.
    fn fill_stream(&self, stream: &mut Stream) -> Result<usize, TableError> {
        self.fill_stream_with(stream, &Crc32Mpeg2)
    }

    /// Paginate the table into `stream` using `trailer`.
    ///
    /// The stream is only touched once the whole table has been encoded.
    fn fill_stream_with(
        &self,
        stream: &mut Stream,
        trailer: &dyn SectionTrailer,
    ) -> Result<usize, TableError> {
        let table_id = self.header().table_id;
        let mut pending = Vec::new();
        let mut cursor = Cursor::default();
        loop {
            if pending.len() == MAX_SECTIONS {
                return Err(TableError::TooManySections { table_id });
            }
            let (section, step) = self.next_section(cursor, pending.len() as u8, trailer)?;
            pending.push(section);
            match step {
                Step::More(next) => cursor = next,
                Step::Done => break,
            }
        }

        let last_section_number = (pending.len() - 1) as u8;
        let mut sealed = Vec::with_capacity(pending.len());
        for mut section in pending {
            section.patch_u8(LAST_SECTION_NUMBER_OFFSET, last_section_number)?;
            let section = section.seal(trailer)?;
            trace!(
                "table 0x{:02X}: section {}/{} is {} bytes",
                table_id,
                sealed.len(),
                last_section_number,
                section.len()
            );
            sealed.push(section);
        }

        let count = sealed.len();
        debug!(
            "table 0x{:02X} (ext 0x{:04X}): {} section(s)",
            table_id,
            self.header().table_id_extension,
            count
        );
        for section in sealed {
            stream.push(section);
        }
        Ok(count)
    }
}

/// A child entry of a two-level table.
pub(crate) trait LoopEntry {
    /// Bytes written by [`LoopEntry::write_header`].
    const HEADER_LEN: usize;

    /// Write the entry header. It must end with `reserved:4` followed by a
    /// 12-bit descriptor loop length placeholder.
    fn write_header(&self, section: &mut Section) -> Result<(), SectionError>;

    fn descriptors(&self) -> &[Descriptor];
}

/// Place descriptors from `list[*next..]` while they fit.
///
/// Returns the number of bytes written.
pub(crate) fn write_descriptor_run(
    list: &[Descriptor],
    next: &mut usize,
    section: &mut Section,
) -> Result<usize, TableError> {
    let mut written = 0;
    while let Some(desc) = list.get(*next) {
        let length = desc.length();
        if section.remaining_capacity() < length {
            break;
        }
        desc.serialize(section)?;
        written += length;
        *next += 1;
    }
    Ok(written)
}

/// Place child entries starting at `cursor.entry`, resuming mid-entry where
/// `cursor.entry_descriptor` says so.
///
/// Returns the number of bytes written.
pub(crate) fn write_entry_loop<E: LoopEntry>(
    entries: &[E],
    cursor: &mut Cursor,
    section: &mut Section,
) -> Result<usize, TableError> {
    let start = section.position()?;
    while let Some(entry) = entries.get(cursor.entry) {
        // a header goes out only with its next descriptor behind it
        let next_len = entry
            .descriptors()
            .get(cursor.entry_descriptor)
            .map_or(0, Descriptor::length);
        if section.remaining_capacity() < E::HEADER_LEN + next_len {
            break;
        }
        entry.write_header(section)?;
        let length_offset = section.position()? - 2;

        let written =
            write_descriptor_run(entry.descriptors(), &mut cursor.entry_descriptor, section)?;
        patch_length(section, length_offset, written)?;

        if cursor.entry_descriptor < entry.descriptors().len() {
            break;
        }
        cursor.next_entry();
    }
    Ok(section.position()? - start)
}

/// Backpatch a `reserved:4 length:12` field.
pub(crate) fn patch_length(
    section: &mut Section,
    offset: usize,
    length: usize,
) -> Result<(), SectionError> {
    if !bits::fits(length as u32, bits::LENGTH_BITS) {
        return Err(SectionError::LengthOverflow(length));
    }
    section.patch_u16(offset, bits::length_mask(), length as u16)
}

/// Write a `reserved:4 length:12` placeholder and return its offset.
pub(crate) fn write_length_placeholder(section: &mut Section) -> Result<usize, SectionError> {
    let offset = section.position()?;
    section.write(0xF, 4)?;
    section.write(0, bits::LENGTH_BITS)?;
    Ok(offset)
}

pub(crate) fn validate_version(version: u8) -> Result<(), TableError> {
    if bits::fits(u32::from(version), bits::VERSION_BITS) {
        Ok(())
    } else {
        Err(TableError::InvalidVersion(version))
    }
}

pub(crate) fn validate_pid(pid: u16) -> Result<(), TableError> {
    if pid <= bits::MAX_PID {
        Ok(())
    } else {
        Err(TableError::InvalidPid(pid))
    }
}

/// Smallest section able to hold a table's fixed fields, one child header
/// and the largest possible descriptor.
pub(crate) const fn min_section_len(fixed_overhead: usize, entry_header_len: usize) -> usize {
    fixed_overhead + entry_header_len + MAX_DESCRIPTOR_LEN
}

pub(crate) fn validate_section_len(len: usize, min: usize) -> Result<(), TableError> {
    if (min..=MAX_SECTION_LEN).contains(&len) {
        Ok(())
    } else {
        Err(TableError::InvalidSectionLength {
            len,
            min,
            max: MAX_SECTION_LEN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RawDescriptor;
    use crate::section::NoTrailer;

    fn raw(tag: u8, len: usize) -> Descriptor {
        RawDescriptor::new(tag, vec![tag; len]).unwrap().into()
    }

    struct Entry {
        id: u16,
        descriptors: Vec<Descriptor>,
    }

    impl LoopEntry for Entry {
        const HEADER_LEN: usize = 4;

        fn write_header(&self, section: &mut Section) -> Result<(), SectionError> {
            section.write(u32::from(self.id), 16)?;
            write_length_placeholder(section).map(|_| ())
        }

        fn descriptors(&self) -> &[Descriptor] {
            &self.descriptors
        }
    }

    #[test]
    fn test_table_header_layout() {
        let header = TableHeader {
            table_id: 0x40,
            private_indicator: true,
            table_id_extension: 0x0100,
            version: 1,
            current_next: true,
        };
        let mut section = Section::new(16, 0);
        header.write(&mut section, 2).unwrap();
        assert_eq!(
            section.as_bytes(),
            &[0x40, 0xF0, 0x00, 0x01, 0x00, 0xC3, 0x02, 0x00]
        );

        let header = TableHeader {
            table_id: 0x02,
            private_indicator: false,
            table_id_extension: 0x0001,
            version: 0x1F,
            current_next: false,
        };
        let mut section = Section::new(16, 0);
        header.write(&mut section, 0).unwrap();
        assert_eq!(
            section.as_bytes(),
            &[0x02, 0xB0, 0x00, 0x00, 0x01, 0xFE, 0x00, 0x00]
        );
    }

    #[test]
    fn test_descriptor_run_stops_on_boundary() {
        let list = vec![raw(1, 3), raw(2, 3), raw(3, 3)];
        let mut section = Section::new(11, 0);
        let mut next = 0;

        // two 5-byte descriptors fit in 11 bytes, the third does not
        assert_eq!(
            write_descriptor_run(&list, &mut next, &mut section).unwrap(),
            10
        );
        assert_eq!(next, 2);
        assert_eq!(section.len(), 10);

        let mut section = Section::new(11, 0);
        assert_eq!(
            write_descriptor_run(&list, &mut next, &mut section).unwrap(),
            5
        );
        assert_eq!(next, 3);
        assert_eq!(section.as_bytes(), &[3, 3, 3, 3, 3]);
    }

    #[test]
    fn test_entry_loop_resumes_with_header() {
        let entries = vec![
            Entry {
                id: 0xA,
                descriptors: vec![raw(1, 4), raw(2, 4)],
            },
            Entry {
                id: 0xB,
                descriptors: Vec::new(),
            },
        ];

        // header (4) + one 6-byte descriptor, no room for the second
        let mut cursor = Cursor::default();
        let mut section = Section::new(14, 0);
        assert_eq!(
            write_entry_loop(&entries, &mut cursor, &mut section).unwrap(),
            10
        );
        assert_eq!(
            cursor,
            Cursor {
                descriptor: 0,
                entry: 0,
                entry_descriptor: 1
            }
        );
        assert_eq!(&section.as_bytes()[..4], &[0x00, 0x0A, 0xF0, 0x06]);

        // continuation repeats entry 0 header, then places entry 1
        let mut section = Section::new(14, 0);
        assert_eq!(
            write_entry_loop(&entries, &mut cursor, &mut section).unwrap(),
            14
        );
        assert_eq!(cursor.entry, 2);
        assert_eq!(
            section.as_bytes(),
            &[0x00, 0x0A, 0xF0, 0x06, 2, 4, 2, 2, 2, 2, 0x00, 0x0B, 0xF0, 0x00]
        );
    }

    #[test]
    fn test_entry_header_waits_for_first_descriptor() {
        let entries = vec![
            Entry {
                id: 0xA,
                descriptors: vec![raw(1, 2)],
            },
            Entry {
                id: 0xB,
                descriptors: vec![raw(2, 4)],
            },
        ];

        // entry 1 header fits after entry 0, its descriptor does not
        let mut cursor = Cursor::default();
        let mut section = Section::new(12, 0);
        assert_eq!(
            write_entry_loop(&entries, &mut cursor, &mut section).unwrap(),
            8
        );
        assert_eq!(cursor.entry, 1);
        assert_eq!(cursor.entry_descriptor, 0);

        let mut section = Section::new(12, 0);
        assert_eq!(
            write_entry_loop(&entries, &mut cursor, &mut section).unwrap(),
            10
        );
        assert_eq!(cursor.entry, 2);
        assert_eq!(&section.as_bytes()[..4], &[0x00, 0x0B, 0xF0, 0x06]);
    }

    struct Flat {
        header: TableHeader,
        max_section_len: usize,
        descriptors: Vec<Descriptor>,
    }

    impl Table for Flat {
        fn header(&self) -> &TableHeader {
            &self.header
        }

        fn max_section_len(&self) -> usize {
            self.max_section_len
        }

        fn write_body(&self, mut cursor: Cursor, section: &mut Section) -> Result<Step, TableError> {
            write_descriptor_run(&self.descriptors, &mut cursor.descriptor, section)?;
            if cursor.descriptor < self.descriptors.len() {
                Ok(Step::More(cursor))
            } else {
                Ok(Step::Done)
            }
        }
    }

    fn flat(max_section_len: usize, descriptors: Vec<Descriptor>) -> Flat {
        Flat {
            header: TableHeader {
                table_id: 0x80,
                private_indicator: true,
                table_id_extension: 0,
                version: 0,
                current_next: true,
            },
            max_section_len,
            descriptors,
        }
    }

    #[test]
    fn test_item_too_large_is_reported() {
        let table = flat(20, vec![raw(1, 2), raw(2, 20)]);
        let mut stream = Stream::new();
        let err = table.fill_stream_with(&mut stream, &NoTrailer).unwrap_err();
        assert_eq!(
            err,
            TableError::ItemTooLarge {
                table_id: 0x80,
                section_number: 1,
                capacity: 20
            }
        );
        assert!(stream.is_empty());
    }

    #[test]
    fn test_too_many_sections() {
        // one 3-byte descriptor per 11-byte section
        let table = flat(11, (0..257).map(|_| raw(1, 1)).collect());
        let mut stream = Stream::new();
        assert_eq!(
            table.fill_stream_with(&mut stream, &NoTrailer),
            Err(TableError::TooManySections { table_id: 0x80 })
        );
        assert!(stream.is_empty());

        let table = flat(11, (0..256).map(|_| raw(1, 1)).collect());
        assert_eq!(table.fill_stream_with(&mut stream, &NoTrailer), Ok(256));
        let last = stream.sections().last().unwrap();
        assert_eq!(last.section_number(), Some(255));
        assert_eq!(last.last_section_number(), Some(255));
    }

    #[test]
    fn test_section_len_validation() {
        assert_eq!(min_section_len(16, 6), 279);
        assert!(validate_section_len(279, 279).is_ok());
        assert!(validate_section_len(MAX_SECTION_LEN, 279).is_ok());
        assert_eq!(
            validate_section_len(278, 279),
            Err(TableError::InvalidSectionLength {
                len: 278,
                min: 279,
                max: 1024
            })
        );
        assert!(validate_section_len(1025, 279).is_err());
        assert!(validate_version(31).is_ok());
        assert_eq!(validate_version(32), Err(TableError::InvalidVersion(32)));
        assert!(validate_pid(0x1FFF).is_ok());
        assert_eq!(validate_pid(0x2000), Err(TableError::InvalidPid(0x2000)));
    }
}
