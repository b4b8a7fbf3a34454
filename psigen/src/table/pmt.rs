//! Program map table.

use super::{
    min_section_len, patch_length, validate_pid, validate_section_len, validate_version,
    write_descriptor_run, write_entry_loop, write_length_placeholder, Cursor, LoopEntry, Step,
    Table, TableHeader, CRC_LEN, LONG_HEADER_LEN, MAX_SECTION_LEN,
};
use crate::bits;
use crate::descriptor::Descriptor;
use crate::error::{SectionError, TableError};
use crate::section::Section;

const PMT_TABLE_ID: u8 = 0x02;

/// Header + PCR_PID word + program_info_length + CRC.
const FIXED_OVERHEAD: usize = LONG_HEADER_LEN + 2 + 2 + CRC_LEN;

/// An elementary stream entry of the PMT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStream {
    pub stream_type: u8,
    pub elementary_pid: u16,
    descriptors: Vec<Descriptor>,
}

impl ElementaryStream {
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }
}

impl LoopEntry for ElementaryStream {
    const HEADER_LEN: usize = 5;

    fn write_header(&self, section: &mut Section) -> Result<(), SectionError> {
        section.write(u32::from(self.stream_type), 8)?;
        section.write(
            bits::with_reserved(u32::from(self.elementary_pid), bits::PID_BITS, 16),
            16,
        )?;
        write_length_placeholder(section).map(|_| ())
    }

    fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }
}

/// Program map table of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pmt {
    header: TableHeader,
    max_section_len: usize,
    pcr_pid: u16,
    program_descriptors: Vec<Descriptor>,
    streams: Vec<ElementaryStream>,
}

impl Pmt {
    /// Smallest accepted maximum section length.
    pub const MIN_SECTION_LEN: usize =
        min_section_len(FIXED_OVERHEAD, ElementaryStream::HEADER_LEN);

    pub fn new(program_number: u16, pcr_pid: u16, version: u8) -> Result<Self, TableError> {
        validate_pid(pcr_pid)?;
        validate_version(version)?;
        Ok(Self {
            header: TableHeader {
                table_id: PMT_TABLE_ID,
                private_indicator: false,
                table_id_extension: program_number,
                version,
                current_next: true,
            },
            max_section_len: MAX_SECTION_LEN,
            pcr_pid,
            program_descriptors: Vec::new(),
            streams: Vec::new(),
        })
    }

    pub fn program_number(&self) -> u16 {
        self.header.table_id_extension
    }

    pub fn pcr_pid(&self) -> u16 {
        self.pcr_pid
    }

    pub fn set_current_next(&mut self, current_next: bool) {
        self.header.current_next = current_next;
    }

    /// Limit every produced section to `len` bytes.
    pub fn set_max_section_len(&mut self, len: usize) -> Result<(), TableError> {
        validate_section_len(len, Self::MIN_SECTION_LEN)?;
        self.max_section_len = len;
        Ok(())
    }

    pub fn add_program_descriptor(&mut self, desc: impl Into<Descriptor>) {
        self.program_descriptors.push(desc.into());
    }

    /// Append an elementary stream. Each PID may appear once.
    pub fn add_elementary_stream(&mut self, stream_type: u8, pid: u16) -> Result<(), TableError> {
        validate_pid(pid)?;
        if self.streams.iter().any(|es| es.elementary_pid == pid) {
            return Err(TableError::DuplicateElementaryStream(pid));
        }
        self.streams.push(ElementaryStream {
            stream_type,
            elementary_pid: pid,
            descriptors: Vec::new(),
        });
        Ok(())
    }

    /// Attach a descriptor to the most recently added elementary stream.
    pub fn add_elementary_stream_descriptor(
        &mut self,
        desc: impl Into<Descriptor>,
    ) -> Result<(), TableError> {
        let es = self
            .streams
            .last_mut()
            .ok_or(TableError::NoElementaryStream)?;
        es.descriptors.push(desc.into());
        Ok(())
    }

    /// Attach a descriptor to the elementary stream on `pid`.
    pub fn add_elementary_stream_descriptor_to(
        &mut self,
        pid: u16,
        desc: impl Into<Descriptor>,
    ) -> Result<(), TableError> {
        let es = self
            .streams
            .iter_mut()
            .find(|es| es.elementary_pid == pid)
            .ok_or(TableError::UnknownElementaryStream(pid))?;
        es.descriptors.push(desc.into());
        Ok(())
    }

    pub fn program_descriptors(&self) -> &[Descriptor] {
        &self.program_descriptors
    }

    pub fn elementary_streams(&self) -> &[ElementaryStream] {
        &self.streams
    }
}

impl Table for Pmt {
    fn header(&self) -> &TableHeader {
        &self.header
    }

    fn max_section_len(&self) -> usize {
        self.max_section_len
    }

    fn write_body(&self, mut cursor: Cursor, section: &mut Section) -> Result<Step, TableError> {
        section.write(
            bits::with_reserved(u32::from(self.pcr_pid), bits::PID_BITS, 16),
            16,
        )?;
        let pil_offset = write_length_placeholder(section)?;
        let written =
            write_descriptor_run(&self.program_descriptors, &mut cursor.descriptor, section)?;
        patch_length(section, pil_offset, written)?;
        if cursor.descriptor < self.program_descriptors.len() {
            return Ok(Step::More(cursor));
        }

        write_entry_loop(&self.streams, &mut cursor, section)?;
        if cursor.entry < self.streams.len() {
            Ok(Step::More(cursor))
        } else {
            Ok(Step::Done)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc32_mpeg2;
    use crate::descriptor::{NumericDescriptor, RawDescriptor};
    use crate::stream::Stream;

    fn raw(tag: u8, payload_len: usize) -> Descriptor {
        RawDescriptor::new(tag, vec![tag; payload_len]).unwrap().into()
    }

    #[test]
    fn test_single_section() {
        let mut pmt = Pmt::new(0x0001, 0x0100, 3).unwrap();
        pmt.add_program_descriptor(NumericDescriptor::private_data_specifier(0x233A));
        pmt.add_elementary_stream(0x02, 0x0101).unwrap();
        pmt.add_elementary_stream_descriptor(NumericDescriptor::stream_identifier(0x01))
            .unwrap();
        pmt.add_elementary_stream(0x04, 0x0102).unwrap();

        let mut stream = Stream::new();
        assert_eq!(pmt.fill_stream(&mut stream).unwrap(), 1);

        let section = &stream.sections()[0];
        assert_eq!(
            &section.as_bytes()[..8],
            &[0x02, 0xB0, 0x20, 0x00, 0x01, 0xC7, 0x00, 0x00]
        );
        assert_eq!(
            section.body(),
            &[
                0xE1, 0x00, 0xF0, 0x06, // PCR PID, program_info_length
                0x5F, 0x04, 0x00, 0x00, 0x23, 0x3A, // private data specifier
                0x02, 0xE1, 0x01, 0xF0, 0x03, 0x52, 0x01, 0x01, // video
                0x04, 0xE1, 0x02, 0xF0, 0x00, // audio
            ]
        );
        assert_eq!(crc32_mpeg2(section.as_bytes()), 0);
    }

    #[test]
    fn test_stream_descriptors_resume_after_header() {
        let mut pmt = Pmt::new(0x10, 0x1FFF, 0).unwrap();
        pmt.set_max_section_len(300).unwrap();
        pmt.add_elementary_stream(0x06, 0x0200).unwrap();
        for tag in [0xA1, 0xA2, 0xA3] {
            pmt.add_elementary_stream_descriptor(raw(tag, 98)).unwrap();
        }

        // 284 bytes of room: ES header + two 100-byte descriptors
        let mut stream = Stream::new();
        assert_eq!(pmt.fill_stream(&mut stream).unwrap(), 2);

        let s0 = stream.sections()[0].body();
        assert_eq!(&s0[..9], &[0xFF, 0xFF, 0xF0, 0x00, 0x06, 0xE2, 0x00, 0xF0, 0xC8]);
        assert_eq!(s0.len(), 4 + 5 + 200);
        assert_eq!(s0[9], 0xA1);
        assert_eq!(s0[109], 0xA2);

        let s1 = stream.sections()[1].body();
        assert_eq!(&s1[..9], &[0xFF, 0xFF, 0xF0, 0x00, 0x06, 0xE2, 0x00, 0xF0, 0x64]);
        assert_eq!(s1[9], 0xA3);
        assert_eq!(s1.len(), 4 + 5 + 100);
        assert_eq!(stream.sections()[1].section_number(), Some(1));
        assert_eq!(stream.sections()[1].last_section_number(), Some(1));
    }

    #[test]
    fn test_program_descriptors_first() {
        let mut pmt = Pmt::new(0x10, 0x100, 0).unwrap();
        pmt.set_max_section_len(Pmt::MIN_SECTION_LEN).unwrap();
        pmt.add_program_descriptor(raw(0xB0, 255));
        pmt.add_program_descriptor(raw(0xB1, 4));
        pmt.add_elementary_stream(0x1B, 0x101).unwrap();

        let mut stream = Stream::new();
        assert_eq!(pmt.fill_stream(&mut stream).unwrap(), 2);

        // the stream loop only starts once program descriptors are done
        let s0 = stream.sections()[0].body();
        assert_eq!(s0.len(), 4 + 257);
        let s1 = stream.sections()[1].body();
        assert_eq!(
            s1,
            &[
                0xE1, 0x00, 0xF0, 0x06, 0xB1, 0x04, 0xB1, 0xB1, 0xB1, 0xB1, // program loop
                0x1B, 0xE1, 0x01, 0xF0, 0x00, // stream 0x101
            ]
        );
    }

    #[test]
    fn test_refusals() {
        assert_eq!(Pmt::new(1, 0x2000, 0), Err(TableError::InvalidPid(0x2000)));
        assert_eq!(Pmt::new(1, 0x100, 32), Err(TableError::InvalidVersion(32)));

        let mut pmt = Pmt::new(1, 0x100, 0).unwrap();
        assert_eq!(
            pmt.add_elementary_stream_descriptor(raw(0x52, 1)),
            Err(TableError::NoElementaryStream)
        );
        assert_eq!(
            pmt.add_elementary_stream(0x02, 0x2000),
            Err(TableError::InvalidPid(0x2000))
        );
        pmt.add_elementary_stream(0x02, 0x101).unwrap();
        assert_eq!(
            pmt.add_elementary_stream(0x03, 0x101),
            Err(TableError::DuplicateElementaryStream(0x101))
        );
        assert_eq!(
            pmt.add_elementary_stream_descriptor_to(0x102, raw(0x52, 1)),
            Err(TableError::UnknownElementaryStream(0x102))
        );
        pmt.add_elementary_stream_descriptor_to(0x101, raw(0x52, 1))
            .unwrap();
        assert_eq!(pmt.elementary_streams().len(), 1);
        assert_eq!(pmt.elementary_streams()[0].descriptors().len(), 1);

        assert_eq!(Pmt::MIN_SECTION_LEN, 278);
        assert!(pmt.set_max_section_len(277).is_err());
        assert!(pmt.set_max_section_len(278).is_ok());
    }
}
