//! Network information table.

use super::{
    min_section_len, patch_length, validate_section_len, validate_version,
    write_descriptor_run, write_entry_loop, write_length_placeholder, Cursor, LoopEntry, Step,
    Table, TableHeader, CRC_LEN, LONG_HEADER_LEN, MAX_SECTION_LEN,
};
use crate::descriptor::Descriptor;
use crate::error::{SectionError, TableError};
use crate::section::Section;

const NIT_ACTUAL: u8 = 0x40;
const NIT_OTHER: u8 = 0x41;

/// Header + both loop length fields + CRC.
const FIXED_OVERHEAD: usize = LONG_HEADER_LEN + 2 + 2 + CRC_LEN;

/// Width of transport_stream_loop_length.
const TS_LOOP_LENGTH_LEN: usize = 2;

/// A transport stream entry of the NIT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportStreamEntry {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    descriptors: Vec<Descriptor>,
}

impl TransportStreamEntry {
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }
}

impl LoopEntry for TransportStreamEntry {
    const HEADER_LEN: usize = 6;

    fn write_header(&self, section: &mut Section) -> Result<(), SectionError> {
        section.write(u32::from(self.transport_stream_id), 16)?;
        section.write(u32::from(self.original_network_id), 16)?;
        write_length_placeholder(section).map(|_| ())
    }

    fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }
}

/// Network information table, actual (0x40) or other (0x41) network.
///
/// Network descriptors are placed first. While any remain, a section's
/// transport stream loop stays empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nit {
    header: TableHeader,
    max_section_len: usize,
    network_descriptors: Vec<Descriptor>,
    transport_streams: Vec<TransportStreamEntry>,
}

impl Nit {
    /// Smallest accepted maximum section length.
    pub const MIN_SECTION_LEN: usize =
        min_section_len(FIXED_OVERHEAD, TransportStreamEntry::HEADER_LEN);

    fn new(table_id: u8, network_id: u16, version: u8) -> Result<Self, TableError> {
        validate_version(version)?;
        Ok(Self {
            header: TableHeader {
                table_id,
                private_indicator: true,
                table_id_extension: network_id,
                version,
                current_next: true,
            },
            max_section_len: MAX_SECTION_LEN,
            network_descriptors: Vec::new(),
            transport_streams: Vec::new(),
        })
    }

    /// NIT describing the delivering network.
    pub fn actual(network_id: u16, version: u8) -> Result<Self, TableError> {
        Self::new(NIT_ACTUAL, network_id, version)
    }

    /// NIT describing another network.
    pub fn other(network_id: u16, version: u8) -> Result<Self, TableError> {
        Self::new(NIT_OTHER, network_id, version)
    }

    pub fn network_id(&self) -> u16 {
        self.header.table_id_extension
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

    pub fn add_network_descriptor(&mut self, desc: impl Into<Descriptor>) {
        self.network_descriptors.push(desc.into());
    }

    /// Append a transport stream entry with no descriptors.
    pub fn add_transport_stream(&mut self, transport_stream_id: u16, original_network_id: u16) {
        self.transport_streams.push(TransportStreamEntry {
            transport_stream_id,
            original_network_id,
            descriptors: Vec::new(),
        });
    }

    /// Attach a descriptor to the most recently added transport stream.
    pub fn add_transport_stream_descriptor(
        &mut self,
        desc: impl Into<Descriptor>,
    ) -> Result<(), TableError> {
        let entry = self
            .transport_streams
            .last_mut()
            .ok_or(TableError::NoTransportStream)?;
        entry.descriptors.push(desc.into());
        Ok(())
    }

    /// Attach a descriptor to the first transport stream with `transport_stream_id`.
    pub fn add_transport_stream_descriptor_to(
        &mut self,
        transport_stream_id: u16,
        desc: impl Into<Descriptor>,
    ) -> Result<(), TableError> {
        let entry = self
            .transport_streams
            .iter_mut()
            .find(|ts| ts.transport_stream_id == transport_stream_id)
            .ok_or(TableError::UnknownTransportStream(transport_stream_id))?;
        entry.descriptors.push(desc.into());
        Ok(())
    }

    pub fn network_descriptors(&self) -> &[Descriptor] {
        &self.network_descriptors
    }

    pub fn transport_streams(&self) -> &[TransportStreamEntry] {
        &self.transport_streams
    }
}

impl Table for Nit {
    fn header(&self) -> &TableHeader {
        &self.header
    }

    fn max_section_len(&self) -> usize {
        self.max_section_len
    }

    fn write_body(&self, mut cursor: Cursor, section: &mut Section) -> Result<Step, TableError> {
        let ndl_offset = write_length_placeholder(section)?;
        // transport_stream_loop_length follows the network loop
        section.reserve(TS_LOOP_LENGTH_LEN)?;
        let written =
            write_descriptor_run(&self.network_descriptors, &mut cursor.descriptor, section)?;
        patch_length(section, ndl_offset, written)?;
        section.release(TS_LOOP_LENGTH_LEN);

        let tsl_offset = write_length_placeholder(section)?;
        if cursor.descriptor < self.network_descriptors.len() {
            return Ok(Step::More(cursor));
        }

        let written = write_entry_loop(&self.transport_streams, &mut cursor, section)?;
        patch_length(section, tsl_offset, written)?;

        if cursor.entry < self.transport_streams.len() {
            Ok(Step::More(cursor))
        } else {
            Ok(Step::Done)
        }
    }
}
