//! Frequency list and cell frequency link descriptors.

use super::{tag, try_grow, DescriptorBody};
use crate::bits;
use crate::error::{DescriptorError, SectionError};
use crate::section::Section;

/// Frequency list descriptor (0x62).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyListDescriptor {
    coding_type: u8,
    frequencies: Vec<u32>,
}

impl FrequencyListDescriptor {
    /// reserved_future_use (6) + coding_type (2).
    const BASE_LEN: usize = 1;
    const ENTRY_LEN: usize = 4;

    /// `coding_type` is 2 bits wide.
    pub fn new(coding_type: u8) -> Result<Self, DescriptorError> {
        if !bits::fits(u32::from(coding_type), 2) {
            return Err(DescriptorError::FieldOutOfRange {
                field: "coding_type",
                value: u32::from(coding_type),
            });
        }
        Ok(Self {
            coding_type,
            frequencies: Vec::new(),
        })
    }

    /// Append a centre frequency.
    pub fn add_frequency(&mut self, frequency: u32) -> Result<(), DescriptorError> {
        try_grow(tag::FREQUENCY_LIST, self.payload_len(), Self::ENTRY_LEN)?;
        self.frequencies.push(frequency);
        Ok(())
    }

    pub fn frequencies(&self) -> &[u32] {
        &self.frequencies
    }
}

impl DescriptorBody for FrequencyListDescriptor {
    fn tag(&self) -> u8 {
        tag::FREQUENCY_LIST
    }

    fn payload_len(&self) -> usize {
        Self::BASE_LEN + Self::ENTRY_LEN * self.frequencies.len()
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        section.write(bits::with_reserved(u32::from(self.coding_type), 2, 8), 8)?;
        for &frequency in &self.frequencies {
            section.write(frequency, 32)?;
        }
        Ok(())
    }
}

/// Sub-cell entry of a [`Cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubCell {
    pub cell_id_extension: u8,
    pub transposer_frequency: u32,
}

impl SubCell {
    pub const LEN: usize = 5;
}

/// Cell entry of a cell frequency link descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub cell_id: u16,
    pub frequency: u32,
    pub subcells: Vec<SubCell>,
}

impl Cell {
    /// cell_id (2) + frequency (4) + subcell_info_loop_length (1).
    pub const BASE_LEN: usize = 7;

    fn subcell_loop_len(&self) -> usize {
        SubCell::LEN * self.subcells.len()
    }

    pub fn length(&self) -> usize {
        Self::BASE_LEN + self.subcell_loop_len()
    }
}

/// Cell frequency link descriptor (0x6D).
///
/// Both the cell list and each cell's sub-cell list draw from the same
/// 255-byte payload budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellFrequencyLinkDescriptor {
    cells: Vec<Cell>,
}

impl CellFrequencyLinkDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cell(&mut self, cell_id: u16, frequency: u32) -> Result<(), DescriptorError> {
        try_grow(tag::CELL_FREQUENCY_LINK, self.payload_len(), Cell::BASE_LEN)?;
        self.cells.push(Cell {
            cell_id,
            frequency,
            subcells: Vec::new(),
        });
        Ok(())
    }

    /// Add a sub-cell to the first cell with `cell_id`.
    pub fn add_subcell(
        &mut self,
        cell_id: u16,
        cell_id_extension: u8,
        transposer_frequency: u32,
    ) -> Result<(), DescriptorError> {
        let current = self.payload_len();
        let cell = self
            .cells
            .iter_mut()
            .find(|c| c.cell_id == cell_id)
            .ok_or(DescriptorError::UnknownCell(cell_id))?;
        push_subcell(cell, current, cell_id_extension, transposer_frequency)
    }

    /// Add a sub-cell to the most recently added cell.
    pub fn add_subcell_to_last(
        &mut self,
        cell_id_extension: u8,
        transposer_frequency: u32,
    ) -> Result<(), DescriptorError> {
        let current = self.payload_len();
        let cell = self.cells.last_mut().ok_or(DescriptorError::NoCell)?;
        push_subcell(cell, current, cell_id_extension, transposer_frequency)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

fn push_subcell(
    cell: &mut Cell,
    current: usize,
    cell_id_extension: u8,
    transposer_frequency: u32,
) -> Result<(), DescriptorError> {
    try_grow(tag::CELL_FREQUENCY_LINK, current, SubCell::LEN)?;
    cell.subcells.push(SubCell {
        cell_id_extension,
        transposer_frequency,
    });
    Ok(())
}

impl DescriptorBody for CellFrequencyLinkDescriptor {
    fn tag(&self) -> u8 {
        tag::CELL_FREQUENCY_LINK
    }

    fn payload_len(&self) -> usize {
        self.cells.iter().map(Cell::length).sum()
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        for cell in &self.cells {
            section.write(u32::from(cell.cell_id), 16)?;
            section.write(cell.frequency, 32)?;
            section.write(cell.subcell_loop_len() as u32, 8)?;
            for sub in &cell.subcells {
                section.write(u32::from(sub.cell_id_extension), 8)?;
                section.write(sub.transposer_frequency, 32)?;
            }
        }
        Ok(())
    }
}
