//! SSU data broadcast id descriptor (0x66, data_broadcast_id 0x000A).

use super::linkage::check_oui;
use super::{tag, try_grow, DescriptorBody};
use crate::bits;
use crate::error::{DescriptorError, SectionError};
use crate::section::Section;

/// data_broadcast_id value announcing a system software update.
pub const SSU_DATA_BROADCAST_ID: u16 = 0x000A;

/// OUI entry of an SSU data broadcast id descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsuOuiEntry {
    pub oui: u32,
    pub update_type: u8,
    /// `Some` sets update_versioning_flag.
    pub update_version: Option<u8>,
    pub selector: Vec<u8>,
}

impl SsuOuiEntry {
    /// OUI (3) + update_type byte + version byte + selector_length.
    pub const BASE_LEN: usize = 6;

    pub fn length(&self) -> usize {
        Self::BASE_LEN + self.selector.len()
    }
}

/// SSU data broadcast id descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsuDataBroadcastIdDescriptor {
    ouis: Vec<SsuOuiEntry>,
    private_data: Vec<u8>,
}

impl SsuDataBroadcastIdDescriptor {
    /// data_broadcast_id (2) + OUI_data_length (1).
    const BASE_LEN: usize = 3;

    pub fn new() -> Self {
        Self::default()
    }

    /// Append an OUI entry.
    ///
    /// `update_type` is 4 bits wide, `update_version` 5 bits.
    pub fn add_oui(
        &mut self,
        oui: u32,
        update_type: u8,
        update_version: Option<u8>,
        selector: impl AsRef<[u8]>,
    ) -> Result<(), DescriptorError> {
        check_oui(oui)?;
        if !bits::fits(u32::from(update_type), 4) {
            return Err(DescriptorError::FieldOutOfRange {
                field: "update_type",
                value: u32::from(update_type),
            });
        }
        if let Some(version) = update_version {
            if !bits::fits(u32::from(version), bits::VERSION_BITS) {
                return Err(DescriptorError::FieldOutOfRange {
                    field: "update_version",
                    value: u32::from(version),
                });
            }
        }

        let selector = selector.as_ref();
        try_grow(
            tag::DATA_BROADCAST_ID,
            self.payload_len(),
            SsuOuiEntry::BASE_LEN + selector.len(),
        )?;
        self.ouis.push(SsuOuiEntry {
            oui,
            update_type,
            update_version,
            selector: selector.to_vec(),
        });
        Ok(())
    }

    /// Replace the trailing private data bytes.
    pub fn set_private_data(&mut self, data: impl AsRef<[u8]>) -> Result<(), DescriptorError> {
        let data = data.as_ref();
        let without = self.payload_len() - self.private_data.len();
        try_grow(tag::DATA_BROADCAST_ID, without, data.len())?;
        self.private_data = data.to_vec();
        Ok(())
    }

    pub fn ouis(&self) -> &[SsuOuiEntry] {
        &self.ouis
    }

    fn oui_data_len(&self) -> usize {
        self.ouis.iter().map(SsuOuiEntry::length).sum()
    }
}

impl DescriptorBody for SsuDataBroadcastIdDescriptor {
    fn tag(&self) -> u8 {
        tag::DATA_BROADCAST_ID
    }

    fn payload_len(&self) -> usize {
        Self::BASE_LEN + self.oui_data_len() + self.private_data.len()
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        section.write(u32::from(SSU_DATA_BROADCAST_ID), 16)?;
        section.write(self.oui_data_len() as u32, 8)?;
        for entry in &self.ouis {
            section.write(entry.oui, 24)?;
            section.write(0xF, 4)?;
            section.write(u32::from(entry.update_type), 4)?;
            section.write(0x3, 2)?;
            section.write_flag(entry.update_version.is_some())?;
            section.write(u32::from(entry.update_version.unwrap_or(0)), 5)?;
            section.write_string(&entry.selector)?;
        }
        section.write_bytes(&self.private_data)
    }
}
