//! System software update linkage descriptors (0x4A, linkage types 0x09
//! and 0x0A).

use serde::{Deserialize, Serialize};

use super::{tag, try_grow, DescriptorBody};
use crate::bits;
use crate::error::{DescriptorError, SectionError};
use crate::section::Section;

/// transport_stream_id + original_network_id + service_id + linkage_type.
const LINKAGE_BASE_LEN: usize = 7;

const LINKAGE_SSU: u8 = 0x09;
const LINKAGE_SSU_SCAN: u8 = 0x0A;

fn write_linkage_base(
    section: &mut Section,
    transport_stream_id: u16,
    original_network_id: u16,
    service_id: u16,
    linkage_type: u8,
) -> Result<(), SectionError> {
    section.write(u32::from(transport_stream_id), 16)?;
    section.write(u32::from(original_network_id), 16)?;
    section.write(u32::from(service_id), 16)?;
    section.write(u32::from(linkage_type), 8)
}

pub(super) fn check_oui(oui: u32) -> Result<(), DescriptorError> {
    if bits::fits(oui, 24) {
        Ok(())
    } else {
        Err(DescriptorError::FieldOutOfRange {
            field: "OUI",
            value: oui,
        })
    }
}

/// OUI entry of an SSU linkage descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuiEntry {
    pub oui: u32,
    pub selector: Vec<u8>,
}

impl OuiEntry {
    /// OUI (3) + selector_length (1).
    pub const BASE_LEN: usize = 4;

    pub fn length(&self) -> usize {
        Self::BASE_LEN + self.selector.len()
    }
}

/// SSU linkage descriptor (linkage type 0x09).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsuLinkageDescriptor {
    transport_stream_id: u16,
    original_network_id: u16,
    service_id: u16,
    ouis: Vec<OuiEntry>,
    private_data: Vec<u8>,
}

impl SsuLinkageDescriptor {
    pub fn new(transport_stream_id: u16, original_network_id: u16, service_id: u16) -> Self {
        Self {
            transport_stream_id,
            original_network_id,
            service_id,
            ouis: Vec::new(),
            private_data: Vec::new(),
        }
    }

    /// Append an OUI with its selector bytes.
    pub fn add_oui(&mut self, oui: u32, selector: impl AsRef<[u8]>) -> Result<(), DescriptorError> {
        check_oui(oui)?;
        let selector = selector.as_ref();
        try_grow(
            tag::LINKAGE,
            self.payload_len(),
            OuiEntry::BASE_LEN + selector.len(),
        )?;
        self.ouis.push(OuiEntry {
            oui,
            selector: selector.to_vec(),
        });
        Ok(())
    }

    /// Replace the trailing private data bytes.
    pub fn set_private_data(&mut self, data: impl AsRef<[u8]>) -> Result<(), DescriptorError> {
        let data = data.as_ref();
        let without = self.payload_len() - self.private_data.len();
        try_grow(tag::LINKAGE, without, data.len())?;
        self.private_data = data.to_vec();
        Ok(())
    }

    pub fn ouis(&self) -> &[OuiEntry] {
        &self.ouis
    }

    pub fn private_data(&self) -> &[u8] {
        &self.private_data
    }

    fn oui_data_len(&self) -> usize {
        self.ouis.iter().map(OuiEntry::length).sum()
    }
}

impl DescriptorBody for SsuLinkageDescriptor {
    fn tag(&self) -> u8 {
        tag::LINKAGE
    }

    fn payload_len(&self) -> usize {
        LINKAGE_BASE_LEN + 1 + self.oui_data_len() + self.private_data.len()
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        write_linkage_base(
            section,
            self.transport_stream_id,
            self.original_network_id,
            self.service_id,
            LINKAGE_SSU,
        )?;
        section.write(self.oui_data_len() as u32, 8)?;
        for entry in &self.ouis {
            section.write(entry.oui, 24)?;
            section.write_string(&entry.selector)?;
        }
        section.write_bytes(&self.private_data)
    }
}

/// Table carrying the SSU scan linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ScanTableType {
    Nit = 0x01,
    Bat = 0x02,
}

/// SSU scan linkage descriptor (linkage type 0x0A).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsuScanLinkageDescriptor {
    transport_stream_id: u16,
    original_network_id: u16,
    service_id: u16,
    table_type: ScanTableType,
}

impl SsuScanLinkageDescriptor {
    pub fn new(
        transport_stream_id: u16,
        original_network_id: u16,
        service_id: u16,
        table_type: ScanTableType,
    ) -> Self {
        Self {
            transport_stream_id,
            original_network_id,
            service_id,
            table_type,
        }
    }

    pub fn table_type(&self) -> ScanTableType {
        self.table_type
    }
}

impl DescriptorBody for SsuScanLinkageDescriptor {
    fn tag(&self) -> u8 {
        tag::LINKAGE
    }

    fn payload_len(&self) -> usize {
        LINKAGE_BASE_LEN + 1
    }

    fn write_payload(&self, section: &mut Section) -> Result<(), SectionError> {
        write_linkage_base(
            section,
            self.transport_stream_id,
            self.original_network_id,
            self.service_id,
            LINKAGE_SSU_SCAN,
        )?;
        section.write(self.table_type as u32, 8)
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::Descriptor;

    use super::*;

    #[test]
    fn test_ssu_linkage() {
        let mut desc = SsuLinkageDescriptor::new(0x0010, 0x0020, 0x0030);
        desc.add_oui(0x00015A, [0xABu8]).unwrap();
        desc.add_oui(0x000000, b"").unwrap();
        desc.set_private_data([0x01u8, 0x02]).unwrap();

        let desc = Descriptor::from(desc);
        assert_eq!(desc.length(), 2 + 8 + 5 + 4 + 2);
        assert_eq!(
            desc.to_bytes().unwrap(),
            vec![
                0x4A, 19, // header
                0x00, 0x10, 0x00, 0x20, 0x00, 0x30, 0x09, // base
                9,    // OUI_data_length
                0x00, 0x01, 0x5A, 0x01, 0xAB, // OUI 1
                0x00, 0x00, 0x00, 0x00, // OUI 2
                0x01, 0x02, // private data
            ]
        );
    }

    #[test]
    fn test_ssu_linkage_budget() {
        let mut desc = SsuLinkageDescriptor::new(1, 2, 3);
        assert!(desc.add_oui(0x0100_0000, b"").is_err());

        // 8 base bytes, 247 left: one OUI with 243 selector bytes fills it
        desc.add_oui(0x000001, vec![0u8; 243]).unwrap();
        assert_eq!(desc.payload_len(), 255);
        assert!(desc.add_oui(0x000002, b"").is_err());
        assert!(desc.set_private_data([1u8]).is_err());
        assert!(desc.set_private_data(b"").is_ok());
        assert_eq!(desc.ouis().len(), 1);
    }

    #[test]
    fn test_ssu_linkage_private_data_replaced() {
        let mut desc = SsuLinkageDescriptor::new(1, 2, 3);
        desc.set_private_data(vec![0u8; 247]).unwrap();
        assert_eq!(desc.payload_len(), 255);
        // replacing, not appending, so a same-size update still fits
        desc.set_private_data(vec![1u8; 247]).unwrap();
        assert_eq!(desc.private_data()[0], 1);
    }

    #[test]
    fn test_ssu_scan_linkage() {
        let desc = Descriptor::from(SsuScanLinkageDescriptor::new(
            0x1111,
            0x2222,
            0x3333,
            ScanTableType::Bat,
        ));
        assert_eq!(
            desc.to_bytes().unwrap(),
            vec![0x4A, 0x08, 0x11, 0x11, 0x22, 0x22, 0x33, 0x33, 0x0A, 0x02]
        );
    }
}
