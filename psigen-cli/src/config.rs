//! TOML table model.
//!
//! ```toml
//! [[nit]]
//! network_id = 0x0100
//! version = 1
//! max_section_len = 300
//! descriptors = [{ kind = "network_name", name = "my network" }]
//!
//! [[nit.transport_streams]]
//! transport_stream_id = 0x0010
//! original_network_id = 0x0020
//! descriptors = [{ kind = "stream_identifier", component_tag = 0x88 }]
//!
//! [[pmt]]
//! program_number = 1
//! pcr_pid = 0x0100
//!
//! [[pmt.streams]]
//! stream_type = 0x02
//! pid = 0x0101
//! ```

use std::path::{Path, PathBuf};
use std::{fs, io};

use psigen::{
    CellFrequencyLinkDescriptor, Descriptor, DescriptorError, FrequencyListDescriptor,
    LanguageCode, MultilingualTextDescriptor, Nit, NumericDescriptor, Pmt, RawDescriptor,
    ScanTableType, SsuDataBroadcastIdDescriptor, SsuLinkageDescriptor, SsuScanLinkageDescriptor,
    TableError, TextDescriptor,
};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or building the model.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid model file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Invalid table: {0}")]
    Table(#[from] TableError),
}

fn default_true() -> bool {
    true
}

fn default_stuffing_byte() -> u8 {
    0xFF
}

/// Top-level model file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    #[serde(default)]
    pub nit: Vec<NitSpec>,
    #[serde(default)]
    pub pmt: Vec<PmtSpec>,
}

impl ModelFile {
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NitSpec {
    pub network_id: u16,
    #[serde(default)]
    pub version: u8,
    /// Build a NIT "other" (0x41) instead of "actual" (0x40).
    #[serde(default)]
    pub other: bool,
    #[serde(default = "default_true")]
    pub current_next: bool,
    pub max_section_len: Option<usize>,
    #[serde(default)]
    pub descriptors: Vec<DescriptorSpec>,
    #[serde(default)]
    pub transport_streams: Vec<TransportStreamSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportStreamSpec {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    #[serde(default)]
    pub descriptors: Vec<DescriptorSpec>,
}

impl NitSpec {
    /// Build the table. `max_section_len` overrides the file's value.
    pub fn build(&self, max_section_len: Option<usize>) -> Result<Nit, ConfigError> {
        let mut nit = if self.other {
            Nit::other(self.network_id, self.version)?
        } else {
            Nit::actual(self.network_id, self.version)?
        };
        nit.set_current_next(self.current_next);
        if let Some(len) = max_section_len.or(self.max_section_len) {
            nit.set_max_section_len(len)?;
        }

        for desc in &self.descriptors {
            nit.add_network_descriptor(desc.build()?);
        }
        for ts in &self.transport_streams {
            nit.add_transport_stream(ts.transport_stream_id, ts.original_network_id);
            for desc in &ts.descriptors {
                nit.add_transport_stream_descriptor(desc.build()?)?;
            }
        }
        Ok(nit)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PmtSpec {
    pub program_number: u16,
    pub pcr_pid: u16,
    #[serde(default)]
    pub version: u8,
    #[serde(default = "default_true")]
    pub current_next: bool,
    pub max_section_len: Option<usize>,
    #[serde(default)]
    pub descriptors: Vec<DescriptorSpec>,
    #[serde(default)]
    pub streams: Vec<ElementaryStreamSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementaryStreamSpec {
    pub stream_type: u8,
    pub pid: u16,
    #[serde(default)]
    pub descriptors: Vec<DescriptorSpec>,
}

impl PmtSpec {
    /// Build the table. `max_section_len` overrides the file's value.
    pub fn build(&self, max_section_len: Option<usize>) -> Result<Pmt, ConfigError> {
        let mut pmt = Pmt::new(self.program_number, self.pcr_pid, self.version)?;
        pmt.set_current_next(self.current_next);
        if let Some(len) = max_section_len.or(self.max_section_len) {
            pmt.set_max_section_len(len)?;
        }

        for desc in &self.descriptors {
            pmt.add_program_descriptor(desc.build()?);
        }
        for es in &self.streams {
            pmt.add_elementary_stream(es.stream_type, es.pid)?;
            for desc in &es.descriptors {
                pmt.add_elementary_stream_descriptor_to(es.pid, desc.build()?)?;
            }
        }
        Ok(pmt)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageTextSpec {
    pub language: LanguageCode,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellSpec {
    pub cell_id: u16,
    pub frequency: u32,
    #[serde(default)]
    pub subcells: Vec<SubCellSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubCellSpec {
    pub cell_id_extension: u8,
    pub transposer_frequency: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OuiSpec {
    pub oui: u32,
    #[serde(default)]
    pub selector: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SsuOuiSpec {
    pub oui: u32,
    pub update_type: u8,
    pub update_version: Option<u8>,
    #[serde(default)]
    pub selector: Vec<u8>,
}

/// One descriptor, tagged by `kind`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DescriptorSpec {
    NetworkName {
        name: String,
    },
    BouquetName {
        name: String,
    },
    Stuffing {
        #[serde(default = "default_stuffing_byte")]
        byte: u8,
        count: usize,
    },
    StreamIdentifier {
        component_tag: u8,
    },
    TimeShiftedService {
        reference_service_id: u16,
    },
    PrivateDataSpecifier {
        specifier: u32,
    },
    MultilingualNetworkName {
        texts: Vec<LanguageTextSpec>,
    },
    MultilingualBouquetName {
        texts: Vec<LanguageTextSpec>,
    },
    FrequencyList {
        coding_type: u8,
        frequencies: Vec<u32>,
    },
    CellFrequencyLink {
        cells: Vec<CellSpec>,
    },
    SsuLinkage {
        transport_stream_id: u16,
        original_network_id: u16,
        service_id: u16,
        #[serde(default)]
        ouis: Vec<OuiSpec>,
        #[serde(default)]
        private_data: Vec<u8>,
    },
    SsuScanLinkage {
        transport_stream_id: u16,
        original_network_id: u16,
        service_id: u16,
        table_type: ScanTableType,
    },
    SsuDataBroadcastId {
        #[serde(default)]
        ouis: Vec<SsuOuiSpec>,
        #[serde(default)]
        private_data: Vec<u8>,
    },
    Raw {
        tag: u8,
        #[serde(default)]
        payload: Vec<u8>,
    },
}

impl DescriptorSpec {
    pub fn build(&self) -> Result<Descriptor, DescriptorError> {
        let desc: Descriptor = match self {
            DescriptorSpec::NetworkName { name } => TextDescriptor::network_name(name).into(),
            DescriptorSpec::BouquetName { name } => TextDescriptor::bouquet_name(name).into(),
            DescriptorSpec::Stuffing { byte, count } => {
                TextDescriptor::stuffing(*byte, *count).into()
            }
            DescriptorSpec::StreamIdentifier { component_tag } => {
                NumericDescriptor::stream_identifier(*component_tag).into()
            }
            DescriptorSpec::TimeShiftedService {
                reference_service_id,
            } => NumericDescriptor::time_shifted_service(*reference_service_id).into(),
            DescriptorSpec::PrivateDataSpecifier { specifier } => {
                NumericDescriptor::private_data_specifier(*specifier).into()
            }
            DescriptorSpec::MultilingualNetworkName { texts } => {
                multilingual(MultilingualTextDescriptor::network_name(), texts)?.into()
            }
            DescriptorSpec::MultilingualBouquetName { texts } => {
                multilingual(MultilingualTextDescriptor::bouquet_name(), texts)?.into()
            }
            DescriptorSpec::FrequencyList {
                coding_type,
                frequencies,
            } => {
                let mut desc = FrequencyListDescriptor::new(*coding_type)?;
                for &frequency in frequencies {
                    desc.add_frequency(frequency)?;
                }
                desc.into()
            }
            DescriptorSpec::CellFrequencyLink { cells } => {
                let mut desc = CellFrequencyLinkDescriptor::new();
                for cell in cells {
                    desc.add_cell(cell.cell_id, cell.frequency)?;
                    for sub in &cell.subcells {
                        desc.add_subcell_to_last(sub.cell_id_extension, sub.transposer_frequency)?;
                    }
                }
                desc.into()
            }
            DescriptorSpec::SsuLinkage {
                transport_stream_id,
                original_network_id,
                service_id,
                ouis,
                private_data,
            } => {
                let mut desc = SsuLinkageDescriptor::new(
                    *transport_stream_id,
                    *original_network_id,
                    *service_id,
                );
                for entry in ouis {
                    desc.add_oui(entry.oui, &entry.selector)?;
                }
                desc.set_private_data(private_data)?;
                desc.into()
            }
            DescriptorSpec::SsuScanLinkage {
                transport_stream_id,
                original_network_id,
                service_id,
                table_type,
            } => SsuScanLinkageDescriptor::new(
                *transport_stream_id,
                *original_network_id,
                *service_id,
                *table_type,
            )
            .into(),
            DescriptorSpec::SsuDataBroadcastId { ouis, private_data } => {
                let mut desc = SsuDataBroadcastIdDescriptor::new();
                for entry in ouis {
                    desc.add_oui(
                        entry.oui,
                        entry.update_type,
                        entry.update_version,
                        &entry.selector,
                    )?;
                }
                desc.set_private_data(private_data)?;
                desc.into()
            }
            DescriptorSpec::Raw { tag, payload } => {
                RawDescriptor::new(*tag, payload.clone())?.into()
            }
        };
        Ok(desc)
    }
}

fn multilingual(
    mut desc: MultilingualTextDescriptor,
    texts: &[LanguageTextSpec],
) -> Result<MultilingualTextDescriptor, DescriptorError> {
    for entry in texts {
        desc.add_text(entry.language, &entry.text)?;
    }
    Ok(desc)
}
