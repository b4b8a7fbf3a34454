//! MPEG-2 / DVB PSI section generator.
//!
//! This crate encodes network information tables (NIT) and program map
//! tables (PMT) into byte-exact long-form sections, splitting content over
//! as many sections as the configured maximum section length requires.
//!
//! # Section Format
//!
//! ```text
//! +----------+---------+----------+------------------+--------+
//! | table_id | length  | ext/ver/ | body             | CRC32  |
//! |          | (12bit) | numbers  |                  | MPEG-2 |
//! +----------+---------+----------+------------------+--------+
//! |  1 byte  | 2 bytes | 5 bytes  | variable         | 4 bytes|
//! ```
//!
//! # Example
//!
//! ```rust
//! use psigen::{Nit, NumericDescriptor, Stream, Table, TextDescriptor};
//!
//! let mut nit = Nit::actual(0x0100, 1).unwrap();
//! nit.add_network_descriptor(TextDescriptor::network_name("my network"));
//! nit.add_transport_stream(0x0010, 0x0020);
//! nit.add_transport_stream_descriptor(NumericDescriptor::stream_identifier(0x88))
//!     .unwrap();
//!
//! let mut stream = Stream::new();
//! let sections = nit.fill_stream(&mut stream).unwrap();
//! assert_eq!(sections, 1);
//! assert_eq!(stream.sections()[0].table_id(), 0x40);
//! ```

pub mod bits;
pub mod crc;
pub mod descriptor;
pub mod error;
pub mod section;
pub mod stream;
pub mod table;

pub use descriptor::{
    Cell, CellFrequencyLinkDescriptor, Descriptor, FrequencyListDescriptor, LanguageCode,
    MultilingualTextDescriptor, NumericDescriptor, RawDescriptor, ScanTableType,
    SsuDataBroadcastIdDescriptor, SsuLinkageDescriptor, SsuScanLinkageDescriptor, SubCell,
    TextDescriptor,
};
pub use error::{DescriptorError, SectionError, TableError};
pub use section::{Crc32Mpeg2, NoTrailer, SealedSection, Section, SectionTrailer};
pub use stream::Stream;
pub use table::{
    Cursor, ElementaryStream, Nit, Pmt, Step, Table, TableHeader, TransportStreamEntry,
    MAX_SECTION_LEN,
};
