//! psigen: build PSI sections from a TOML table description.
//!
//! Every NIT in the model is encoded first, then every PMT, each in file
//! order, into one output file of concatenated sections.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use psigen::{Crc32Mpeg2, NoTrailer, SectionTrailer, Stream, Table};

mod config;
mod logging;

use config::ModelFile;

/// psigen - MPEG-2/DVB PSI section generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file describing the tables
    input: PathBuf,

    /// Output file for the concatenated sections
    #[arg(short, long, default_value = "sections.bin")]
    output: PathBuf,

    /// Maximum section length applied to every table
    #[arg(long)]
    max_section_len: Option<usize>,

    /// Omit the CRC32 trailer
    #[arg(long)]
    no_crc: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory for log files (console only if unset)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn build_stream(
    model: &ModelFile,
    max_section_len: Option<usize>,
    trailer: &dyn SectionTrailer,
) -> Result<Stream, config::ConfigError> {
    let mut stream = Stream::new();

    for spec in &model.nit {
        let nit = spec.build(max_section_len)?;
        let count = nit.fill_stream_with(&mut stream, trailer)?;
        info!(
            "NIT 0x{:02X} network_id=0x{:04X}: {} section(s)",
            nit.header().table_id,
            nit.network_id(),
            count
        );
    }

    for spec in &model.pmt {
        let pmt = spec.build(max_section_len)?;
        let count = pmt.fill_stream_with(&mut stream, trailer)?;
        info!(
            "PMT program_number=0x{:04X}: {} section(s)",
            pmt.program_number(),
            count
        );
    }

    Ok(stream)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    logging::init_logging(args.log_dir.as_deref(), args.verbose)?;

    info!("Loading model: {:?}", args.input);
    let model = match ModelFile::load(&args.input) {
        Ok(model) => model,
        Err(e) => {
            error!("Failed to load model: {}", e);
            return Err(e.into());
        }
    };

    let trailer: &dyn SectionTrailer = if args.no_crc { &NoTrailer } else { &Crc32Mpeg2 };
    let stream = match build_stream(&model, args.max_section_len, trailer) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to build tables: {}", e);
            return Err(e.into());
        }
    };

    let mut writer = BufWriter::new(File::create(&args.output)?);
    stream.write_to(&mut writer)?;
    info!(
        "Wrote {} section(s), {} bytes to {:?}",
        stream.len(),
        stream.total_len(),
        args.output
    );

    Ok(())
}
