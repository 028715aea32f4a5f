use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use spectral_unmix::assemble::{band_statistics, BandStatistics};
use spectral_unmix::data::block::BlockFile;
use spectral_unmix::data::loader::load_signature_library;
use spectral_unmix::metadata::{describe_all_bands, BandMetadata, DatasetMetadata};
use spectral_unmix::session::OutputInfo;
use spectral_unmix::{UnmixConfig, UnmixSession};

/// Unmix a pixel block against a signature library.
#[derive(Parser, Debug)]
#[command(name = "spectral-unmix", version, about)]
struct Args {
    /// Signature library (.json, .txt, .sig, .csv or .parquet)
    signatures: PathBuf,

    /// Input block as JSON ({"bands", "rows", "cols", "data"})
    block: PathBuf,

    /// Report destination; printed to stdout when omitted
    output: Option<PathBuf>,

    /// Solver configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    output_info: OutputInfo,
    dataset: DatasetMetadata,
    bands: Vec<BandMetadata>,
    statistics: Vec<Option<BandStatistics>>,
    block: BlockFile,
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => UnmixConfig::load(path)?,
        None => UnmixConfig::default(),
    };

    let table = load_signature_library(&args.signatures)?;
    let session = UnmixSession::from_table(table, config);

    let block = BlockFile::load(&args.block)?
        .into_array()
        .with_context(|| format!("loading {}", args.block.display()))?;
    let out = session.process_block(block.view())?;

    let report = Report {
        output_info: session.output_info(),
        dataset: session.describe_dataset(),
        bands: describe_all_bands(session.table()),
        statistics: band_statistics(&out),
        block: BlockFile::from_array(&out),
    };
    let json = serde_json::to_string_pretty(&report)?;

    match &args.output {
        Some(path) => write_report(path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn write_report(path: &Path, json: &str) -> Result<()> {
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run(&args)
}
