//! Gathers the files listed in a ledger into a folder that can be copied to
//! the rater's machine, instead of the whole processed dataset.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use bidsnii::config::SuffixArgs;
use bidsnii::dataset::{check_files_exist, expand_wildcards, full_path};
use bidsnii::ledger::Ledger;
use bidsnii::logging;
use bidsnii::package::stage_for_correction;

#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// YAML file listing the images that need correction
    #[arg(short, long)]
    config: PathBuf,

    /// BIDS folder with the processed images, e.g. ~/dataset/data_processed
    #[arg(short = 'i', long)]
    path_img: PathBuf,

    /// folder created to hold the packaged files
    #[arg(short, long, default_value = "data_to_correct")]
    output: PathBuf,

    #[command(flatten)]
    suffixes: SuffixArgs,

    /// print debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let config = full_path(&args.config)?;
    let path_img = full_path(&args.path_img)?;
    let output = full_path(&args.output)?;
    if output.exists() && fs::read_dir(&output)?.next().is_some() {
        bail!("{} already exists and is not empty", output.display());
    }
    let suffixes = args.suffixes.to_table();

    let ledger = Ledger::load(&config)?;
    let ledger = expand_wildcards(&ledger, &path_img)?.normalize_to_basenames();
    check_files_exist(&ledger, &path_img, &path_img, &suffixes);

    let staged = stage_for_correction(&ledger, &path_img, &suffixes, &output)?;
    if let Some(name) = config.file_name() {
        fs::copy(&config, output.join(name))
            .with_context(|| format!("Cannot copy {} to {}", config.display(), output.display()))?;
    }
    info!("{} file(s) packaged in {}", staged.len(), output.display());
    Ok(())
}
