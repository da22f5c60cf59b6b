//! Copies corrected labels (and their JSON sidecars) into the
//! `derivatives/labels` folder of a BIDS dataset.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use bidsnii::dataset::full_path;
use bidsnii::derivatives::copy_to_derivatives;
use bidsnii::logging;

#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// folder with the corrected labels, e.g. ~/data_to_correct/derivatives/labels
    #[arg(short = 'i', long)]
    path_in: PathBuf,

    /// derivatives/labels folder of the BIDS dataset
    #[arg(short = 'o', long)]
    path_out: PathBuf,

    /// print debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let copied = copy_to_derivatives(&full_path(&args.path_in)?, &full_path(&args.path_out)?)?;
    info!("{} label(s) copied", copied.len());
    Ok(())
}
