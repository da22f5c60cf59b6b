//! Interactive manual correction of the labels listed in a YAML ledger.
//!
//! Each pending file is opened in a viewer (or an SCT labeling tool), the
//! corrected label is saved under `derivatives/labels` and the entry moves
//! from `FILES_*` to `CORR_*` once the label was actually saved.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use bidsnii::common::TaskKind;
use bidsnii::config::{Settings, SuffixArgs, DEFAULT_LABEL_SUFFIX};
use bidsnii::correction::Corrector;
use bidsnii::dataset::{check_files_exist, check_output_folder, expand_wildcards, full_path};
use bidsnii::ledger::Ledger;
use bidsnii::prompt::{ask_yes_no, read_rater_name};
use bidsnii::sidecar::SidecarFormat;
use bidsnii::viewer::Viewer;
use bidsnii::{logging, Error};

#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// YAML file listing the images to correct under FILES_SEG, FILES_GMSEG,
    /// FILES_LABEL, FILES_PMJ, FILES_LESION or FILES_CENTERLINE.
    /// Corrected files are moved to the matching CORR_* list.
    #[arg(short, long)]
    config: PathBuf,

    /// BIDS folder with the processed images, e.g. ~/dataset/data_processed
    #[arg(short = 'i', long)]
    path_img: PathBuf,

    /// folder with the automatic labels, defaults to --path-img
    #[arg(long)]
    path_label: Option<PathBuf>,

    /// BIDS dataset receiving derivatives/labels
    #[arg(short = 'o', long, default_value = "./")]
    path_out: PathBuf,

    #[command(flatten)]
    suffixes: SuffixArgs,

    /// appended to the task suffix in the name of the corrected label
    #[arg(long, default_value = DEFAULT_LABEL_SUFFIX, allow_hyphen_values = true)]
    label_suffix: String,

    /// viewer used for segmentations and lesions
    #[arg(long, value_enum, default_value_t)]
    viewer: Viewer,

    /// layout of the JSON sidecar written next to each corrected label
    #[arg(long, value_enum, default_value_t)]
    sidecar_format: SidecarFormat,

    /// name of the rater (Firstname Lastname), asked for if not given
    #[arg(long, env = "BIDSNII_RATER")]
    rater: Option<String>,

    /// copy the automatic segmentations NOT listed under FILES_SEG to
    /// derivatives without opening a viewer
    #[arg(long)]
    add_seg_only: bool,

    /// print debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn confirm(question: &str) -> io::Result<bool> {
    ask_yes_no(&mut io::stdin().lock(), &mut io::stdout(), question)
}

fn rater(args: &Args) -> Result<String> {
    match args.rater.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => read_rater_name(&mut io::stdin().lock(), &mut io::stdout())
            .context("A rater name is needed for the JSON sidecars"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let config = full_path(&args.config)?;
    let path_img = full_path(&args.path_img)?;
    let path_label = match &args.path_label {
        Some(path) => full_path(path)?,
        None => path_img.clone(),
    };
    let settings = Settings {
        path_img,
        path_label,
        path_out: full_path(&args.path_out)?,
        suffixes: args.suffixes.to_table(),
        label_suffix: args.label_suffix.clone(),
    };

    // `ledger` is written back as loaded; work runs on the resolved copy
    let mut ledger = Ledger::load(&config)?;
    let resolved = expand_wildcards(&ledger, &settings.path_img)?.normalize_to_basenames();
    check_files_exist(&resolved, &settings.path_img, &settings.path_label, &settings.suffixes);
    check_output_folder(&settings.derivatives_dir())?;

    // ask once, before the first viewer opens
    let rater = rater(&args)?;
    let corrector = Corrector {
        settings: &settings,
        viewer: args.viewer,
        sidecar_format: args.sidecar_format,
        rater: &rater,
    };

    let mut corrected = 0;
    for (task, files) in resolved.pending_tasks() {
        let kind = TaskKind::from_key(task)
            .ok_or_else(|| Error::InvalidTask(format!("{task} in {}", config.display())))?;
        if args.add_seg_only && kind == TaskKind::Seg {
            let added = corrector.add_segmentations(files)?;
            info!("{added} segmentation(s) added to {}", settings.derivatives_dir().display());
            continue;
        }
        corrected += corrector
            .correct_task(&mut ledger, &config, task, files, confirm, |kind, paths| {
                corrector.launch_for(kind, paths)?.run()
            })
            .with_context(|| format!("Stopped while correcting {task}"))?;
    }
    info!("{corrected} file(s) corrected");
    Ok(())
}
