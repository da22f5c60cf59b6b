//! Checks and lookups against the dataset on disk.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use tracing::{debug, warn};

use crate::bids;
use crate::common::done_key_for;
use crate::config::SuffixTable;
use crate::error::{Error, Result};
use crate::ledger::Ledger;

/// Absolute version of `path`, with a leading `~` expanded.
pub fn full_path(path: &Path) -> Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .ok_or_else(|| Error::Config("Cannot expand '~': home directory unknown".into()))?
            .join(rest),
        Err(_) => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(std::env::current_dir()?.join(expanded))
    }
}

/// Creates the output folder if it is missing.
pub fn check_output_folder(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        warn!("Creating new folder: {}", path.display());
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// Every file matching `pattern` below `root`, sorted.
pub fn find_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!(
        "{}/**/{}",
        Pattern::escape(&root.to_string_lossy()),
        pattern
    );
    let mut paths: Vec<PathBuf> = glob(&full)
        .map_err(|e| Error::Config(format!("Invalid pattern '{pattern}': {e}")))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

/// Paths found missing by [`check_files_exist`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MissingFiles {
    pub images: Vec<PathBuf>,
    pub labels: Vec<PathBuf>,
}

impl MissingFiles {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.labels.is_empty()
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Looks up every image and automatic label listed in the pending tasks.
///
/// Tasks listing a wildcard are skipped. Missing paths are logged as
/// warnings and returned; nothing is fatal here.
pub fn check_files_exist(
    ledger: &Ledger,
    path_img: &Path,
    path_label: &Path,
    suffixes: &SuffixTable,
) -> MissingFiles {
    let mut missing = MissingFiles::default();
    let mut used_suffixes = BTreeSet::new();

    for (task, files) in ledger.pending_tasks() {
        if files.iter().any(|file| file.contains('*')) {
            continue;
        }
        let suffix = suffixes.for_task(task);
        for file in files {
            let id = bids::resolve(file);
            let image = id.path_in(path_img);
            if !image.exists() {
                missing.images.push(image);
            }
            if let Some(suffix) = suffix {
                let label = bids::add_suffix_path(&id.path_in(path_label), suffix);
                if !label.exists() {
                    used_suffixes.insert(format!("'{suffix}'"));
                    missing.labels.push(label);
                }
            }
        }
    }

    if !missing.images.is_empty() {
        warn!(
            "The following files are missing: \n{}",
            format_paths(&missing.images)
        );
        warn!("Please check that the files listed in the yaml file and the input path are correct.");
    }
    if !missing.labels.is_empty() {
        warn!(
            "The following label files are missing: \n{}",
            format_paths(&missing.labels)
        );
        warn!(
            "Please check that the used suffix [{}] is correct. \
             If not, you can provide custom suffix using '--suffix-files-*' flags. \
             If you are creating label(s) from scratch, ignore this message.",
            used_suffixes.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    missing
}

/// Replaces wildcard entries of pending tasks with the matching images.
///
/// Matches under a `derivatives` folder and files already listed under the
/// task's `CORR_*` key are left out. Matches are stored relative to
/// `path_img`.
pub fn expand_wildcards(ledger: &Ledger, path_img: &Path) -> Result<Ledger> {
    let mut expanded = ledger.clone();

    for (task, files) in ledger.pending_tasks() {
        if !files.iter().any(|file| file.contains('*')) {
            continue;
        }
        let done: BTreeSet<String> = done_key_for(task)
            .and_then(|key| ledger.get(&key))
            .map(|done| done.iter().map(|file| bids::basename(file)).collect())
            .unwrap_or_default();

        let mut resolved = Vec::new();
        for file in files {
            if !file.contains('*') {
                resolved.push(file.clone());
                continue;
            }
            let matches = find_files(path_img, file)?;
            debug!("{task}: '{file}' matched {} file(s)", matches.len());
            for path in matches {
                let relative = path.strip_prefix(path_img).unwrap_or(&path);
                let relative = relative.to_string_lossy().into_owned();
                if relative.contains("derivatives") {
                    continue;
                }
                let name = bids::basename(&relative);
                if done.contains(&name) || resolved.contains(&relative) {
                    continue;
                }
                resolved.push(relative);
            }
        }
        expanded.insert(task, resolved);
    }
    Ok(expanded)
}
