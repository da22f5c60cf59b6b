//! Staging of the files listed in a ledger for correction on another machine.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::bids;
use crate::common::TaskKind;
use crate::config::SuffixTable;
use crate::error::{Error, Result};
use crate::ledger::Ledger;

fn copy_into(file: &Path, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = file
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("{} has no file name", file.display())))?;
    let dest = dir.join(name);
    fs::copy(file, &dest)?;
    info!("-> {}", dest.display());
    Ok(dest)
}

/// Copies images (and automatic masks) of every pending task to `out_dir`.
///
/// Files keep their `<subject>/<session>/<contrast>` folders. A file listed
/// under several tasks is copied once per task, overwriting itself.
pub fn stage_for_correction(
    ledger: &Ledger,
    path_img: &Path,
    suffixes: &SuffixTable,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut staged = Vec::new();
    for (task, files) in ledger.pending_tasks() {
        let kind = TaskKind::from_key(task).ok_or_else(|| Error::InvalidTask(task.to_string()))?;
        for file in files {
            let id = bids::resolve(file);
            let image = id.path_in(path_img);
            let dest_dir = out_dir.join(id.relative_dir());
            if !image.exists() {
                warn!("Skipping missing image {}", image.display());
                continue;
            }
            staged.push(copy_into(&image, &dest_dir)?);

            if kind.is_mask() {
                let label = bids::add_suffix_path(&image, suffixes.get(kind));
                if label.exists() {
                    staged.push(copy_into(&label, &dest_dir)?);
                } else {
                    warn!("No {} label for {}", task, id.filename);
                }
            }
        }
    }
    staged.sort();
    staged.dedup();
    Ok(staged)
}
