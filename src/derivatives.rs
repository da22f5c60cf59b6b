//! Copying corrected labels into the `derivatives/labels` tree of a dataset.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::bids;
use crate::dataset::find_files;
use crate::error::{Error, Result};
use crate::sidecar::sidecar_path;

fn require_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::Config(format!("{} does not exist.", path.display())))
    }
}

/// Copies every `.nii.gz` under `path_in` (and its JSON sidecar) to the
/// matching BIDS folder under `path_out`. Returns the copied label paths.
pub fn copy_to_derivatives(path_in: &Path, path_out: &Path) -> Result<Vec<PathBuf>> {
    require_dir(path_in)?;
    require_dir(path_out)?;

    let mut copied = Vec::new();
    for path_file_in in find_files(path_in, "*.nii.gz")? {
        let relative = path_file_in.strip_prefix(path_in).unwrap_or(&path_file_in);
        let id = bids::resolve(&relative.to_string_lossy());
        let dir_out = path_out.join(id.relative_dir());
        if !dir_out.is_dir() {
            fs::create_dir_all(&dir_out)?;
            info!("Creating directory: {}", dir_out.display());
        }
        let path_file_out = dir_out.join(&id.filename);
        fs::copy(&path_file_in, &path_file_out)?;
        info!(
            "Copying: {} to {}",
            path_file_in.display(),
            path_file_out.display()
        );

        let json_in = sidecar_path(&path_file_in);
        if json_in.is_file() {
            let json_out = sidecar_path(&path_file_out);
            fs::copy(&json_in, &json_out)?;
            info!("Copying: {} to {}", json_in.display(), json_out.display());
        } else {
            warn!("No JSON sidecar found for {}", path_file_in.display());
        }
        copied.push(path_file_out);
    }
    Ok(copied)
}
