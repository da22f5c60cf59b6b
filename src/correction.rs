//! One correction session: open each pending file, keep what the rater saved.
//!
//! Problems with a single file are logged and the file stays pending. Only a
//! missing external tool or a failed ledger write stops the session.

use std::fs;
use std::io;
use std::path::Path;

use glob::Pattern;
use tracing::{debug, info, warn};

use crate::bids;
use crate::common::TaskKind;
use crate::config::{FilePaths, Settings};
use crate::dataset::find_files;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::nii;
use crate::prompt::{decide_label_action, LabelAction};
use crate::sidecar::{check_if_modified, create_json, modification_time, SidecarFormat};
use crate::viewer::{check_software_installed, sct_centerline_viewer, sct_label_viewer, Launch, Viewer};

pub struct Corrector<'a> {
    pub settings: &'a Settings,
    pub viewer: Viewer,
    pub sidecar_format: SidecarFormat,
    pub rater: &'a str,
}

impl Corrector<'_> {
    /// Program the rater corrects a `kind` label in.
    pub fn launch_for(&self, kind: TaskKind, paths: &FilePaths) -> Result<Launch> {
        match kind {
            TaskKind::Seg | TaskKind::GmSeg | TaskKind::Lesion => {
                let intensities = match self.viewer {
                    Viewer::Fsleyes => Some(nii::image_intensities(&paths.image)?),
                    _ => None,
                };
                info!("{}", self.viewer.instructions());
                self.viewer.launch(&paths.image, &paths.label, intensities)
            }
            TaskKind::Label | TaskKind::Pmj => {
                check_software_installed(&["sct"])?;
                sct_label_viewer(&paths.image, &paths.label, kind)
            }
            TaskKind::Centerline => {
                check_software_installed(&["sct"])?;
                sct_centerline_viewer(&paths.image, &paths.label)
            }
        }
    }

    /// Prepares the label of `file`, hands it to `open` and checks whether
    /// it was saved. Returns true for a saved correction.
    pub fn correct_file<C, O>(&self, kind: TaskKind, file: &str, confirm: C, open: O) -> Result<bool>
    where
        C: FnOnce(&str) -> io::Result<bool>,
        O: FnOnce(TaskKind, &FilePaths) -> Result<()>,
    {
        let paths = self.settings.paths_for(kind, file);
        if !paths.image.is_file() {
            return Err(Error::InvalidInput(format!(
                "{} does not exist",
                paths.image.display()
            )));
        }
        fs::create_dir_all(paths.label_dir())?;
        debug!("{} -> {}", paths.image.display(), paths.label.display());

        match decide_label_action(&paths.label, &paths.source_label, confirm)? {
            LabelAction::Skip => {
                info!("Keeping {}", paths.label.display());
                return Ok(false);
            }
            LabelAction::EditExisting => {}
            LabelAction::CopyFromSource => {
                fs::copy(&paths.source_label, &paths.label)?;
            }
            LabelAction::CreateEmpty => {
                if kind.is_mask() {
                    nii::create_empty_mask(&paths.image, &paths.label)?;
                }
            }
        }
        let before = modification_time(&paths.label);

        open(kind, &paths)?;

        if !check_if_modified(before, &paths.label) {
            info!(
                "{} was not saved, {file} stays in {}",
                paths.label.display(),
                kind.pending_key()
            );
            return Ok(false);
        }

        // viewers may save in their own orientation
        match nii::get_orientation(&paths.image) {
            Ok(code) => {
                if let Err(e) = nii::change_orientation(&paths.label, &code) {
                    warn!("Cannot reorient {}: {e}", paths.label.display());
                }
            }
            Err(e) => warn!("Cannot read orientation of {}: {e}", paths.image.display()),
        }
        create_json(&paths.label, self.rater, self.sidecar_format)?;
        Ok(true)
    }

    /// Corrects every file of `task` and records each saved one in
    /// `ledger`, rewritten at `storage` after every file.
    ///
    /// `files` are the resolved names to work on; `ledger` is the document
    /// as loaded, so its other entries are written back untouched.
    pub fn correct_task<C, O>(
        &self,
        ledger: &mut Ledger,
        storage: &Path,
        task: &str,
        files: &[String],
        mut confirm: C,
        mut open: O,
    ) -> Result<usize>
    where
        C: FnMut(&str) -> io::Result<bool>,
        O: FnMut(TaskKind, &FilePaths) -> Result<()>,
    {
        let kind = TaskKind::from_key(task).ok_or_else(|| Error::InvalidTask(task.to_string()))?;
        let mut corrected = 0;
        for file in files {
            match self.correct_file(kind, file, &mut confirm, &mut open) {
                Ok(true) => {
                    ledger.mark_corrected(storage, file, task)?;
                    corrected += 1;
                }
                Ok(false) => {}
                Err(e @ Error::ToolNotFound { .. }) => return Err(e),
                Err(e) => warn!("Skipping {file}: {e}"),
            }
        }
        Ok(corrected)
    }

    /// Copies the automatic segmentations absent from `listed` straight to
    /// derivatives, with a sidecar.
    pub fn add_segmentations(&self, listed: &[String]) -> Result<usize> {
        let root = &self.settings.path_label;
        let suffix = self.settings.suffixes.get(TaskKind::Seg);
        let pattern = format!("*{}.nii.gz", Pattern::escape(suffix));
        let mut added = 0;
        for source in find_files(root, &pattern)? {
            let relative = source.strip_prefix(root).unwrap_or(&source);
            let relative = relative.to_string_lossy();
            if relative.contains("derivatives") {
                continue;
            }
            let file = bids::remove_suffix(&bids::basename(&relative), suffix);
            if listed.contains(&file) {
                continue;
            }
            let paths = self.settings.paths_for(TaskKind::Seg, &file);
            if paths.label.exists() {
                info!("{} already exists", paths.label.display());
                continue;
            }
            fs::create_dir_all(paths.label_dir())?;
            fs::copy(&source, &paths.label)?;
            info!("Copying: {} to {}", source.display(), paths.label.display());
            create_json(&paths.label, self.rater, self.sidecar_format)?;
            added += 1;
        }
        Ok(added)
    }
}
