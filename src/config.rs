//! Run settings shared by the binaries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::bids;
use crate::common::TaskKind;

/// Folder for manual labels, relative to the root of a BIDS dataset.
pub const FOLDER_DERIVATIVES: &str = "derivatives/labels";

/// Appended to the task suffix to name a manually corrected label.
pub const DEFAULT_LABEL_SUFFIX: &str = "-manual";

/// Suffix of the automatic label for each task kind.
#[derive(Debug, Clone)]
pub struct SuffixTable {
    suffixes: HashMap<TaskKind, String>,
}

impl Default for SuffixTable {
    fn default() -> Self {
        let suffixes = TaskKind::ALL
            .iter()
            .map(|kind| (*kind, kind.default_suffix().to_string()))
            .collect();
        Self { suffixes }
    }
}

impl SuffixTable {
    pub fn set(&mut self, kind: TaskKind, suffix: impl Into<String>) {
        self.suffixes.insert(kind, suffix.into());
    }

    pub fn get(&self, kind: TaskKind) -> &str {
        self.suffixes
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_suffix())
    }

    /// Suffix for a ledger key, `None` for unknown tasks.
    pub fn for_task(&self, task: &str) -> Option<&str> {
        TaskKind::from_key(task).map(|kind| self.get(kind))
    }
}

/// Where images, automatic labels and corrected labels live.
#[derive(Debug, Clone)]
pub struct Settings {
    /// BIDS folder with the images
    pub path_img: PathBuf,
    /// folder with the automatic labels (usually the same as `path_img`)
    pub path_label: PathBuf,
    /// BIDS dataset receiving `derivatives/labels`
    pub path_out: PathBuf,
    pub suffixes: SuffixTable,
    pub label_suffix: String,
}

impl Settings {
    pub fn derivatives_dir(&self) -> PathBuf {
        self.path_out.join(FOLDER_DERIVATIVES)
    }

    /// Image, automatic label and corrected label for one ledger entry.
    pub fn paths_for(&self, kind: TaskKind, file: &str) -> FilePaths {
        let id = bids::resolve(file);
        let suffix = self.suffixes.get(kind);
        let manual_suffix = format!("{suffix}{}", self.label_suffix);
        FilePaths {
            image: id.path_in(&self.path_img),
            source_label: bids::add_suffix_path(&id.path_in(&self.path_label), suffix),
            label: bids::add_suffix_path(&id.path_in(&self.derivatives_dir()), &manual_suffix),
            subject: id.subject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePaths {
    pub image: PathBuf,
    pub source_label: PathBuf,
    pub label: PathBuf,
    pub subject: String,
}

impl FilePaths {
    pub fn label_dir(&self) -> &Path {
        self.label.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// `--suffix-files-*` flags overriding the automatic label suffixes.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SuffixArgs {
    /// suffix of the automatic spinal cord segmentations
    #[arg(long, value_name = "SUFFIX")]
    pub suffix_files_seg: Option<String>,

    /// suffix of the automatic gray matter segmentations
    #[arg(long, value_name = "SUFFIX")]
    pub suffix_files_gmseg: Option<String>,

    /// suffix of the automatic disc labels
    #[arg(long, value_name = "SUFFIX")]
    pub suffix_files_label: Option<String>,

    /// suffix of the automatic PMJ labels
    #[arg(long, value_name = "SUFFIX")]
    pub suffix_files_pmj: Option<String>,

    /// suffix of the automatic lesion segmentations
    #[arg(long, value_name = "SUFFIX")]
    pub suffix_files_lesion: Option<String>,

    /// suffix of the automatic centerlines
    #[arg(long, value_name = "SUFFIX")]
    pub suffix_files_centerline: Option<String>,
}

impl SuffixArgs {
    pub fn to_table(&self) -> SuffixTable {
        let mut table = SuffixTable::default();
        let overrides = [
            (TaskKind::Seg, &self.suffix_files_seg),
            (TaskKind::GmSeg, &self.suffix_files_gmseg),
            (TaskKind::Label, &self.suffix_files_label),
            (TaskKind::Pmj, &self.suffix_files_pmj),
            (TaskKind::Lesion, &self.suffix_files_lesion),
            (TaskKind::Centerline, &self.suffix_files_centerline),
        ];
        for (kind, suffix) in overrides {
            if let Some(suffix) = suffix {
                table.set(kind, suffix.clone());
            }
        }
        table
    }
}
