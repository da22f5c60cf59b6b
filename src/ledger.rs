//! YAML ledger of files that still need a manual correction.
//!
//! The document maps task keys to lists of filenames:
//!
//! ```yaml
//! FILES_SEG:
//! - sub-001_T1w.nii.gz
//! - sub-002_T2w.nii.gz
//! FILES_LABEL:
//! - "sub-*_T1w.nii.gz"
//! CORR_SEG:
//! - sub-003_T1w.nii.gz
//! ```
//!
//! When a file has been corrected it moves from its `FILES_*` list to the
//! matching `CORR_*` list and the whole document is written back.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::bids;
use crate::common::{done_key_for, PENDING_PREFIX};
use crate::error::{Error, Result};

/// A plain scalar starting with `*` is read by YAML as an alias.
static UNQUOTED_WILDCARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:-\s+|[^:#\n]+:\s+)\*").expect("Invalid regex pattern for wildcard check")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    // document order is kept so that rewrites stay readable
    entries: Vec<(String, Vec<String>)>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the ledger at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "Input yml file {} does not exist or path is wrong.",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        let ledger = Self::parse(&text, &path.display().to_string())?;
        debug!("Loaded {} task(s) from {}", ledger.entries.len(), path.display());
        Ok(ledger)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, "<string>")
    }

    fn parse(text: &str, origin: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| {
            let mut msg = format!("YAML parsing error in {origin}: {e}.");
            if UNQUOTED_WILDCARD.is_match(text) {
                msg.push_str(
                    " The '*' character is a special character in YAML. \
                     To use '*' as a wildcard character, enclose the value in quotes, \
                     e.g. - \"*T2w.nii.gz\".",
                );
            }
            Error::Config(msg)
        })?;

        let mapping = match value {
            Value::Null => return Ok(Self::new()),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::Config(format!(
                    "{origin}: expected a mapping of task names to file lists"
                )))
            }
        };

        let mut ledger = Self::new();
        for (key, value) in mapping {
            let Value::String(task) = key else {
                return Err(Error::Config(format!("{origin}: task names must be strings")));
            };
            let files = match value {
                Value::Null => Vec::new(),
                Value::Sequence(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(file) => Ok(file),
                        other => Err(Error::Config(format!(
                            "{origin}: entry {other:?} under {task} is not a filename"
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?,
                _ => {
                    return Err(Error::Config(format!(
                        "{origin}: {task} must hold a list of filenames"
                    )))
                }
            };
            ledger.entries.push((task, files));
        }
        Ok(ledger)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        let mut mapping = Mapping::new();
        for (task, files) in &self.entries {
            let files = files.iter().cloned().map(Value::String).collect();
            mapping.insert(Value::String(task.clone()), Value::Sequence(files));
        }
        Ok(serde_yaml::to_string(&mapping)?)
    }

    /// Rewrites the whole document at `path`.
    ///
    /// Content goes to a temporary file next to `path` which is then renamed
    /// over it, so readers see either the old or the new ledger.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml_string()?;
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(yaml.as_bytes())?;
        temp_file.as_file().sync_all()?;
        if let Ok(metadata) = fs::metadata(path) {
            temp_file.as_file().set_permissions(metadata.permissions())?;
        }
        temp_file.persist(path).map_err(|e| Error::Io(e.error))?;
        debug!("Ledger written to {}", path.display());
        Ok(())
    }

    pub fn get(&self, task: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(key, _)| key == task)
            .map(|(_, files)| files.as_slice())
    }

    fn get_mut(&mut self, task: &str) -> Option<&mut Vec<String>> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == task)
            .map(|(_, files)| files)
    }

    fn entry_mut(&mut self, task: &str) -> &mut Vec<String> {
        let index = match self.entries.iter().position(|(key, _)| key == task) {
            Some(index) => index,
            None => {
                self.entries.push((task.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Replaces the list of `task`, keeping its position if it exists.
    pub fn insert(&mut self, task: &str, files: Vec<String>) {
        *self.entry_mut(task) = files;
    }

    pub fn tasks(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(task, files)| (task.as_str(), files.as_slice()))
    }

    /// Tasks still waiting for corrections (`FILES_*`).
    pub fn pending_tasks(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tasks()
            .filter(|(task, _)| task.starts_with(PENDING_PREFIX))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Same ledger with every entry reduced to its basename.
    pub fn normalize_to_basenames(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(task, files)| {
                let files = files.iter().map(|file| bids::basename(file)).collect();
                (task.clone(), files)
            })
            .collect();
        Self { entries }
    }

    /// Moves `completed` from `task` to its `CORR_*` companion in memory.
    ///
    /// Every pending entry containing the filename is dropped, so entries
    /// stored as paths and as bare names are both cleared. Returns the
    /// filename that was recorded.
    pub fn record_correction(&mut self, completed: &str, task: &str) -> Result<String> {
        let done_key = done_key_for(task).ok_or_else(|| {
            Error::InvalidTask(format!("{task} (expected a key starting with {PENDING_PREFIX})"))
        })?;
        let filename = bids::resolve(completed).filename;

        self.entry_mut(&done_key).push(filename.clone());
        if let Some(pending) = self.get_mut(task) {
            pending.retain(|entry| !entry.contains(filename.as_str()));
        }
        Ok(filename)
    }

    /// Records the correction and rewrites the ledger at `storage`.
    ///
    /// A write failure is returned as is; the in-memory ledger keeps the
    /// move.
    pub fn mark_corrected(&mut self, storage: &Path, completed: &str, task: &str) -> Result<()> {
        let filename = self.record_correction(completed, task)?;
        self.persist(storage)?;
        debug!("{filename} moved out of {task}");
        Ok(())
    }
}
