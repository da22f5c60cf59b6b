//! BIDS filename decomposition and label path derivation.
//!
//! Every tool in the crate goes through [`resolve`] to find where an image
//! lives in the dataset and through [`add_suffix`] / [`remove_suffix`] to name
//! the label file that belongs to it.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::common::Contrast;
use crate::error::{Error, Result};

/// Extensions that are split off as one unit.
const DOUBLE_EXTENSIONS: [&str; 2] = [".nii.gz", ".tar.gz"];

const DEFAULT_KEYS: [&str; 3] = ["sub", "ses", "echo"];
const DEFAULT_CONTRAST_RULES: [(&str, Contrast); 2] =
    [("dwi", Contrast::Dwi), ("bold", Contrast::Func)];

static DEFAULT_TOKENIZER: LazyLock<Tokenizer> = LazyLock::new(Tokenizer::default);

/// Parts of a BIDS path that the tools care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// e.g. `sub-001`, empty if absent
    pub subject: String,
    /// e.g. `ses-01`, empty if absent
    pub session: String,
    /// e.g. `echo-1`, empty if absent
    pub echo: String,
    pub contrast: Contrast,
    /// basename of the input
    pub filename: String,
    /// every entity the tokenizer found, in key order
    pub entities: Vec<(String, String)>,
}

impl Identifier {
    /// Extracted value of `key` (`acq` -> `acq-sag`).
    pub fn entity(&self, key: &str) -> Option<&str> {
        self.entities
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// `<subject>/<session>/<contrast>`, skipping the empty parts.
    pub fn relative_dir(&self) -> PathBuf {
        let mut dir = PathBuf::new();
        for part in [self.subject.as_str(), self.session.as_str()] {
            if !part.is_empty() {
                dir.push(part);
            }
        }
        dir.push(self.contrast.as_str());
        dir
    }

    /// Full path of the file under a dataset root.
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(self.relative_dir()).join(&self.filename)
    }
}

struct Entity {
    key: String,
    pattern: Regex,
}

/// Extracts `key-value` entities and guesses the contrast folder.
///
/// An entity value runs from `key-` up to the next `_` or `/`. Contrast rules
/// are checked in order and the first substring hit wins; `anat` otherwise.
pub struct Tokenizer {
    entities: Vec<Entity>,
    contrast_rules: Vec<(String, Contrast)>,
}

impl Tokenizer {
    pub fn new(keys: &[&str], contrast_rules: &[(&str, Contrast)]) -> Result<Self> {
        let entities = keys
            .iter()
            .map(|key| {
                let pattern = Regex::new(&format!(r"{}-[^_/]*[_/]", regex::escape(key)))
                    .map_err(|e| Error::InvalidInput(format!("entity '{key}': {e}")))?;
                Ok(Entity {
                    key: key.to_string(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let contrast_rules = contrast_rules
            .iter()
            .map(|(needle, contrast)| (needle.to_string(), *contrast))
            .collect();
        Ok(Self {
            entities,
            contrast_rules,
        })
    }

    /// Value of entity `key` in `path` including its prefix (`sub-001`).
    ///
    /// Empty when the tokenizer does not know `key` or the path lacks it.
    pub fn entity(&self, path: &str, key: &str) -> String {
        self.entities
            .iter()
            .find(|entity| entity.key == key)
            .and_then(|entity| entity.pattern.find(path))
            .map(|m| {
                let token = m.as_str();
                // drop the trailing delimiter
                token[..token.len() - 1].to_string()
            })
            .unwrap_or_default()
    }

    pub fn contrast(&self, path: &str) -> Contrast {
        self.contrast_rules
            .iter()
            .find(|(needle, _)| path.contains(needle.as_str()))
            .map(|(_, contrast)| *contrast)
            .unwrap_or(Contrast::Anat)
    }

    pub fn resolve(&self, path: &str) -> Identifier {
        let entities = self
            .entities
            .iter()
            .map(|entity| (entity.key.clone(), self.entity(path, &entity.key)))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        Identifier {
            subject: self.entity(path, "sub"),
            session: self.entity(path, "ses"),
            echo: self.entity(path, "echo"),
            contrast: self.contrast(path),
            filename: basename(path),
            entities,
        }
    }
}

impl Default for Tokenizer {
    /// `sub`, `ses` and `echo` entities; `dwi` and `bold` contrast rules.
    fn default() -> Self {
        Self::new(&DEFAULT_KEYS, &DEFAULT_CONTRAST_RULES)
            .expect("Invalid regex pattern for BIDS entities")
    }
}

/// Decomposes a filename or path with the default entity set.
pub fn resolve(path: &str) -> Identifier {
    DEFAULT_TOKENIZER.resolve(path)
}

/// Last path component, or the input itself if it has none.
pub fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Splits `path` into stem (directory included) and extension.
///
/// `.nii.gz` and `.tar.gz` stay whole. Otherwise the last dot of the
/// basename starts the extension, ignoring leading dots.
pub fn splitext(path: &str) -> (String, String) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let filename = &path[name_start..];

    for ext in DOUBLE_EXTENSIONS {
        if filename.ends_with(ext) {
            let split = path.len() - ext.len();
            return (path[..split].to_string(), ext.to_string());
        }
    }

    let leading_dots = filename.len() - filename.trim_start_matches('.').len();
    match filename.rfind('.') {
        Some(dot) if dot >= leading_dots => {
            let split = name_start + dot;
            (path[..split].to_string(), path[split..].to_string())
        }
        _ => (path.to_string(), String::new()),
    }
}

/// `t2.nii.gz` + `_seg` -> `t2_seg.nii.gz`
pub fn add_suffix(path: &str, suffix: &str) -> String {
    let (stem, ext) = splitext(path);
    format!("{stem}{suffix}{ext}")
}

/// Removes the first occurrence of `suffix` from the stem.
///
/// `t2_seg.nii.gz` - `_seg` -> `t2.nii.gz`. The match is not anchored to the
/// end of the stem.
pub fn remove_suffix(path: &str, suffix: &str) -> String {
    let (stem, ext) = splitext(path);
    format!("{}{ext}", stem.replacen(suffix, "", 1))
}

/// [`add_suffix`] for paths.
pub fn add_suffix_path(path: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(add_suffix(&path.to_string_lossy(), suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_full_path() {
        let id = resolve("/home/user/MRI/bids/sub-001/ses-01/anat/sub-001_ses-01_T1w.nii.gz");
        assert_eq!(id.subject, "sub-001");
        assert_eq!(id.session, "ses-01");
        assert_eq!(id.echo, "");
        assert_eq!(id.filename, "sub-001_ses-01_T1w.nii.gz");
        assert_eq!(id.contrast, Contrast::Anat);
    }

    #[test]
    fn test_resolve_dwi() {
        let id = resolve("/home/user/MRI/bids/sub-002/ses-02/dwi/sub-002_ses-02_dwi.nii.gz");
        assert_eq!(id.subject, "sub-002");
        assert_eq!(id.session, "ses-02");
        assert_eq!(id.filename, "sub-002_ses-02_dwi.nii.gz");
        assert_eq!(id.contrast, Contrast::Dwi);
    }

    #[test]
    fn test_resolve_without_session() {
        let id = resolve("/home/user/MRI/bids/sub-003/anat/sub-003_T1w.nii.gz");
        assert_eq!(id.subject, "sub-003");
        assert_eq!(id.session, "");
        assert_eq!(id.contrast, Contrast::Anat);

        let id = resolve("sub-003_T1w.nii.gz");
        assert_eq!(id.subject, "sub-003");
        assert_eq!(id.session, "");
        assert_eq!(id.filename, "sub-003_T1w.nii.gz");
        assert_eq!(id.contrast, Contrast::Anat);
    }

    #[test]
    fn test_resolve_session_lengths() {
        let id = resolve("sub-003_ses-01_T1w.nii.gz");
        assert_eq!(id.session, "ses-01");
        let id = resolve("sub-003_ses-001_T1w.nii.gz");
        assert_eq!(id.session, "ses-001");
        assert_eq!(id.filename, "sub-003_ses-001_T1w.nii.gz");
    }

    #[test]
    fn test_resolve_echo_and_func() {
        let id = resolve("sub-01/func/sub-01_task-rest_echo-2_bold.nii.gz");
        assert_eq!(id.subject, "sub-01");
        assert_eq!(id.echo, "echo-2");
        assert_eq!(id.contrast, Contrast::Func);
    }

    #[test]
    fn test_resolve_without_entities() {
        let id = resolve("invalid_filename_path.nii.gz");
        assert_eq!(id.subject, "");
        assert_eq!(id.session, "");
        assert_eq!(id.echo, "");
        assert_eq!(id.filename, "invalid_filename_path.nii.gz");
        assert_eq!(id.contrast, Contrast::Anat);
    }

    #[test]
    fn test_dwi_checked_before_bold() {
        let id = resolve("sub-01_acq-dwi_bold.nii.gz");
        assert_eq!(id.contrast, Contrast::Dwi);
    }

    #[test]
    fn test_relative_dir() {
        let id = resolve("sub-001_ses-01_T1w.nii.gz");
        assert_eq!(id.relative_dir(), PathBuf::from("sub-001/ses-01/anat"));
        let id = resolve("sub-001_dwi.nii.gz");
        assert_eq!(id.relative_dir(), PathBuf::from("sub-001/dwi"));
        assert_eq!(
            id.path_in(Path::new("/data")),
            PathBuf::from("/data/sub-001/dwi/sub-001_dwi.nii.gz")
        );
    }

    #[test]
    fn test_custom_tokenizer() {
        let tokenizer = Tokenizer::new(&["sub", "acq"], &[("T2star", Contrast::Anat)]).unwrap();
        let path = "sub-007_acq-sag_T2w.nii.gz";
        assert_eq!(tokenizer.entity(path, "acq"), "acq-sag");
        assert_eq!(tokenizer.entity(path, "ses"), "");
        let id = tokenizer.resolve(path);
        assert_eq!(id.echo, "");
        assert_eq!(id.entity("acq"), Some("acq-sag"));
        assert_eq!(id.entity("sub"), Some("sub-007"));
        assert_eq!(id.entity("ses"), None);
    }

    #[test]
    fn test_default_tokenizer_matches_resolve() {
        let path = "sub-01/ses-02/func/sub-01_ses-02_task-rest_echo-1_bold.nii.gz";
        assert_eq!(Tokenizer::default().resolve(path), resolve(path));
        assert_eq!(resolve(path).entity("echo"), Some("echo-1"));
        assert_eq!(resolve(path).entity("task"), None);
    }

    #[test]
    fn test_splitext() {
        assert_eq!(
            splitext("sub-001_ses-01_T1w.nii"),
            ("sub-001_ses-01_T1w".to_string(), ".nii".to_string())
        );
        assert_eq!(
            splitext("anat/sub-001_ses-01_T1w.nii.gz"),
            ("anat/sub-001_ses-01_T1w".to_string(), ".nii.gz".to_string())
        );
        assert_eq!(
            splitext("archive.tar.gz"),
            ("archive".to_string(), ".tar.gz".to_string())
        );
        assert_eq!(
            splitext("notes.txt.gz"),
            ("notes.txt".to_string(), ".gz".to_string())
        );
        assert_eq!(splitext("dir.d/README"), ("dir.d/README".to_string(), String::new()));
        assert_eq!(splitext(".bashrc"), (".bashrc".to_string(), String::new()));
    }

    #[test]
    fn test_add_suffix() {
        assert_eq!(add_suffix("t2.nii.gz", "_seg"), "t2_seg.nii.gz");
        assert_eq!(add_suffix("t2.nii", "_mean"), "t2_mean.nii");
        assert_eq!(
            add_suffix("anat/sub-001_ses-01_T1w.nii.gz", "_seg"),
            "anat/sub-001_ses-01_T1w_seg.nii.gz"
        );
    }

    #[test]
    fn test_remove_suffix() {
        assert_eq!(
            remove_suffix("sub-001_ses-01_T1w_seg.nii", "_seg"),
            "sub-001_ses-01_T1w.nii"
        );
        assert_eq!(
            remove_suffix("anat/sub-001_ses-01_T1w_seg.nii.gz", "_seg"),
            "anat/sub-001_ses-01_T1w.nii.gz"
        );
        assert_eq!(remove_suffix("t2a.nii.gz", "a"), "t2.nii.gz");
        // first occurrence wins, even away from the end
        assert_eq!(remove_suffix("sub-seg_T1w_seg.nii", "seg"), "sub-_T1w_seg.nii");
    }

    #[test]
    fn test_suffix_round_trip() {
        for (path, suffix) in [
            ("sub-001_T1w.nii.gz", "_seg-manual"),
            ("dir/sub-002_ses-01_T2w.nii", "_lesion"),
            ("data.tar.gz", "_v2"),
            ("plain", "_x"),
        ] {
            assert_eq!(remove_suffix(&add_suffix(path, suffix), suffix), path);
        }
    }
}
