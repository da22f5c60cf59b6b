//! JSON sidecars recording who corrected a label and when.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::bids;
use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SidecarFormat {
    /// `{"Author": ..., "Date": ...}`, replaced on every correction
    #[default]
    Simple,
    /// history kept in a `GeneratedBy` list
    Provenance,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimpleSidecar {
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Date")]
    pub date: String,
}

/// `sub-01_T1w_seg-manual.nii.gz` -> `sub-01_T1w_seg-manual.json`
pub fn sidecar_path(label: &Path) -> PathBuf {
    let (stem, _) = bids::splitext(&label.to_string_lossy());
    PathBuf::from(format!("{stem}.json"))
}

pub fn timestamp() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    fs::write(path, buf)?;
    Ok(())
}

/// Writes the sidecar of `label` and returns its path.
pub fn create_json(label: &Path, rater: &str, format: SidecarFormat) -> Result<PathBuf> {
    let path = sidecar_path(label);
    let date = timestamp();
    match format {
        SidecarFormat::Simple => {
            let sidecar = SimpleSidecar {
                author: rater.to_string(),
                date,
            };
            write_pretty(&path, &sidecar)?;
        }
        SidecarFormat::Provenance => {
            let mut root = if path.exists() {
                match serde_json::from_str::<Value>(&fs::read_to_string(&path)?)? {
                    Value::Object(map) => map,
                    _ => {
                        return Err(Error::InvalidInput(format!(
                            "{} does not hold a JSON object",
                            path.display()
                        )))
                    }
                }
            } else {
                Map::new()
            };
            let entry = json!({"Name": "Manual", "Author": rater, "Date": date});
            match root.get_mut("GeneratedBy") {
                Some(Value::Array(history)) => history.push(entry),
                _ => {
                    root.insert("GeneratedBy".into(), Value::Array(vec![entry]));
                }
            }
            root.entry("SpatialReference")
                .or_insert_with(|| Value::String("orig".into()));
            write_pretty(&path, &Value::Object(root))?;
        }
    }
    info!("JSON sidecar written: {}", path.display());
    Ok(path)
}

pub fn modification_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True when `path` exists and its mtime is not `before`.
pub fn check_if_modified(before: Option<SystemTime>, path: &Path) -> bool {
    match (before, modification_time(path)) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(before), Some(after)) => before != after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("a/sub-001_ses-01_T1w_seg-manual.nii.gz")),
            PathBuf::from("a/sub-001_ses-01_T1w_seg-manual.json")
        );
        assert_eq!(
            sidecar_path(Path::new("sub-001_T1w_lesion-manual.nii")),
            PathBuf::from("sub-001_T1w_lesion-manual.json")
        );
    }

    #[test]
    fn test_create_json_simple() {
        let dir = tempfile::tempdir().unwrap();
        let label = dir.path().join("sub-001_ses-01_T1w_seg-manual.nii.gz");
        fs::File::create(&label).unwrap();

        let path = create_json(&label, "Test Rater", SidecarFormat::Simple).unwrap();
        assert_eq!(path, dir.path().join("sub-001_ses-01_T1w_seg-manual.json"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("    \"Author\": \"Test Rater\""), "{text}");
        let sidecar: SimpleSidecar = serde_json::from_str(&text).unwrap();
        assert_eq!(sidecar.author, "Test Rater");
        assert!(chrono::NaiveDateTime::parse_from_str(&sidecar.date, DATE_FORMAT).is_ok());
    }

    #[test]
    fn test_create_json_provenance_appends() {
        let dir = tempfile::tempdir().unwrap();
        let label = dir.path().join("sub-001_T2w_lesion-manual.nii.gz");
        fs::write(
            sidecar_path(&label),
            r#"{"GeneratedBy": [{"Name": "sct_deepseg", "Version": "6.0"}], "Extra": 1}"#,
        )
        .unwrap();

        create_json(&label, "First Rater", SidecarFormat::Provenance).unwrap();
        create_json(&label, "Second Rater", SidecarFormat::Provenance).unwrap();

        let value: Value =
            serde_json::from_str(&fs::read_to_string(sidecar_path(&label)).unwrap()).unwrap();
        let history = value["GeneratedBy"].as_array().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0]["Name"], "sct_deepseg");
        assert_eq!(history[1]["Author"], "First Rater");
        assert_eq!(history[2]["Author"], "Second Rater");
        assert_eq!(history[2]["Name"], "Manual");
        assert_eq!(value["SpatialReference"], "orig");
        assert_eq!(value["Extra"], 1);
    }

    #[test]
    fn test_check_if_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.nii.gz");
        assert!(!check_if_modified(None, &path));

        fs::write(&path, b"a").unwrap();
        assert!(check_if_modified(None, &path));

        let before = modification_time(&path);
        assert!(!check_if_modified(before, &path));

        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(before.unwrap() + Duration::from_secs(5)).unwrap();
        assert!(check_if_modified(before, &path));
    }
}
