use std::fs;
use std::path::Path;

use bidsnii::common::TaskKind;
use bidsnii::config::{Settings, SuffixTable, DEFAULT_LABEL_SUFFIX};
use bidsnii::dataset::{check_files_exist, expand_wildcards};
use bidsnii::derivatives::copy_to_derivatives;
use bidsnii::ledger::Ledger;
use bidsnii::package::stage_for_correction;
use bidsnii::sidecar::{create_json, SidecarFormat};

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"nii").unwrap();
}

fn dataset(root: &Path) {
    for file in [
        "sub-001/anat/sub-001_T2w.nii.gz",
        "sub-001/anat/sub-001_T2w_seg.nii.gz",
        "sub-002/ses-01/anat/sub-002_ses-01_T2w.nii.gz",
        "sub-002/ses-01/anat/sub-002_ses-01_T2w_seg.nii.gz",
        "sub-003/dwi/sub-003_dwi.nii.gz",
        "derivatives/labels/sub-001/anat/sub-001_T2w_seg-manual.nii.gz",
    ] {
        touch(&root.join(file));
    }
}

#[test]
fn correction_session_without_viewer() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data_processed");
    dataset(&data);
    let config = dir.path().join("config.yml");
    fs::write(
        &config,
        "FILES_SEG:\n  - \"*T2w.nii.gz\"\nFILES_LABEL:\n  - sub-003/dwi/sub-003_dwi.nii.gz\nCORR_SEG:\n  - sub-001_T2w.nii.gz\n",
    )
    .unwrap();

    let mut ledger = Ledger::load(&config).unwrap();
    let resolved = expand_wildcards(&ledger, &data).unwrap().normalize_to_basenames();
    assert_eq!(resolved.get("FILES_SEG").unwrap(), ["sub-002_ses-01_T2w.nii.gz"]);
    assert_eq!(resolved.get("FILES_LABEL").unwrap(), ["sub-003_dwi.nii.gz"]);

    let missing = check_files_exist(&resolved, &data, &data, &SuffixTable::default());
    assert!(missing.images.is_empty());
    assert_eq!(
        missing.labels,
        [data.join("sub-003/dwi/sub-003_dwi_labels-disc.nii.gz")]
    );

    let settings = Settings {
        path_img: data.clone(),
        path_label: data.clone(),
        path_out: dir.path().join("bids"),
        suffixes: SuffixTable::default(),
        label_suffix: DEFAULT_LABEL_SUFFIX.to_string(),
    };
    let paths = settings.paths_for(TaskKind::Seg, "sub-002_ses-01_T2w.nii.gz");
    fs::create_dir_all(paths.label_dir()).unwrap();
    fs::copy(&paths.source_label, &paths.label).unwrap();
    create_json(&paths.label, "Jane Doe", SidecarFormat::Simple).unwrap();
    ledger
        .mark_corrected(&config, "sub-002_ses-01_T2w.nii.gz", "FILES_SEG")
        .unwrap();

    // the pattern and the path entry are written back as they were
    let reloaded = Ledger::load(&config).unwrap();
    assert_eq!(reloaded.get("FILES_SEG").unwrap(), ["*T2w.nii.gz"]);
    assert_eq!(
        reloaded.get("CORR_SEG").unwrap(),
        ["sub-001_T2w.nii.gz", "sub-002_ses-01_T2w.nii.gz"]
    );
    assert_eq!(
        reloaded.get("FILES_LABEL").unwrap(),
        ["sub-003/dwi/sub-003_dwi.nii.gz"]
    );
    // the corrected file is no longer matched by the pattern
    let resolved = expand_wildcards(&reloaded, &data).unwrap();
    assert!(resolved.get("FILES_SEG").unwrap().is_empty());

    // hand the corrected labels over to the BIDS dataset
    let bids_labels = dir.path().join("dataset/derivatives/labels");
    fs::create_dir_all(&bids_labels).unwrap();
    let copied = copy_to_derivatives(&settings.derivatives_dir(), &bids_labels).unwrap();
    assert_eq!(
        copied,
        [bids_labels.join("sub-002/ses-01/anat/sub-002_ses-01_T2w_seg-manual.nii.gz")]
    );
    assert!(bids_labels
        .join("sub-002/ses-01/anat/sub-002_ses-01_T2w_seg-manual.json")
        .is_file());
}

#[test]
fn packaging_copies_images_and_segmentations() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data_processed");
    dataset(&data);
    let ledger = Ledger::from_yaml_str(
        "FILES_SEG:\n  - sub-001_T2w.nii.gz\nFILES_PMJ:\n  - sub-003_dwi.nii.gz\n",
    )
    .unwrap();

    let out = dir.path().join("data_to_correct");
    let staged = stage_for_correction(&ledger, &data, &SuffixTable::default(), &out).unwrap();
    assert_eq!(staged.len(), 3);
    assert!(out.join("sub-001/anat/sub-001_T2w_seg.nii.gz").is_file());
    assert!(out.join("sub-003/dwi/sub-003_dwi.nii.gz").is_file());
    assert!(!out.join("derivatives").exists());
}
