//! Questions asked to the rater on the terminal.

use std::io::{self, BufRead, Write};
use std::path::Path;

/// What to do with a label before opening the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAction {
    /// a corrected label exists and the rater wants to modify it
    EditExisting,
    /// a corrected label exists and the rater does not want to touch it
    Skip,
    /// start from the automatic label
    CopyFromSource,
    /// no label anywhere; start from an empty mask
    CreateEmpty,
}

impl LabelAction {
    pub fn opens_viewer(&self) -> bool {
        !matches!(self, LabelAction::Skip)
    }
}

/// Asks `question` until the answer is `y` or `n`. End of input means no.
pub fn ask_yes_no<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<bool> {
    loop {
        write!(output, "{question} [y/n] ")?;
        output.flush()?;
        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => writeln!(output, "Please answer with 'y' or 'n'")?,
        }
    }
}

/// Decides how to start working on `label`.
///
/// Only asks when `label` already exists; `confirm` gets the question and
/// returns the answer.
pub fn decide_label_action<F>(
    label: &Path,
    source_label: &Path,
    confirm: F,
) -> io::Result<LabelAction>
where
    F: FnOnce(&str) -> io::Result<bool>,
{
    if label.exists() {
        let question = format!(
            "WARNING! The file {} already exists. Would you like to modify it?",
            label.display()
        );
        if confirm(&question)? {
            Ok(LabelAction::EditExisting)
        } else {
            Ok(LabelAction::Skip)
        }
    } else if source_label.exists() {
        Ok(LabelAction::CopyFromSource)
    } else {
        Ok(LabelAction::CreateEmpty)
    }
}

/// Prompts until a non-empty name is given.
pub fn read_rater_name<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<String> {
    loop {
        write!(
            output,
            "Enter your name (Firstname Lastname). It will be used to generate a json sidecar \
             with each corrected file: "
        )?;
        output.flush()?;
        let mut name = String::new();
        if input.read_line(&mut name)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no rater name given",
            ));
        }
        let name = name.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn label_paths(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let anat = dir.join("BIDS/sub-001/ses-01/anat");
        fs::create_dir_all(&anat).unwrap();
        (
            anat.join("sub-001_ses-01_T1w_seg-manual.nii.gz"),
            anat.join("sub-001_ses-01_T1w_seg.nii.gz"),
        )
    }

    #[test]
    fn test_existing_label_yes() {
        let dir = tempfile::tempdir().unwrap();
        let (label, seg) = label_paths(dir.path());
        fs::File::create(&label).unwrap();
        let action = decide_label_action(&label, &seg, |_| Ok(true)).unwrap();
        assert_eq!(action, LabelAction::EditExisting);
        assert!(action.opens_viewer());
    }

    #[test]
    fn test_existing_label_no() {
        let dir = tempfile::tempdir().unwrap();
        let (label, seg) = label_paths(dir.path());
        fs::File::create(&label).unwrap();
        let action = decide_label_action(&label, &seg, |_| Ok(false)).unwrap();
        assert_eq!(action, LabelAction::Skip);
        assert!(!action.opens_viewer());
    }

    #[test]
    fn test_missing_label_copies_source() {
        let dir = tempfile::tempdir().unwrap();
        let (label, seg) = label_paths(dir.path());
        fs::File::create(&seg).unwrap();
        let action = decide_label_action(&label, &seg, |_| panic!("should not ask")).unwrap();
        assert_eq!(action, LabelAction::CopyFromSource);
    }

    #[test]
    fn test_nothing_present_creates_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (label, seg) = label_paths(dir.path());
        let action = decide_label_action(&label, &seg, |_| panic!("should not ask")).unwrap();
        assert_eq!(action, LabelAction::CreateEmpty);
    }

    #[test]
    fn test_ask_yes_no_repeats() {
        let mut input = Cursor::new("maybe\n\nn\n");
        let mut output = Vec::new();
        assert!(!ask_yes_no(&mut input, &mut output, "Continue?").unwrap());
        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches("Please answer with 'y' or 'n'").count(), 2);

        let mut input = Cursor::new(" y \n");
        assert!(ask_yes_no(&mut input, &mut Vec::new(), "Continue?").unwrap());

        let mut input = Cursor::new("");
        assert!(!ask_yes_no(&mut input, &mut Vec::new(), "Continue?").unwrap());
    }

    #[test]
    fn test_read_rater_name() {
        let mut input = Cursor::new("\n  Jane Doe \n");
        let name = read_rater_name(&mut input, &mut Vec::new()).unwrap();
        assert_eq!(name, "Jane Doe");

        let mut input = Cursor::new("");
        assert!(read_rater_name(&mut input, &mut Vec::new()).is_err());
    }
}
