//! External programs the rater works in.
//!
//! Every launch blocks until the program exits. The exit status says nothing
//! about the label, which is checked afterwards by modification time.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::common::TaskKind;
use crate::error::{Error, Result};

const SCT_HINT: &str =
    "Please install the Spinal Cord Toolbox and check that it was added to your PATH variable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Viewer {
    #[default]
    Itksnap,
    Fsleyes,
    Slicer,
}

impl Viewer {
    /// Executable names to try, in order.
    fn executables(&self) -> &'static [&'static str] {
        match self {
            Viewer::Itksnap => &["itksnap", "ITK-SNAP"],
            Viewer::Fsleyes => &["fsleyes"],
            Viewer::Slicer => &["Slicer", "slicer"],
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Viewer::Itksnap => "ITK-SNAP",
            Viewer::Fsleyes => "FSLeyes",
            Viewer::Slicer => "3D Slicer",
        }
    }

    /// Command opening `image` with `label` as an editable layer.
    ///
    /// `intensities` sets the FSLeyes display range.
    pub fn launch(&self, image: &Path, label: &Path, intensities: Option<(f64, f64)>) -> Result<Launch> {
        let program = find_executable(self.executables()).ok_or_else(|| Error::ToolNotFound {
            tool: self.display_name().to_string(),
            hint: format!(
                "Please install it or check that it was added to your PATH variable. \
                 You can pick another viewer with --viewer ({}).",
                other_viewers(*self)
            ),
        })?;
        let mut launch = Launch::new(program);
        match self {
            Viewer::Itksnap => {
                launch.arg("-g").arg(image).arg("-s").arg(label);
            }
            Viewer::Fsleyes => {
                launch.arg(image);
                if let Some((min, max)) = intensities {
                    launch.arg("-dr").arg(min.to_string()).arg(max.to_string());
                }
                launch.arg(label).arg("-cm").arg("red");
            }
            Viewer::Slicer => {
                launch.arg(image).arg(label);
            }
        }
        Ok(launch)
    }

    pub fn instructions(&self) -> String {
        format!(
            "In {}, correct the label, then save it with the same name (overwrite).",
            self.display_name()
        )
    }
}

fn other_viewers(current: Viewer) -> String {
    [Viewer::Itksnap, Viewer::Fsleyes, Viewer::Slicer]
        .iter()
        .filter(|v| **v != current)
        .map(|v| v.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Searches PATH for the first of `names`.
pub fn find_executable(names: &[&str]) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        for name in names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            #[cfg(windows)]
            {
                let exe = candidate.with_extension("exe");
                if exe.is_file() {
                    return Some(exe);
                }
            }
        }
    }
    None
}

/// One blocking invocation of an external program.
#[derive(Debug, Clone)]
pub struct Launch {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Launch {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(&mut self, arg: impl AsRef<std::ffi::OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Runs the program and waits for it to exit.
    ///
    /// Only a failure to start is an error.
    pub fn run(&self) -> Result<()> {
        info!("Opening {}", self.program.display());
        debug!("{:?} {:?}", self.program, self.args);
        let status = Command::new(&self.program).args(&self.args).status()?;
        if !status.success() {
            warn!("{} exited with {}", self.program.display(), status);
        }
        Ok(())
    }
}

/// `sct_label_utils` viewer for disc labels or the pontomedullary junction.
pub fn sct_label_viewer(image: &Path, label: &Path, kind: TaskKind) -> Result<Launch> {
    let (levels, message) = match kind {
        TaskKind::Label => (
            "1:25",
            "Click at the posterior tip of the intervertebral discs, then click 'Save and Quit'.",
        ),
        TaskKind::Pmj => (
            "50",
            "Click at the posterior tip of the pontomedullary junction (PMJ) then click 'Save and Quit'.",
        ),
        other => return Err(Error::InvalidTask(format!("{other} is not a point labeling task"))),
    };
    let program = require_tool("sct_label_utils", SCT_HINT)?;
    let mut launch = Launch::new(program);
    launch
        .arg("-i")
        .arg(image)
        .arg("-create-viewer")
        .arg(levels)
        .arg("-o")
        .arg(label)
        .arg("-msg")
        .arg(message);
    Ok(launch)
}

/// `sct_get_centerline` in manual mode.
pub fn sct_centerline_viewer(image: &Path, label: &Path) -> Result<Launch> {
    let program = require_tool("sct_get_centerline", SCT_HINT)?;
    let mut launch = Launch::new(program);
    launch
        .arg("-i")
        .arg(image)
        .arg("-method")
        .arg("viewer")
        .arg("-gap")
        .arg("30")
        .arg("-o")
        .arg(label);
    Ok(launch)
}

fn require_tool(name: &str, hint: &str) -> Result<PathBuf> {
    find_executable(&[name]).ok_or_else(|| Error::ToolNotFound {
        tool: format!("'{name}'"),
        hint: hint.to_string(),
    })
}

/// Checks that each software package answers its version command.
pub fn check_software_installed(software: &[&str]) -> Result<()> {
    for name in software {
        let version_cmd = match *name {
            "sct" => "sct_version",
            other => return Err(Error::InvalidInput(format!("unknown software '{other}'"))),
        };
        let program = require_tool(version_cmd, SCT_HINT)?;
        let output = Command::new(program).output()?;
        if !output.status.success() {
            return Err(Error::ToolNotFound {
                tool: format!("'{name}'"),
                hint: "Please install it before using this program.".into(),
            });
        }
        info!(
            "'{name}' (version: {}) is installed.",
            String::from_utf8_lossy(&output.stdout).trim()
        );
    }
    Ok(())
}
