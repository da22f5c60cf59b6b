use std::fmt;

/// BIDS datatype folder an image lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contrast {
    Anat,
    Dwi,
    Func,
}

impl Contrast {
    pub fn as_str(&self) -> &'static str {
        match self {
            Contrast::Anat => "anat",
            Contrast::Dwi => "dwi",
            Contrast::Func => "func",
        }
    }
}

impl fmt::Display for Contrast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of label a ledger task asks for.
///
/// Pending tasks are stored under `FILES_<KIND>` and finished ones under
/// `CORR_<KIND>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Seg,
    GmSeg,
    Label,
    Pmj,
    Lesion,
    Centerline,
}

pub const PENDING_PREFIX: &str = "FILES";
pub const DONE_PREFIX: &str = "CORR";

impl TaskKind {
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Seg,
        TaskKind::GmSeg,
        TaskKind::Label,
        TaskKind::Pmj,
        TaskKind::Lesion,
        TaskKind::Centerline,
    ];

    /// Parses a ledger key such as `FILES_SEG` or `CORR_LESION`.
    pub fn from_key(key: &str) -> Option<Self> {
        let kind = key
            .strip_prefix("FILES_")
            .or_else(|| key.strip_prefix("CORR_"))?;
        match kind {
            "SEG" => Some(TaskKind::Seg),
            "GMSEG" => Some(TaskKind::GmSeg),
            "LABEL" => Some(TaskKind::Label),
            "PMJ" => Some(TaskKind::Pmj),
            "LESION" => Some(TaskKind::Lesion),
            "CENTERLINE" => Some(TaskKind::Centerline),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TaskKind::Seg => "SEG",
            TaskKind::GmSeg => "GMSEG",
            TaskKind::Label => "LABEL",
            TaskKind::Pmj => "PMJ",
            TaskKind::Lesion => "LESION",
            TaskKind::Centerline => "CENTERLINE",
        }
    }

    pub fn pending_key(&self) -> String {
        format!("{PENDING_PREFIX}_{}", self.name())
    }

    pub fn done_key(&self) -> String {
        format!("{DONE_PREFIX}_{}", self.name())
    }

    /// Suffix the processing pipeline gives to the automatic label.
    pub fn default_suffix(&self) -> &'static str {
        match self {
            TaskKind::Seg => "_seg",
            TaskKind::GmSeg => "_gmseg",
            TaskKind::Label => "_labels-disc",
            TaskKind::Pmj => "_pmj",
            TaskKind::Lesion => "_lesion",
            TaskKind::Centerline => "_centerline",
        }
    }

    /// Masks are painted in a generic viewer; point labels go through SCT.
    pub fn is_mask(&self) -> bool {
        matches!(self, TaskKind::Seg | TaskKind::GmSeg | TaskKind::Lesion)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pending_key())
    }
}

/// Companion key a finished entry moves to: `FILES_X` -> `CORR_X`.
pub fn done_key_for(task: &str) -> Option<String> {
    task.strip_prefix(PENDING_PREFIX)
        .map(|rest| format!("{DONE_PREFIX}{rest}"))
}
