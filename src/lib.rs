//! Tools for the manual correction of labels in BIDS datasets.
//!
//! A YAML ledger lists, per task, the files still waiting for a rater. The
//! binaries open each one in a viewer, store the corrected label under
//! `derivatives/labels` and move the entry to the task's `CORR_*` list.

pub mod bids;
pub mod common;
pub mod config;
pub mod correction;
pub mod dataset;
pub mod derivatives;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod nii;
pub mod package;
pub mod prompt;
pub mod sidecar;
pub mod viewer;

pub use error::{Error, Result};
