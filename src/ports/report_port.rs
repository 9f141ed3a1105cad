//! Report generation port trait.

use crate::domain::error::DcasimError;
use crate::domain::report::SimulationReport;
use std::path::{Path, PathBuf};

/// Port for writing simulation reports.
pub trait ReportPort {
    /// Writes the report into `output_dir` and returns the path of the main
    /// document.
    fn write(&self, report: &SimulationReport, output_dir: &Path) -> Result<PathBuf, DcasimError>;
}
