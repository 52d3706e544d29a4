//! File I/O, validation, and serialization for the lendscore pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, LoanDataset};
pub use error::IoError;
pub use reader::{DEFAULT_LABEL_COLUMN, LoanReader};
pub use writer::{EvaluationRecord, ReportWriter};
