use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no fixture JSON files found in {}", .0.display())]
    NoFixtures(PathBuf),
    #[error("fixture case {case}: {message}")]
    InvalidCase { case: String, message: String },
    #[error("{failed} of {total} fixture cases failed")]
    Failures { failed: usize, total: usize },
    #[error("{0} structured log line(s) failed validation")]
    InvalidLog(usize),
}
