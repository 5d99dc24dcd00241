//! JSON bring-up report for external tooling.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

use super::StepOutcome;

/// Everything a run did, written as pretty-printed JSON when the
/// operator asks for a report file.
#[derive(Debug, Serialize)]
pub struct BringupReport {
    pub nsx_manager: String,
    pub vcenter: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub steps: Vec<StepOutcome>,
}

impl BringupReport {
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
