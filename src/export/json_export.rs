//! JSON snapshot of a pipeline session.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::counter::CountComparison;
use crate::exposure::ExposureTotals;
use crate::session::{ExposureSummary, HistologySelection, Session};
use crate::twin::OrganBurdenTable;

/// Full session export structure
#[derive(Debug, Clone, Serialize)]
pub struct SessionExport<'a> {
    pub exported_at: String,
    /// Export version for compatibility
    pub version: &'static str,
    pub participant: Option<&'a str>,
    pub exposure_summary: Option<ExposureSummary>,
    pub exposure: Option<&'a ExposureTotals>,
    pub burdens: Option<&'a OrganBurdenTable>,
    pub histology: Option<&'a HistologySelection>,
    pub comparison: Option<CountComparison>,
}

impl<'a> SessionExport<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            exported_at: Local::now().to_rfc3339(),
            version: "1.0.0",
            participant: session.participant.as_ref().map(|p| p.id()),
            exposure_summary: session.exposure_summary(),
            exposure: session.exposure.as_ref(),
            burdens: session.burdens.as_ref(),
            histology: session.histology.as_ref(),
            comparison: session.comparison,
        }
    }
}

/// Export a session to `exports/session_YYYYMMDD_HHMMSS.json`
pub fn export_session_json(session: &Session) -> Result<PathBuf> {
    let dir = PathBuf::from("exports");
    std::fs::create_dir_all(&dir)?;

    let filename = format!("session_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(&filename);
    export_session_json_to(session, &path)?;
    Ok(path)
}

/// Export a session to a specific file
pub fn export_session_json_to(session: &Session, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &SessionExport::new(session))?;

    log::info!("JSON session exported: {}", path.display());
    Ok(())
}
