//! CSV export for burden tables and cohort runs.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::twin::{Organ, OrganBurdenTable};

/// Write a burden table as `Organ,Microplastic_Count` rows
pub fn write_burden_csv<W: Write>(table: &OrganBurdenTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in table {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export a burden table to `exports/burdens_<participant>_YYYYMMDD_HHMMSS.csv`
pub fn export_burden_csv(table: &OrganBurdenTable, participant_id: &str) -> Result<PathBuf> {
    let dir = PathBuf::from("exports");
    std::fs::create_dir_all(&dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "burdens_{}_{}.csv",
        file_safe_id(participant_id),
        timestamp
    ));

    write_burden_csv(table, File::create(&path)?)?;

    log::info!("Burden table exported: {}", path.display());
    Ok(path)
}

/// Participant id reduced to `[A-Za-z0-9_-]` for use in a file name
fn file_safe_id(participant_id: &str) -> String {
    let safe: String = participant_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() {
        "unknown".to_string()
    } else {
        safe
    }
}

/// One participant's row in a cohort export
#[derive(Debug, Clone, Serialize)]
pub struct CohortRecord {
    pub participant: String,
    pub gut: f64,
    pub liver: f64,
    pub lung: f64,
    pub kidney: f64,
    pub brain: f64,
    pub total: f64,
}

impl CohortRecord {
    pub fn new(participant: &str, table: &OrganBurdenTable) -> Self {
        let burden = |organ| table.get(organ).unwrap_or(0.0);
        Self {
            participant: participant.to_string(),
            gut: burden(Organ::Gut),
            liver: burden(Organ::Liver),
            lung: burden(Organ::Lung),
            kidney: burden(Organ::Kidney),
            brain: burden(Organ::Brain),
            total: table.total(),
        }
    }
}

/// CSV exporter writing one row per simulated participant
pub struct CohortExporter {
    writer: csv::Writer<File>,
    rows: usize,
    path: PathBuf,
}

impl CohortExporter {
    /// Create a cohort export under `exports/` with a timestamped name
    pub fn new() -> Result<Self> {
        let dir = PathBuf::from("exports");
        std::fs::create_dir_all(&dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self::create(dir.join(format!("cohort_{}.csv", timestamp)))
    }

    /// Create a cohort export at a specific path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = csv::Writer::from_writer(File::create(&path)?);
        log::info!("Cohort export started: {}", path.display());
        Ok(Self {
            writer,
            rows: 0,
            path,
        })
    }

    pub fn record(&mut self, participant: &str, table: &OrganBurdenTable) -> Result<()> {
        self.writer.serialize(CohortRecord::new(participant, table))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Finish writing and return the output path
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        log::info!("Cohort export completed: {} rows in {}", self.rows, self.path.display());
        Ok(self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_safe_id() {
        assert_eq!(file_safe_id("P001"), "P001");
        assert_eq!(file_safe_id("site-a_07"), "site-a_07");
        assert_eq!(file_safe_id("../etc/passwd"), "___etc_passwd");
        assert_eq!(file_safe_id("a b\\c:d"), "a_b_c_d");
        assert_eq!(file_safe_id(""), "unknown");
    }
}
