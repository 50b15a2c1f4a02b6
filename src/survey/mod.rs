//! Survey loading and participant selection.
//!
//! A survey is a CSV file with one header row and one row per participant.
//! Cells are kept as trimmed strings; interpretation belongs to the exposure
//! estimator.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::Rng;

use crate::config::SurveyParameters;
use crate::error::{PipelineError, Result};

/// One survey respondent
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Value of the participant index column, if the survey has one
    pub index: Option<String>,
    /// Column name → trimmed cell value
    pub fields: BTreeMap<String, String>,
}

impl Participant {
    /// Build a participant from literal column/value pairs
    pub fn from_pairs(index: Option<&str>, pairs: &[(&str, &str)]) -> Self {
        Self {
            index: index.map(str::to_string),
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.trim().to_string()))
                .collect(),
        }
    }

    /// Identifier for display (`unknown` when the survey has no index)
    pub fn id(&self) -> &str {
        self.index.as_deref().unwrap_or("unknown")
    }

    /// Cell value for a column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// Parsed survey table
#[derive(Debug, Clone)]
pub struct Survey {
    pub headers: Vec<String>,
    pub participants: Vec<Participant>,
}

impl Survey {
    /// Read a survey CSV from disk
    pub fn from_path<P: AsRef<Path>>(path: P, params: &SurveyParameters) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let survey = Self::from_reader(file, params)?;
        log::info!(
            "Loaded survey {}: {} participants, {} columns",
            path.display(),
            survey.len(),
            survey.headers.len()
        );
        Ok(survey)
    }

    /// Read a survey CSV from any reader
    pub fn from_reader<R: Read>(reader: R, params: &SurveyParameters) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut seen = BTreeSet::new();
        if let Some(dup) = headers.iter().find(|&h| !seen.insert(h.as_str())) {
            return Err(PipelineError::Survey(format!(
                "duplicate survey column '{}'",
                dup
            )));
        }
        if !headers.iter().any(|h| h == &params.index_column) {
            log::warn!(
                "Survey has no '{}' column; participants will be unnamed",
                params.index_column
            );
        }

        let mut participants = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let fields: BTreeMap<String, String> = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            let index = fields
                .get(&params.index_column)
                .filter(|v| !v.is_empty())
                .cloned();
            participants.push(Participant { index, fields });
        }

        if participants.is_empty() {
            return Err(PipelineError::Survey("survey has no participant rows".into()));
        }

        Ok(Self {
            headers,
            participants,
        })
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants whose index is in `allowed_ids` (everyone when empty)
    pub fn eligible<'a>(&'a self, allowed_ids: &'a [String]) -> impl Iterator<Item = &'a Participant> {
        self.participants.iter().filter(move |p| {
            allowed_ids.is_empty()
                || p.index
                    .as_ref()
                    .is_some_and(|id| allowed_ids.iter().any(|a| a == id))
        })
    }
}

/// Pick one eligible participant uniformly at random
pub fn select_random_participant<R: Rng + ?Sized>(
    survey: &Survey,
    rng: &mut R,
    allowed_ids: &[String],
) -> Result<Participant> {
    let eligible: Vec<&Participant> = survey.eligible(allowed_ids).collect();
    if eligible.is_empty() {
        return Err(PipelineError::NoEligibleParticipant);
    }

    let chosen = eligible[rng.gen_range(0..eligible.len())];
    log::info!(
        "Selected participant {} ({} eligible)",
        chosen.id(),
        eligible.len()
    );
    Ok(chosen.clone())
}
