use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::RECORD_FILE_SUFFIX;

/// Filters for the registry's citation listing. Every filter is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletenessQuery {
    pub institution_id: Option<String>,
    pub source_id: Option<String>,
    pub drs_id: Option<String>,
    pub complete: Option<bool>,
}

impl CompletenessQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(value) = &self.institution_id {
            params.push(("institutionId", value.clone()));
        }
        if let Some(value) = &self.source_id {
            params.push(("sourceId", value.clone()));
        }
        if let Some(value) = &self.drs_id {
            params.push(("drsId", value.clone()));
        }
        if let Some(value) = self.complete {
            params.push(("complete", value.to_string()));
        }
        params
    }

    pub fn describe(&self) -> String {
        let params = self.params();
        if params.is_empty() {
            return "all citations".to_string();
        }
        params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `YYYYMMDDCitation[.institution][.source].json`
    pub fn snapshot_file_name(&self, date: NaiveDate) -> String {
        let mut name = format!("{}Citation", date.format("%Y%m%d"));
        if let Some(institution) = &self.institution_id {
            name.push('.');
            name.push_str(institution);
        }
        if let Some(source) = &self.source_id {
            name.push('.');
            name.push_str(source);
        }
        name.push_str(RECORD_FILE_SUFFIX);
        name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationStatus {
    #[serde(rename = "DRS_ID")]
    pub drs_id: String,
    #[serde(rename = "CITATION_COMPLETED")]
    pub completed: Completion,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The registry reports completion either as a JSON boolean or as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Completion {
    Flag(bool),
    Text(String),
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        match self {
            Completion::Flag(value) => *value,
            Completion::Text(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "1"
            ),
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Flag(value) => write!(f, "{value}"),
            Completion::Text(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletenessSummary {
    pub total: usize,
    pub complete: usize,
    pub incomplete: Vec<String>,
}

pub fn summarize(entries: &[CitationStatus]) -> CompletenessSummary {
    let incomplete = entries
        .iter()
        .filter(|entry| !entry.completed.is_complete())
        .map(|entry| entry.drs_id.clone())
        .collect::<Vec<_>>();
    CompletenessSummary {
        total: entries.len(),
        complete: entries.len() - incomplete.len(),
        incomplete,
    }
}
