use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CiteError;

pub const ERA: &str = "CMIP6";
pub const RECORD_FILE_SUFFIX: &str = ".json";

static DOI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.[0-9]+(\.[0-9]+)*/\S+$").expect("DOI pattern compiles"));

/// Coordinate values as the user supplied them; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinateFields {
    pub activity_id: Option<String>,
    pub institution_id: Option<String>,
    pub source_id: Option<String>,
    pub experiment_id: Option<String>,
}

impl CoordinateFields {
    pub fn new(
        activity_id: Option<&str>,
        institution_id: Option<&str>,
        source_id: Option<&str>,
        experiment_id: Option<&str>,
    ) -> Self {
        Self {
            activity_id: activity_id.map(str::to_string),
            institution_id: institution_id.map(str::to_string),
            source_id: source_id.map(str::to_string),
            experiment_id: experiment_id.map(str::to_string),
        }
    }

    pub fn resolve(&self) -> Result<Coordinate, CiteError> {
        let activity = mandatory(self.activity_id.as_deref(), "activity_id")?;
        let institution = mandatory(self.institution_id.as_deref(), "institution_id")?;
        let source = mandatory(self.source_id.as_deref(), "source_id")?;
        let coordinate = Coordinate::new(activity, institution, source)?;
        match present(self.experiment_id.as_deref()) {
            Some(experiment) => Ok(coordinate.with_experiment(&experiment.parse()?)),
            None => Ok(coordinate),
        }
    }

    pub fn resolve_experiment(&self) -> Result<Coordinate, CiteError> {
        mandatory(self.experiment_id.as_deref(), "experiment_id")?;
        self.resolve()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

fn mandatory<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, CiteError> {
    present(value).ok_or(CiteError::MissingCoordinate(field))
}

/// DRS key for the given fields, or `None` when a mandatory field is missing.
pub fn build_key(fields: &CoordinateFields) -> Option<String> {
    let activity = present(fields.activity_id.as_deref())?;
    let institution = present(fields.institution_id.as_deref())?;
    let source = present(fields.source_id.as_deref())?;
    Some(format_key(
        activity,
        institution,
        source,
        present(fields.experiment_id.as_deref()),
    ))
}

/// File name for the given fields, or `None` when a mandatory field is missing.
pub fn build_file_name(fields: &CoordinateFields) -> Option<String> {
    build_key(fields).map(|key| format!("{key}{RECORD_FILE_SUFFIX}"))
}

fn format_key(activity: &str, institution: &str, source: &str, experiment: Option<&str>) -> String {
    let mut key = [ERA, activity, institution, source].join(".");
    if let Some(experiment) = experiment {
        key.push('.');
        key.push_str(experiment);
    }
    key
}

fn is_valid_component(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

fn component(value: &str, field: &'static str) -> Result<String, CiteError> {
    if !is_valid_component(value) {
        return Err(CiteError::InvalidCoordinate {
            field,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    activity_id: String,
    institution_id: String,
    source_id: String,
    experiment_id: Option<ExperimentId>,
}

impl Coordinate {
    pub fn new(activity_id: &str, institution_id: &str, source_id: &str) -> Result<Self, CiteError> {
        Ok(Self {
            activity_id: component(activity_id, "activity_id")?,
            institution_id: component(institution_id, "institution_id")?,
            source_id: component(source_id, "source_id")?,
            experiment_id: None,
        })
    }

    pub fn with_experiment(&self, experiment: &ExperimentId) -> Self {
        Self {
            experiment_id: Some(experiment.clone()),
            ..self.clone()
        }
    }

    pub fn mip_level(&self) -> Self {
        Self {
            experiment_id: None,
            ..self.clone()
        }
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    pub fn institution_id(&self) -> &str {
        &self.institution_id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn experiment_id(&self) -> Option<&ExperimentId> {
        self.experiment_id.as_ref()
    }

    pub fn fields(&self) -> CoordinateFields {
        CoordinateFields::new(
            Some(&self.activity_id),
            Some(&self.institution_id),
            Some(&self.source_id),
            self.experiment_id.as_ref().map(ExperimentId::as_str),
        )
    }

    pub fn drs_key(&self) -> String {
        format_key(
            &self.activity_id,
            &self.institution_id,
            &self.source_id,
            self.experiment_id.as_ref().map(ExperimentId::as_str),
        )
    }

    pub fn file_name(&self) -> String {
        format!("{}{RECORD_FILE_SUFFIX}", self.drs_key())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.drs_key())
    }
}

impl FromStr for Coordinate {
    type Err = CiteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value.split('.').collect::<Vec<_>>();
        let invalid = || CiteError::InvalidDrs(value.to_string());
        if !(4..=5).contains(&parts.len()) || parts[0] != ERA {
            return Err(invalid());
        }
        let coordinate = Coordinate::new(parts[1], parts[2], parts[3]).map_err(|_| invalid())?;
        match parts.get(4) {
            Some(experiment) => {
                let experiment = experiment.parse::<ExperimentId>().map_err(|_| invalid())?;
                Ok(coordinate.with_experiment(&experiment))
            }
            None => Ok(coordinate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentId(String);

impl ExperimentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExperimentId {
    type Err = CiteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if !is_valid_component(value) {
            return Err(CiteError::InvalidExperimentId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Doi(String);

impl Doi {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Doi {
    type Err = CiteError;

    // No case folding: references are compared exactly as written.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if !DOI_PATTERN.is_match(value) {
            return Err(CiteError::InvalidDoi(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// Query flag that turns a write request into a dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CheckFlag {
    Test,
    #[default]
    Check,
    Tcheck,
}

impl CheckFlag {
    pub fn as_param(&self) -> &'static str {
        match self {
            CheckFlag::Test => "test",
            CheckFlag::Check => "check",
            CheckFlag::Tcheck => "tcheck",
        }
    }
}

impl fmt::Display for CheckFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_param())
    }
}
