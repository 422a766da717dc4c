use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CiteError;
use crate::record::Creator;

pub trait RosterResolver {
    /// Creators for a MIP (`experiment == None`) or for one experiment of it.
    fn creators_for(&self, mip: &str, experiment: Option<&str>) -> Result<Vec<Creator>, CiteError>;
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RosterFile {
    #[serde(default)]
    pub mip: Vec<RosterEntry>,
    #[serde(default)]
    pub experiment: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RosterEntry {
    pub mip: String,
    #[serde(default)]
    pub experiment: Option<String>,
    #[serde(default)]
    pub creators: Vec<CreatorEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CreatorEntry {
    /// `"Given Family, email, affiliation"`
    Shorthand(String),
    Detailed(CreatorEntryObject),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorEntryObject {
    pub given_name: String,
    pub family_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
}

impl CreatorEntry {
    pub fn to_creator(&self) -> Result<Creator, CiteError> {
        match self {
            CreatorEntry::Shorthand(line) => parse_creator_line(line),
            CreatorEntry::Detailed(obj) => Ok(Creator::new(
                obj.given_name.trim(),
                obj.family_name.trim(),
                obj.email.as_deref(),
                obj.affiliation.as_deref(),
            )),
        }
    }
}

/// Parses `"Full Name, email, affiliation"`; the affiliation may itself
/// contain commas.
pub fn parse_creator_line(line: &str) -> Result<Creator, CiteError> {
    let mut parts = line.splitn(3, ',').map(str::trim);
    let (Some(full_name), Some(email), Some(affiliation)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(CiteError::InvalidCreator(line.to_string()));
    };
    Creator::from_full_name(full_name, non_empty(email), non_empty(affiliation))
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[derive(Debug, Clone)]
pub struct JsonRoster {
    path: Utf8PathBuf,
    roster: RosterFile,
}

impl JsonRoster {
    pub fn load(path: &Utf8Path) -> Result<Self, CiteError> {
        let content =
            fs::read_to_string(path.as_std_path()).map_err(|err| CiteError::RosterParse {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        let roster = serde_json::from_str(&content).map_err(|err| CiteError::RosterParse {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self::from_roster(path.to_owned(), roster))
    }

    pub fn from_roster(path: Utf8PathBuf, roster: RosterFile) -> Self {
        Self { path, roster }
    }
}

impl RosterResolver for JsonRoster {
    fn creators_for(&self, mip: &str, experiment: Option<&str>) -> Result<Vec<Creator>, CiteError> {
        let table = match experiment {
            Some(_) => &self.roster.experiment,
            None => &self.roster.mip,
        };
        debug!(path = %self.path, mip, ?experiment, "roster.lookup");
        let entry = table
            .iter()
            .find(|entry| entry.mip == mip && entry.experiment.as_deref() == experiment)
            .ok_or_else(|| CiteError::RosterNotFound {
                mip: mip.to_string(),
                experiment: experiment.map(str::to_string),
            })?;
        entry.creators.iter().map(CreatorEntry::to_creator).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_line_keeps_commas_in_affiliation() {
        let creator =
            parse_creator_line("Tomoo Ogura, ogura@nies.go.jp, NIES, Tsukuba, Japan").unwrap();
        assert_eq!(creator.creator_name(), "Ogura, Tomoo");
        assert_eq!(creator.email(), Some("ogura@nies.go.jp"));
        assert_eq!(
            creator.affiliation().and_then(|value| value.as_str()),
            Some("NIES, Tsukuba, Japan")
        );
    }

    #[test]
    fn creator_line_needs_three_fields() {
        assert!(parse_creator_line("Tomoo Ogura, ogura@nies.go.jp").is_err());
    }
}
