use serde::Serialize;

use crate::domain::ExperimentId;
use crate::error::CiteError;
use crate::record::{CitationRecord, Creator, RelatedIdentifier, RelatedIdentifierType};

/// Experiment-granularity copy of a MIP-granularity record.
///
/// Appends the experiment to the DRS subject and to the display title and
/// drops the registry identifier. `base` is left as it was.
pub fn derive_experiment(
    base: &CitationRecord,
    experiment: &ExperimentId,
) -> Result<CitationRecord, CiteError> {
    base.title()?;
    base.drs()?;

    let mut record = base.clone();
    record.subjects[0].subject.push('.');
    record.subjects[0].subject.push_str(experiment.as_str());
    record.titles[0].push(' ');
    record.titles[0].push_str(experiment.as_str());
    record.identifier = None;
    Ok(record)
}

/// Copy of `record` whose creator list is exactly `creators`.
pub fn merge_creators(record: &CitationRecord, creators: Vec<Creator>) -> CitationRecord {
    CitationRecord {
        creators,
        ..record.clone()
    }
}

/// Copy of `record` with one more `References` entry, or `None` when the
/// identifier is already referenced. Comparison is exact.
pub fn add_reference(
    record: &CitationRecord,
    identifier: &str,
    identifier_type: RelatedIdentifierType,
) -> Option<CitationRecord> {
    if record.references().any(|existing| existing == identifier) {
        return None;
    }
    let mut updated = record.clone();
    updated
        .related_identifiers
        .get_or_insert_with(Vec::new)
        .push(RelatedIdentifier::reference(identifier, identifier_type));
    Some(updated)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreatorDiff {
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub kept: Vec<String>,
}

impl CreatorDiff {
    pub fn is_unchanged(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

pub fn creator_diff(old: &[Creator], new: &[Creator]) -> CreatorDiff {
    let mut diff = CreatorDiff::default();
    for creator in old {
        let name = creator.creator_name().to_string();
        if new.iter().any(|c| c.creator_name() == name) {
            diff.kept.push(name);
        } else {
            diff.removed.push(name);
        }
    }
    for creator in new {
        if !old.iter().any(|c| c.creator_name() == creator.creator_name()) {
            diff.added.push(creator.creator_name().to_string());
        }
    }
    diff
}
