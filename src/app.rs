use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::completeness::{CitationStatus, CompletenessQuery, CompletenessSummary, summarize};
use crate::credentials::Credentials;
use crate::domain::{CheckFlag, Coordinate, Doi, ExperimentId};
use crate::error::CiteError;
use crate::record::{CitationRecord, RelatedIdentifierType};
use crate::registry::RegistryClient;
use crate::roster::RosterResolver;
use crate::store::{RecordSource, Store};
use crate::submit::{SubmissionClient, SubmissionReport};
use crate::transform::{self, CreatorDiff};

/// What to do with a transformed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Write it to this path, or to the operation's default file.
    Save(Option<Utf8PathBuf>),
    /// Check it with the registry and commit unless `check_only`.
    Submit { check_only: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedRecord {
    pub drs: String,
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeriveResult {
    pub base_drs: String,
    pub items: Vec<SavedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResult {
    pub base_drs: String,
    pub reports: Vec<SubmissionReport>,
}

impl SubmitResult {
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(SubmissionReport::is_success)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryResult {
    pub saved: Option<String>,
    pub submission: Option<SubmissionReport>,
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        self.submission
            .as_ref()
            .is_none_or(SubmissionReport::is_success)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatorsResult {
    pub drs: String,
    pub diff: CreatorDiff,
    pub creators: Vec<String>,
    pub delivery: DeliveryResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceResult {
    pub drs: String,
    pub reference: String,
    pub added: bool,
    pub delivery: Option<DeliveryResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletenessResult {
    pub query: String,
    pub entries: Vec<CitationStatus>,
    pub summary: CompletenessSummary,
    pub saved: Option<String>,
}

pub struct App<R: RegistryClient> {
    store: Store,
    registry: R,
    credentials: Option<Credentials>,
    check_flag: CheckFlag,
}

impl<R: RegistryClient> App<R> {
    pub fn new(store: Store, registry: R) -> Self {
        Self {
            store,
            registry,
            credentials: None,
            check_flag: CheckFlag::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_check_flag(mut self, check_flag: CheckFlag) -> Self {
        self.check_flag = check_flag;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn submitter(&self) -> Result<SubmissionClient<&R>, CiteError> {
        let credentials = self
            .credentials
            .clone()
            .ok_or_else(|| CiteError::MissingCredentials {
                service: crate::credentials::CREDENTIAL_SERVICE.to_string(),
                path: "<not resolved>".to_string(),
            })?;
        Ok(SubmissionClient::new(&self.registry, credentials).with_check_flag(self.check_flag))
    }

    pub fn load(&self, source: &RecordSource) -> Result<CitationRecord, CiteError> {
        self.store.load(source, &self.registry)
    }

    /// Loads a record and saves it under its own DRS file name, or under
    /// `destination`.
    pub fn snapshot(
        &self,
        source: &RecordSource,
        destination: Option<&Utf8Path>,
    ) -> Result<SavedRecord, CiteError> {
        let record = self.load(source)?;
        let path = self.store.save(&record, destination)?;
        saved(&record, path)
    }

    pub fn fetch(
        &self,
        coordinate: &Coordinate,
        destination: Option<&Utf8Path>,
    ) -> Result<SavedRecord, CiteError> {
        self.snapshot(&RecordSource::Registry(coordinate.clone()), destination)
    }

    pub fn derive_experiments(
        &self,
        source: &RecordSource,
        experiments: &[ExperimentId],
    ) -> Result<DeriveResult, CiteError> {
        let base = self.load_mip_base(source)?;
        let mut items = Vec::new();
        for experiment in experiments {
            let record = transform::derive_experiment(&base, experiment)?;
            let path = self.store.save(&record, None)?;
            items.push(saved(&record, path)?);
        }
        Ok(DeriveResult {
            base_drs: base.drs()?.to_string(),
            items,
        })
    }

    pub fn submit_experiments(
        &self,
        source: &RecordSource,
        experiments: &[ExperimentId],
        check_only: bool,
    ) -> Result<SubmitResult, CiteError> {
        let base = self.load_mip_base(source)?;
        let submitter = self.submitter()?;
        let mut reports = Vec::new();
        for experiment in experiments {
            let record = transform::derive_experiment(&base, experiment)?;
            info!(drs = record.drs()?, check_only, "submit.experiment");
            reports.push(submitter.check_then_commit(&record, check_only));
        }
        Ok(SubmitResult {
            base_drs: base.drs()?.to_string(),
            reports,
        })
    }

    /// Replaces the creators of the record in `path` with the roster entry
    /// matching the record's own MIP and experiment.
    pub fn modify_creators(
        &self,
        path: &Utf8Path,
        roster: &dyn RosterResolver,
        delivery: Delivery,
    ) -> Result<CreatorsResult, CiteError> {
        let record = Store::load_file(path)?;
        let coordinate = record.coordinate()?;
        let creators = roster.creators_for(
            coordinate.activity_id(),
            coordinate.experiment_id().map(ExperimentId::as_str),
        )?;
        let diff = transform::creator_diff(&record.creators, &creators);
        if diff.is_unchanged() {
            info!(drs = %coordinate, "creators.unchanged");
        } else {
            info!(
                drs = %coordinate,
                removed = diff.removed.len(),
                added = diff.added.len(),
                "creators.replaced"
            );
        }
        let merged = transform::merge_creators(&record, creators);
        let delivery = match delivery {
            Delivery::Save(None) => Delivery::Save(Some(path.to_owned())),
            other => other,
        };
        let delivery = self.deliver(&merged, delivery)?;
        Ok(CreatorsResult {
            drs: coordinate.drs_key(),
            creators: merged
                .creators
                .iter()
                .map(|creator| creator.creator_name().to_string())
                .collect(),
            diff,
            delivery,
        })
    }

    pub fn add_reference(
        &self,
        source: &RecordSource,
        doi: &Doi,
        delivery: Delivery,
    ) -> Result<ReferenceResult, CiteError> {
        let record = self.load(source)?;
        let drs = record.drs()?.to_string();
        let Some(updated) =
            transform::add_reference(&record, doi.as_str(), RelatedIdentifierType::Doi)
        else {
            info!(drs = %drs, reference = %doi, "reference.present");
            return Ok(ReferenceResult {
                drs,
                reference: doi.to_string(),
                added: false,
                delivery: None,
            });
        };
        info!(drs = %drs, reference = %doi, "reference.added");
        let delivery = self.deliver(&updated, delivery)?;
        Ok(ReferenceResult {
            drs,
            reference: doi.to_string(),
            added: true,
            delivery: Some(delivery),
        })
    }

    pub fn post(&self, path: &Utf8Path, check_only: bool) -> Result<SubmissionReport, CiteError> {
        let record = Store::load_file(path)?;
        record.coordinate()?;
        Ok(self.submitter()?.check_then_commit(&record, check_only))
    }

    pub fn completeness(
        &self,
        query: &CompletenessQuery,
        load: Option<&Utf8Path>,
        save: Option<&Utf8Path>,
        dated_snapshot: bool,
    ) -> Result<CompletenessResult, CiteError> {
        let entries: Vec<CitationStatus> = match load {
            Some(path) => {
                info!(path = %path, "completeness.load");
                Store::read_json(path)?
            }
            None => self.registry.list_citations(query)?,
        };
        let target = match (save, dated_snapshot) {
            (Some(path), _) => Some(path.to_owned()),
            (None, true) => Some(self.store.root().join(
                query.snapshot_file_name(chrono::Local::now().date_naive()),
            )),
            (None, false) => None,
        };
        if let Some(path) = &target {
            Store::write_json(path, &entries)?;
            info!(path = %path, entries = entries.len(), "completeness.saved");
        }
        let summary = summarize(&entries);
        if !summary.incomplete.is_empty() {
            warn!(incomplete = summary.incomplete.len(), "completeness.incomplete");
        }
        Ok(CompletenessResult {
            query: query.describe(),
            summary,
            entries,
            saved: target.map(|path| path.to_string()),
        })
    }

    fn load_mip_base(&self, source: &RecordSource) -> Result<CitationRecord, CiteError> {
        let base = self.load(source)?;
        let coordinate = base.coordinate()?;
        if coordinate.experiment_id().is_some() {
            return Err(CiteError::MalformedRecord(format!(
                "{coordinate} is already experiment-level"
            )));
        }
        info!(drs = %coordinate, title = base.title()?, "base.loaded");
        Ok(base)
    }

    fn deliver(
        &self,
        record: &CitationRecord,
        delivery: Delivery,
    ) -> Result<DeliveryResult, CiteError> {
        match delivery {
            Delivery::Save(destination) => {
                let path = self.store.save(record, destination.as_deref())?;
                Ok(DeliveryResult {
                    saved: Some(path.to_string()),
                    submission: None,
                })
            }
            Delivery::Submit { check_only } => Ok(DeliveryResult {
                saved: None,
                submission: Some(self.submitter()?.check_then_commit(record, check_only)),
            }),
        }
    }
}

fn saved(record: &CitationRecord, path: Utf8PathBuf) -> Result<SavedRecord, CiteError> {
    Ok(SavedRecord {
        drs: record.drs()?.to_string(),
        title: record.title()?.to_string(),
        path: path.to_string(),
    })
}
