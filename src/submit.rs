use serde::Serialize;
use tracing::{info, warn};

use crate::credentials::Credentials;
use crate::domain::CheckFlag;
use crate::error::CiteError;
use crate::record::CitationRecord;
use crate::registry::{RegistryClient, RegistryResponse, registry_error_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    CheckOnly,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Rejected,
    TransportError,
    /// The request could not be built, so nothing reached the registry.
    NotSent,
}

/// Result of one write exchange with the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub mode: SubmitMode,
    pub drs: String,
    pub endpoint: String,
    pub status: Option<u16>,
    pub body: String,
    pub error: Option<String>,
    pub kind: OutcomeKind,
}

impl SubmissionOutcome {
    fn from_response(mode: SubmitMode, drs: String, response: RegistryResponse) -> Self {
        let success = response.is_success();
        Self {
            mode,
            drs,
            error: (!success).then(|| registry_error_message(&response.body)),
            endpoint: response.endpoint,
            status: Some(response.status),
            body: response.body,
            kind: if success {
                OutcomeKind::Success
            } else {
                OutcomeKind::Rejected
            },
        }
    }

    fn unanswered(
        mode: SubmitMode,
        drs: String,
        endpoint: String,
        message: String,
        kind: OutcomeKind,
    ) -> Self {
        Self {
            mode,
            drs,
            endpoint,
            status: None,
            body: String::new(),
            error: Some(message),
            kind,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// One-line description, suitable for a terminal or a log.
    pub fn summary(&self) -> String {
        let action = match self.mode {
            SubmitMode::CheckOnly => "check",
            SubmitMode::Commit => "commit",
        };
        match self.kind {
            OutcomeKind::Success => format!("{action} ok: {} ({})", self.drs, self.endpoint),
            OutcomeKind::Rejected => format!(
                "{action} rejected: {} ({}, status {}): {}",
                self.drs,
                self.endpoint,
                self.status.unwrap_or_default(),
                self.error.as_deref().unwrap_or("no error payload")
            ),
            OutcomeKind::TransportError => format!(
                "{action} failed: {} ({}): {}",
                self.drs,
                self.endpoint,
                self.error.as_deref().unwrap_or("transport error")
            ),
            OutcomeKind::NotSent => format!(
                "{action} not sent: {} ({}): {}",
                self.drs,
                self.endpoint,
                self.error.as_deref().unwrap_or("request not built")
            ),
        }
    }

    pub fn into_error(self) -> Option<CiteError> {
        match self.kind {
            OutcomeKind::Success => None,
            OutcomeKind::Rejected => Some(CiteError::Rejected {
                drs: self.drs,
                endpoint: self.endpoint,
                status: self.status.unwrap_or_default(),
                message: self.error.unwrap_or_default(),
            }),
            OutcomeKind::TransportError => Some(CiteError::Transport {
                endpoint: self.endpoint,
                message: self.error.unwrap_or_default(),
            }),
            OutcomeKind::NotSent => Some(CiteError::MalformedRecord(format!(
                "{}: {}",
                self.drs,
                self.error.unwrap_or_default()
            ))),
        }
    }
}

/// Proof that `record` passed a check in this run. Only
/// [`SubmissionClient::check`] hands these out and only
/// [`SubmissionClient::commit`] takes them.
#[derive(Debug)]
pub struct CheckedRecord<'r> {
    record: &'r CitationRecord,
    check: SubmissionOutcome,
}

impl CheckedRecord<'_> {
    pub fn check(&self) -> &SubmissionOutcome {
        &self.check
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub drs: String,
    pub check: SubmissionOutcome,
    pub commit: Option<SubmissionOutcome>,
}

impl SubmissionReport {
    /// The check passed and, when a commit was sent, so did the commit.
    pub fn is_success(&self) -> bool {
        self.check.is_success() && self.commit.as_ref().is_none_or(SubmissionOutcome::is_success)
    }

    pub fn committed(&self) -> bool {
        self.commit.as_ref().is_some_and(SubmissionOutcome::is_success)
    }

    /// The outcome that stopped the sequence, if any.
    pub fn failure(&self) -> Option<&SubmissionOutcome> {
        if !self.check.is_success() {
            return Some(&self.check);
        }
        self.commit.as_ref().filter(|outcome| !outcome.is_success())
    }
}

pub struct SubmissionClient<R: RegistryClient> {
    registry: R,
    credentials: Credentials,
    check_flag: CheckFlag,
}

impl<R: RegistryClient> SubmissionClient<R> {
    pub fn new(registry: R, credentials: Credentials) -> Self {
        Self {
            registry,
            credentials,
            check_flag: CheckFlag::default(),
        }
    }

    pub fn with_check_flag(mut self, check_flag: CheckFlag) -> Self {
        self.check_flag = check_flag;
        self
    }

    /// One raw exchange. A `Commit` sent through here is not preceded by a
    /// check; orchestration goes through [`Self::check_then_commit`].
    pub fn submit(&self, record: &CitationRecord, mode: SubmitMode) -> SubmissionOutcome {
        let drs = record
            .drs()
            .map(str::to_string)
            .unwrap_or_else(|_| "<no subject>".to_string());
        let flag = match mode {
            SubmitMode::CheckOnly => Some(self.check_flag),
            SubmitMode::Commit => None,
        };
        let outcome = match self.registry.post_record(record, flag, &self.credentials) {
            Ok(response) => SubmissionOutcome::from_response(mode, drs, response),
            Err(CiteError::Transport { endpoint, message }) => SubmissionOutcome::unanswered(
                mode,
                drs,
                endpoint,
                message,
                OutcomeKind::TransportError,
            ),
            Err(other) => {
                let message = match other {
                    CiteError::MalformedRecord(message) => message,
                    other => other.to_string(),
                };
                SubmissionOutcome::unanswered(
                    mode,
                    drs,
                    self.registry.write_endpoint(flag),
                    message,
                    OutcomeKind::NotSent,
                )
            }
        };
        match outcome.kind {
            OutcomeKind::Success => info!(outcome = %outcome.summary(), "submission"),
            _ => warn!(outcome = %outcome.summary(), "submission"),
        }
        outcome
    }

    pub fn check<'r>(
        &self,
        record: &'r CitationRecord,
    ) -> Result<CheckedRecord<'r>, SubmissionOutcome> {
        let check = self.submit(record, SubmitMode::CheckOnly);
        if !check.is_success() {
            return Err(check);
        }
        Ok(CheckedRecord { record, check })
    }

    pub fn commit(&self, checked: &CheckedRecord<'_>) -> SubmissionOutcome {
        self.submit(checked.record, SubmitMode::Commit)
    }

    /// Checks `record` and commits it only when the check succeeded and
    /// `check_only` is false.
    pub fn check_then_commit(&self, record: &CitationRecord, check_only: bool) -> SubmissionReport {
        match self.check(record) {
            Err(check) => SubmissionReport {
                drs: check.drs.clone(),
                check,
                commit: None,
            },
            Ok(checked) => {
                let commit = (!check_only).then(|| self.commit(&checked));
                SubmissionReport {
                    drs: checked.check.drs.clone(),
                    check: checked.check,
                    commit,
                }
            }
        }
    }
}
