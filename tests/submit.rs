mod common;

use assert_matches::assert_matches;

use cmip6_cite::domain::CheckFlag;
use cmip6_cite::error::CiteError;
use cmip6_cite::submit::{OutcomeKind, SubmissionClient, SubmitMode};

use common::{FakeRegistry, credentials, miroc6};

#[test]
fn rejected_check_never_commits() {
    let registry = FakeRegistry::default().check_status(400);
    let client = SubmissionClient::new(&registry, credentials());
    let record = miroc6();

    let report = client.check_then_commit(&record, false);

    assert!(!report.is_success());
    assert_eq!(report.check.kind, OutcomeKind::Rejected);
    assert_eq!(report.check.status, Some(400));
    assert_eq!(
        report.check.error.as_deref(),
        Some("creators: missing affiliation")
    );
    assert!(report.commit.is_none());
    assert_eq!(registry.check_calls(), 1);
    assert_eq!(registry.commit_calls(), 0);
}

#[test]
fn passed_check_commits_once() {
    let registry = FakeRegistry::default();
    let client = SubmissionClient::new(&registry, credentials());
    let record = miroc6();

    let report = client.check_then_commit(&record, false);

    assert!(report.is_success());
    assert!(report.committed());
    assert_eq!(report.drs, "CMIP6.CMIP.MIROC.MIROC6");
    let calls = registry.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].flag, Some(CheckFlag::Check));
    assert_eq!(calls[1].flag, None);
    assert!(calls.iter().all(|call| call.login == "inoue"));
}

#[test]
fn check_only_sends_no_commit() {
    let registry = FakeRegistry::default();
    let client = SubmissionClient::new(&registry, credentials()).with_check_flag(CheckFlag::Tcheck);
    let record = miroc6();

    let report = client.check_then_commit(&record, true);

    assert!(report.is_success());
    assert!(!report.committed());
    assert_eq!(report.check.mode, SubmitMode::CheckOnly);
    assert_eq!(
        report.check.endpoint,
        "http://registry.test/api/v1/citation?tcheck=1"
    );
    assert_eq!(registry.commit_calls(), 0);
}

#[test]
fn transport_failure_is_an_outcome() {
    let registry = FakeRegistry::default().unreachable();
    let client = SubmissionClient::new(&registry, credentials());
    let record = miroc6();

    let report = client.check_then_commit(&record, false);

    let failure = report.failure().unwrap();
    assert_eq!(failure.kind, OutcomeKind::TransportError);
    assert_eq!(failure.status, None);
    assert_eq!(registry.commit_calls(), 0);
    assert_matches!(
        failure.clone().into_error(),
        Some(CiteError::Transport { message, .. }) if message == "connection refused"
    );
}

#[test]
fn rejected_commit_is_reported_with_mode() {
    let registry = FakeRegistry::default().commit_status(500);
    let client = SubmissionClient::new(&registry, credentials());
    let record = miroc6();

    let report = client.check_then_commit(&record, false);

    assert!(report.check.is_success());
    let failure = report.failure().unwrap();
    assert_eq!(failure.mode, SubmitMode::Commit);
    assert_eq!(failure.kind, OutcomeKind::Rejected);
    assert!(failure.summary().starts_with("commit rejected"));
}

#[test]
fn commit_takes_a_checked_record() {
    let registry = FakeRegistry::default();
    let client = SubmissionClient::new(&registry, credentials());
    let record = miroc6();

    let checked = client.check(&record).unwrap();
    assert!(checked.check().is_success());
    let outcome = client.commit(&checked);

    assert!(outcome.is_success());
    assert_eq!(registry.check_calls(), 1);
    assert_eq!(registry.commit_calls(), 1);
}

#[test]
fn record_without_subject_is_not_sent() {
    let registry = FakeRegistry::default();
    let client = SubmissionClient::new(&registry, credentials());
    let mut record = miroc6();
    record.subjects.clear();

    let report = client.check_then_commit(&record, false);

    assert!(!report.is_success());
    assert!(report.commit.is_none());
    assert_eq!(report.check.kind, OutcomeKind::NotSent);
    assert_eq!(report.check.status, None);
    assert!(report.check.summary().starts_with("check not sent"));
    assert_eq!(registry.calls().len(), 0);
    assert_matches!(
        report.check.clone().into_error(),
        Some(CiteError::MalformedRecord(message)) if message.ends_with("record has no subjects")
    );
}
