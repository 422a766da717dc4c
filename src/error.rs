use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CiteError {
    #[error("missing mandatory coordinate: {0}")]
    #[diagnostic(help("activity_id, institution_id and source_id are required"))]
    MissingCoordinate(&'static str),

    #[error("invalid {field}: {value:?}")]
    InvalidCoordinate { field: &'static str, value: String },

    #[error("invalid DRS key: {0}")]
    InvalidDrs(String),

    #[error("invalid experiment id: {0:?}")]
    InvalidExperimentId(String),

    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("malformed citation record: {0}")]
    MalformedRecord(String),

    #[error("failed to parse citation record {source_name}: {message}")]
    RecordParse {
        source_name: String,
        message: String,
    },

    #[error("{drs} not found at {endpoint} (status {status}): {message}")]
    NotFound {
        drs: String,
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("registry rejected {drs} at {endpoint} (status {status}): {message}")]
    Rejected {
        drs: String,
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("registry request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("no credentials for service {service:?} in {path}")]
    #[diagnostic(help("add a `machine {service} login <user> password <secret>` line"))]
    MissingCredentials { service: String, path: String },

    #[error("failed to read credential store {path}: {message}")]
    CredentialRead { path: String, message: String },

    #[error("no roster entry for mip={mip} experiment={}", .experiment.as_deref().unwrap_or("-"))]
    RosterNotFound {
        mip: String,
        experiment: Option<String>,
    },

    #[error("failed to parse roster {path}: {message}")]
    RosterParse { path: String, message: String },

    #[error("invalid creator entry: {0:?}")]
    InvalidCreator(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
