#![allow(dead_code)]

use std::sync::Mutex;

use camino::Utf8PathBuf;

use cmip6_cite::completeness::{CitationStatus, CompletenessQuery};
use cmip6_cite::credentials::Credentials;
use cmip6_cite::domain::{CheckFlag, Coordinate};
use cmip6_cite::error::CiteError;
use cmip6_cite::record::CitationRecord;
use cmip6_cite::registry::{RegistryClient, RegistryResponse};

pub const WRITE_URL: &str = "http://registry.test/api/v1/citation";

pub fn fixture_path(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn miroc6() -> CitationRecord {
    let content = std::fs::read_to_string(fixture_path("CMIP6.CMIP.MIROC.MIROC6.json")).unwrap();
    CitationRecord::from_json("fixture", &content).unwrap()
}

pub fn credentials() -> Credentials {
    Credentials::new("inoue", "s3cret")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCall {
    pub flag: Option<CheckFlag>,
    pub drs: String,
    pub login: String,
}

/// In-memory registry. Write calls are recorded; the status returned for
/// check and commit requests is configurable.
pub struct FakeRegistry {
    records: Vec<(String, CitationRecord)>,
    citations: Vec<CitationStatus>,
    check_status: u16,
    commit_status: u16,
    unreachable: bool,
    calls: Mutex<Vec<PostCall>>,
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            citations: Vec::new(),
            check_status: 200,
            commit_status: 200,
            unreachable: false,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRegistry {
    pub fn with_record(mut self, record: CitationRecord) -> Self {
        let drs = record.drs().unwrap().to_string();
        self.records.push((drs, record));
        self
    }

    /// Serves `record` when `drs` is requested, whatever its own subject says.
    pub fn with_record_at(mut self, drs: &str, record: CitationRecord) -> Self {
        self.records.push((drs.to_string(), record));
        self
    }

    pub fn with_citations(mut self, citations: Vec<CitationStatus>) -> Self {
        self.citations = citations;
        self
    }

    pub fn check_status(mut self, status: u16) -> Self {
        self.check_status = status;
        self
    }

    pub fn commit_status(mut self, status: u16) -> Self {
        self.commit_status = status;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<PostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn check_calls(&self) -> usize {
        self.calls().iter().filter(|call| call.flag.is_some()).count()
    }

    pub fn commit_calls(&self) -> usize {
        self.calls().iter().filter(|call| call.flag.is_none()).count()
    }
}

impl RegistryClient for FakeRegistry {
    fn write_endpoint(&self, flag: Option<CheckFlag>) -> String {
        match flag {
            Some(flag) => format!("{WRITE_URL}?{}=1", flag.as_param()),
            None => WRITE_URL.to_string(),
        }
    }

    fn fetch_record(&self, coordinate: &Coordinate) -> Result<CitationRecord, CiteError> {
        let drs = coordinate.drs_key();
        self.records
            .iter()
            .find(|(key, _)| *key == drs)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| CiteError::NotFound {
                drs,
                endpoint: "http://registry.test/exportcmip6".to_string(),
                status: 404,
                message: "DRS_ID not found".to_string(),
            })
    }

    fn post_record(
        &self,
        record: &CitationRecord,
        flag: Option<CheckFlag>,
        credentials: &Credentials,
    ) -> Result<RegistryResponse, CiteError> {
        self.calls.lock().unwrap().push(PostCall {
            flag,
            drs: record.drs()?.to_string(),
            login: credentials.login().to_string(),
        });
        let endpoint = self.write_endpoint(flag);
        if self.unreachable {
            return Err(CiteError::Transport {
                endpoint,
                message: "connection refused".to_string(),
            });
        }
        let status = match flag {
            Some(_) => self.check_status,
            None => self.commit_status,
        };
        let body = if status == 200 {
            r#"{"status": "ok"}"#.to_string()
        } else {
            r#"{"error": "creators: missing affiliation"}"#.to_string()
        };
        Ok(RegistryResponse {
            endpoint,
            status,
            body,
        })
    }

    fn list_citations(&self, _query: &CompletenessQuery) -> Result<Vec<CitationStatus>, CiteError> {
        Ok(self.citations.clone())
    }
}
