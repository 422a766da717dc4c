use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::completeness::{CitationStatus, CompletenessQuery};
use crate::credentials::Credentials;
use crate::domain::{CheckFlag, Coordinate};
use crate::error::CiteError;
use crate::record::CitationRecord;

pub const DEFAULT_READ_URL: &str = "https://cera-www.dkrz.de/WDCC/ui/cerasearch/cerarest/exportcmip6";
pub const DEFAULT_WRITE_URL: &str = "http://ceracite.dkrz.de:5000/api/v1/citation";
pub const DEFAULT_CITATIONS_URL: &str =
    "https://cera-www.dkrz.de/WDCC/ui/cerasearch/cerarest/cmip6Citations";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEndpoints {
    pub read_url: String,
    pub write_url: String,
    pub citations_url: String,
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self {
            read_url: DEFAULT_READ_URL.to_string(),
            write_url: DEFAULT_WRITE_URL.to_string(),
            citations_url: DEFAULT_CITATIONS_URL.to_string(),
        }
    }
}

impl RegistryEndpoints {
    pub fn write_url_for(&self, flag: Option<CheckFlag>) -> String {
        match flag {
            Some(flag) => format!("{}?{}=1", self.write_url, flag.as_param()),
            None => self.write_url.clone(),
        }
    }
}

/// Status and raw body of one write exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryResponse {
    pub endpoint: String,
    pub status: u16,
    pub body: String,
}

impl RegistryResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

pub trait RegistryClient: Send + Sync {
    fn write_endpoint(&self, flag: Option<CheckFlag>) -> String;

    fn fetch_record(&self, coordinate: &Coordinate) -> Result<CitationRecord, CiteError>;

    /// Posts `record`; `flag` selects a dry run. Only transport failures are
    /// errors, any HTTP status comes back as a response.
    fn post_record(
        &self,
        record: &CitationRecord,
        flag: Option<CheckFlag>,
        credentials: &Credentials,
    ) -> Result<RegistryResponse, CiteError>;

    fn list_citations(&self, query: &CompletenessQuery) -> Result<Vec<CitationStatus>, CiteError>;
}

impl<T: RegistryClient + ?Sized> RegistryClient for &T {
    fn write_endpoint(&self, flag: Option<CheckFlag>) -> String {
        (**self).write_endpoint(flag)
    }

    fn fetch_record(&self, coordinate: &Coordinate) -> Result<CitationRecord, CiteError> {
        (**self).fetch_record(coordinate)
    }

    fn post_record(
        &self,
        record: &CitationRecord,
        flag: Option<CheckFlag>,
        credentials: &Credentials,
    ) -> Result<RegistryResponse, CiteError> {
        (**self).post_record(record, flag, credentials)
    }

    fn list_citations(&self, query: &CompletenessQuery) -> Result<Vec<CitationStatus>, CiteError> {
        (**self).list_citations(query)
    }
}

#[derive(Clone)]
pub struct RegistryHttpClient {
    client: Client,
    endpoints: RegistryEndpoints,
}

impl RegistryHttpClient {
    pub fn new(endpoints: RegistryEndpoints) -> Result<Self, CiteError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cmip6-cite/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CiteError::HttpClient(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| CiteError::HttpClient(err.to_string()))?;
        Ok(Self { client, endpoints })
    }

    fn transport(endpoint: &str, err: reqwest::Error) -> CiteError {
        CiteError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

impl RegistryClient for RegistryHttpClient {
    fn write_endpoint(&self, flag: Option<CheckFlag>) -> String {
        self.endpoints.write_url_for(flag)
    }

    fn fetch_record(&self, coordinate: &Coordinate) -> Result<CitationRecord, CiteError> {
        let drs = coordinate.drs_key();
        let endpoint = &self.endpoints.read_url;
        info!(drs = %drs, endpoint = %endpoint, "registry.read");
        let response = self
            .client
            .get(endpoint)
            .query(&[("input", drs.as_str())])
            .send()
            .map_err(|err| Self::transport(endpoint, err))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| Self::transport(endpoint, err))?;
        debug!(status, bytes = body.len(), "registry.read.response");
        if status != 200 {
            return Err(CiteError::NotFound {
                drs,
                endpoint: endpoint.clone(),
                status,
                message: registry_error_message(&body),
            });
        }
        CitationRecord::from_json(&drs, &body)
    }

    fn post_record(
        &self,
        record: &CitationRecord,
        flag: Option<CheckFlag>,
        credentials: &Credentials,
    ) -> Result<RegistryResponse, CiteError> {
        let endpoint = self.write_endpoint(flag);
        let body = serde_json::to_vec(record)
            .map_err(|err| CiteError::MalformedRecord(err.to_string()))?;
        info!(endpoint = %endpoint, bytes = body.len(), "registry.write");
        let response = self
            .client
            .post(&endpoint)
            .basic_auth(credentials.login(), Some(credentials.password()))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|err| Self::transport(&endpoint, err))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| Self::transport(&endpoint, err))?;
        debug!(status, "registry.write.response");
        Ok(RegistryResponse {
            endpoint,
            status,
            body,
        })
    }

    fn list_citations(&self, query: &CompletenessQuery) -> Result<Vec<CitationStatus>, CiteError> {
        let endpoint = &self.endpoints.citations_url;
        let params = query.params();
        info!(endpoint = %endpoint, ?params, "registry.citations");
        let response = self
            .client
            .get(endpoint)
            .query(&params)
            .send()
            .map_err(|err| Self::transport(endpoint, err))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| Self::transport(endpoint, err))?;
        if status != 200 {
            return Err(CiteError::NotFound {
                drs: query.describe(),
                endpoint: endpoint.clone(),
                status,
                message: registry_error_message(&body),
            });
        }
        serde_json::from_str(&body).map_err(|err| CiteError::RecordParse {
            source_name: endpoint.clone(),
            message: err.to_string(),
        })
    }
}

/// Pulls the `error` field out of a registry failure body, falling back to
/// the raw text when the body is not the usual JSON object.
pub fn registry_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    match parsed.as_ref().and_then(|value| value.get("error")) {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().to_string(),
    }
}
