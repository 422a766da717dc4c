use std::fmt;
use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::domain::Coordinate;
use crate::error::CiteError;
use crate::record::CitationRecord;
use crate::registry::RegistryClient;

/// Where a record is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// An explicit JSON file.
    File(Utf8PathBuf),
    /// The store file named after the coordinate.
    Cache(Coordinate),
    /// The registry read endpoint.
    Registry(Coordinate),
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::File(path) => write!(f, "file {path}"),
            RecordSource::Cache(coordinate) => write!(f, "cache {coordinate}"),
            RecordSource::Registry(coordinate) => write!(f, "registry {coordinate}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, CiteError> {
        let cwd = std::env::current_dir().map_err(|err| CiteError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| CiteError::Filesystem("invalid working directory path".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn record_path(&self, coordinate: &Coordinate) -> Utf8PathBuf {
        self.root.join(coordinate.file_name())
    }

    pub fn load<R: RegistryClient>(
        &self,
        source: &RecordSource,
        registry: &R,
    ) -> Result<CitationRecord, CiteError> {
        match source {
            RecordSource::File(path) => Self::load_file(path),
            RecordSource::Cache(coordinate) => Self::load_file(&self.record_path(coordinate)),
            RecordSource::Registry(coordinate) => Self::fetch_remote(registry, coordinate),
        }
    }

    pub fn load_file(path: &Utf8Path) -> Result<CitationRecord, CiteError> {
        info!(path = %path, "store.load");
        Self::read_json(path)
    }

    /// Reads the record for `coordinate` from the registry and checks that it
    /// carries the identity it was requested under.
    pub fn fetch_remote<R: RegistryClient>(
        registry: &R,
        coordinate: &Coordinate,
    ) -> Result<CitationRecord, CiteError> {
        let record = registry.fetch_record(coordinate)?;
        let expected = coordinate.drs_key();
        let actual = record.drs()?;
        if actual != expected {
            return Err(CiteError::MalformedRecord(format!(
                "requested {expected} but registry returned {actual}"
            )));
        }
        Ok(record)
    }

    /// Writes `record` to `destination`, or to the file named by its own DRS
    /// key under the store root. Any existing file is replaced.
    pub fn save(
        &self,
        record: &CitationRecord,
        destination: Option<&Utf8Path>,
    ) -> Result<Utf8PathBuf, CiteError> {
        let path = match destination {
            Some(path) => path.to_owned(),
            None => self.record_path(&record.coordinate()?),
        };
        Self::write_json(&path, record)?;
        info!(path = %path, drs = record.drs().unwrap_or("-"), "store.save");
        Ok(path)
    }

    pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, CiteError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| CiteError::Filesystem(format!("read {path}: {err}")))?;
        serde_json::from_str(&content).map_err(|err| CiteError::RecordParse {
            source_name: path.to_string(),
            message: err.to_string(),
        })
    }

    pub fn write_json<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), CiteError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
            _ => Utf8PathBuf::from("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| CiteError::Filesystem(err.to_string()))?;
        let mut content = serde_json::to_vec_pretty(value)
            .map_err(|err| CiteError::Filesystem(err.to_string()))?;
        content.push(b'\n');
        let mut temp = tempfile::Builder::new()
            .prefix(".cmip6-cite")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| CiteError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| CiteError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| CiteError::Filesystem(format!("write {path}: {}", err.error)))?;
        debug!(path = %path, bytes = content.len(), "store.write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_path_uses_drs_file_name() {
        let store = Store::new_with_root(Utf8PathBuf::from("/tmp/citations"));
        let coordinate: Coordinate = "CMIP6.HighResMIP.MIROC.NICAM16-7S.highresSST-present"
            .parse()
            .unwrap();
        assert_eq!(
            store.record_path(&coordinate),
            "/tmp/citations/CMIP6.HighResMIP.MIROC.NICAM16-7S.highresSST-present.json"
        );
    }
}
