use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::credentials::CREDENTIAL_SERVICE;
use crate::domain::CheckFlag;
use crate::error::CiteError;
use crate::registry::RegistryEndpoints;

pub const DEFAULT_CONFIG_FILE: &str = "cmip6-cite.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub credentials: CredentialSection,
    #[serde(default)]
    pub check_flag: Option<CheckFlag>,
    #[serde(default)]
    pub store_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegistrySection {
    #[serde(default)]
    pub read_url: Option<String>,
    #[serde(default)]
    pub write_url: Option<String>,
    #[serde(default)]
    pub citations_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CredentialSection {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub netrc: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub endpoints: RegistryEndpoints,
    pub credential_service: String,
    pub netrc_path: Option<Utf8PathBuf>,
    pub check_flag: CheckFlag,
    pub store_dir: Option<Utf8PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads an explicit config path, or `cmip6-cite.json` when it exists.
    /// Without either, every setting takes its default.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CiteError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CiteError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CiteError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let defaults = RegistryEndpoints::default();
        let endpoints = RegistryEndpoints {
            read_url: config.registry.read_url.unwrap_or(defaults.read_url),
            write_url: config.registry.write_url.unwrap_or(defaults.write_url),
            citations_url: config
                .registry
                .citations_url
                .unwrap_or(defaults.citations_url),
        };

        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            endpoints,
            credential_service: config
                .credentials
                .service
                .filter(|service| !service.trim().is_empty())
                .unwrap_or_else(|| CREDENTIAL_SERVICE.to_string()),
            netrc_path: config.credentials.netrc.map(Utf8PathBuf::from),
            check_flag: config.check_flag.unwrap_or_default(),
            store_dir: config.store_dir.map(Utf8PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_takes_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default());
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.endpoints, RegistryEndpoints::default());
        assert_eq!(resolved.credential_service, "cera");
        assert_eq!(resolved.check_flag, CheckFlag::Check);
        assert!(resolved.netrc_path.is_none());
        assert!(resolved.store_dir.is_none());
    }
}
