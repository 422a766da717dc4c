use assert_matches::assert_matches;
use tempfile::TempDir;

use cmip6_cite::config::ConfigLoader;
use cmip6_cite::domain::CheckFlag;
use cmip6_cite::error::CiteError;
use cmip6_cite::registry::DEFAULT_READ_URL;

#[test]
fn partial_config_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cmip6-cite.json");
    std::fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "registry": { "write_url": "http://localhost:5000/api/v1/citation" },
            "credentials": { "netrc": "/etc/cmip6/netrc" },
            "check_flag": "tcheck",
            "store_dir": "/data/citations"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();

    assert_eq!(resolved.endpoints.read_url, DEFAULT_READ_URL);
    assert_eq!(
        resolved.endpoints.write_url,
        "http://localhost:5000/api/v1/citation"
    );
    assert_eq!(resolved.credential_service, "cera");
    assert_eq!(resolved.netrc_path.as_deref().map(|p| p.as_str()), Some("/etc/cmip6/netrc"));
    assert_eq!(resolved.check_flag, CheckFlag::Tcheck);
    assert_eq!(resolved.store_dir.as_deref().map(|p| p.as_str()), Some("/data/citations"));
}

#[test]
fn explicit_missing_path_is_an_error() {
    let err = ConfigLoader::resolve(Some("/nonexistent/cmip6-cite.json")).unwrap_err();
    assert_matches!(err, CiteError::ConfigRead(_));
}

#[test]
fn invalid_json_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cmip6-cite.json");
    std::fs::write(&path, r#"{"check_flag": "sometimes"}"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, CiteError::ConfigParse(_));
}
