mod common;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use tempfile::TempDir;

use cmip6_cite::domain::Coordinate;
use cmip6_cite::error::CiteError;
use cmip6_cite::record::Creator;
use cmip6_cite::store::{RecordSource, Store};
use cmip6_cite::transform::merge_creators;

use common::{FakeRegistry, fixture_path, miroc6};

fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, Store::new_with_root(root))
}

#[test]
fn save_uses_drs_file_name() {
    let (_dir, store) = temp_store();
    let record = miroc6();

    let path = store.save(&record, None).unwrap();

    assert_eq!(path, store.root().join("CMIP6.CMIP.MIROC.MIROC6.json"));
    let loaded = Store::load_file(&path).unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn save_writes_pretty_json() {
    let (_dir, store) = temp_store();
    let path = store.save(&miroc6(), None).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("{\n  "));
    assert!(content.ends_with("}\n"));
}

#[test]
fn save_overwrites_instead_of_merging() {
    let (_dir, store) = temp_store();
    let record = miroc6();
    store.save(&record, None).unwrap();

    let replaced = merge_creators(&record, vec![Creator::new("Tomoo", "Ogura", None, None)]);
    let path = store.save(&replaced, None).unwrap();

    let loaded = Store::load_file(&path).unwrap();
    assert_eq!(loaded.creators.len(), 1);
    assert_eq!(loaded.creators[0].creator_name(), "Ogura, Tomoo");
}

#[test]
fn save_to_explicit_destination() {
    let (_dir, store) = temp_store();
    let destination = store.root().join("nested/out.json");
    let path = store.save(&miroc6(), Some(&destination)).unwrap();
    assert_eq!(path, destination);
    assert!(destination.exists());
}

#[test]
fn cache_source_reads_store_file() {
    let (_dir, store) = temp_store();
    store.save(&miroc6(), None).unwrap();
    let coordinate: Coordinate = "CMIP6.CMIP.MIROC.MIROC6".parse().unwrap();

    let record = store
        .load(&RecordSource::Cache(coordinate), &FakeRegistry::default())
        .unwrap();

    assert_eq!(record.title().unwrap(), "MIROC6 simulations");
}

#[test]
fn missing_cache_file_is_a_filesystem_error() {
    let (_dir, store) = temp_store();
    let coordinate: Coordinate = "CMIP6.CMIP.MIROC.MIROC6".parse().unwrap();
    let err = store
        .load(&RecordSource::Cache(coordinate), &FakeRegistry::default())
        .unwrap_err();
    assert_matches!(err, CiteError::Filesystem(_));
}

#[test]
fn file_source_reports_parse_errors() {
    let (_dir, store) = temp_store();
    let path = store.root().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = store
        .load(&RecordSource::File(path), &FakeRegistry::default())
        .unwrap_err();

    assert_matches!(err, CiteError::RecordParse { source_name, .. } if source_name.ends_with("broken.json"));
}

#[test]
fn registry_source_fetches_by_key() {
    let (_dir, store) = temp_store();
    let registry = FakeRegistry::default().with_record(miroc6());
    let coordinate: Coordinate = "CMIP6.CMIP.MIROC.MIROC6".parse().unwrap();

    let record = store
        .load(&RecordSource::Registry(coordinate), &registry)
        .unwrap();

    assert_eq!(record.drs().unwrap(), "CMIP6.CMIP.MIROC.MIROC6");
}

#[test]
fn registry_miss_is_not_found() {
    let coordinate: Coordinate = "CMIP6.CMIP.MIROC.MIROC-ES2L".parse().unwrap();
    let err = Store::fetch_remote(&FakeRegistry::default(), &coordinate).unwrap_err();
    assert_matches!(err, CiteError::NotFound { drs, status: 404, .. } if drs == "CMIP6.CMIP.MIROC.MIROC-ES2L");
}

#[test]
fn registry_identity_mismatch_is_rejected() {
    let registry =
        FakeRegistry::default().with_record_at("CMIP6.CMIP.MIROC.MIROC-ES2L", miroc6());
    let coordinate: Coordinate = "CMIP6.CMIP.MIROC.MIROC-ES2L".parse().unwrap();
    let err = Store::fetch_remote(&registry, &coordinate).unwrap_err();
    assert_matches!(err, CiteError::MalformedRecord(_));
}

#[test]
fn fixture_loads_from_file() {
    let record = Store::load_file(&fixture_path("CMIP6.CMIP.MIROC.MIROC6.json")).unwrap();
    assert_eq!(record.creators.len(), 2);
    assert_eq!(record.references().count(), 0);
}
