//! Filesystem integration tests for the curve store.

use openpedal_curve_store::{CurveCache, CurveStore};
use openpedal_curves::{CalibrationCurve, ControlPoint, CurveKind, Deadzone, PedalAxis, RawDomain};
use tempfile::TempDir;

fn brake_curve() -> CalibrationCurve {
    CalibrationCurve::new(
        CurveKind::Piecewise,
        vec![
            ControlPoint::new(120.0, 0.0),
            ControlPoint::new(500.0, 0.4),
            ControlPoint::new(880.0, 1.0),
        ],
        Deadzone::from_rest(120.0, 30.0),
        false,
    )
    .expect("valid curve")
}

fn populated_cache() -> CurveCache {
    let mut cache = CurveCache::new();
    cache.insert("044f:b687:SN01", PedalAxis::Throttle, brake_curve());
    cache.insert("044f:b687:SN01", PedalAxis::Brake, brake_curve());
    cache.insert(
        "0eb7:183b:SN77",
        PedalAxis::Handbrake,
        CalibrationCurve::identity(RawDomain::FULL_16BIT),
    );
    cache
}

#[tokio::test]
async fn load_of_save_is_identity() {
    let dir = TempDir::new().expect("temp dir");
    let store = CurveStore::new(dir.path().join("curves.json"));

    let cache = populated_cache();
    store.save(&cache).await.expect("save succeeds");

    let loaded = store.load().await.expect("load succeeds");
    assert!(loaded.skipped.is_empty());
    assert_eq!(loaded.cache, cache);
}

#[tokio::test]
async fn missing_file_loads_empty() {
    let dir = TempDir::new().expect("temp dir");
    let store = CurveStore::new(dir.path().join("never-written.json"));

    let loaded = store.load().await.expect("load succeeds");
    assert!(loaded.cache.is_empty());
    assert!(loaded.skipped.is_empty());
}

#[tokio::test]
async fn save_creates_parent_directories() {
    let dir = TempDir::new().expect("temp dir");
    let store = CurveStore::new(dir.path().join("nested/deeper/curves.json"));

    store.save(&populated_cache()).await.expect("save succeeds");
    assert!(store.path().exists());
}

#[tokio::test]
async fn save_leaves_no_temp_file_behind() {
    let dir = TempDir::new().expect("temp dir");
    let store = CurveStore::new(dir.path().join("curves.json"));

    store.save(&populated_cache()).await.expect("save succeeds");
    store.save(&populated_cache()).await.expect("resave succeeds");

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn corrupt_entry_survives_round_trip_of_the_rest() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("curves.json");
    let store = CurveStore::new(&path);

    store.save(&populated_cache()).await.expect("save succeeds");

    // Corrupt the clutch entry by hand: valid JSON, missing points.
    let text = std::fs::read_to_string(&path).expect("read cache");
    let mut doc: serde_json::Value = serde_json::from_str(&text).expect("parse cache");
    doc["044f:b687:SN01"]["clutch"] =
        serde_json::json!({ "kind": "linear", "invert": false });
    std::fs::write(&path, doc.to_string()).expect("write corrupted cache");

    let loaded = store.load().await.expect("load succeeds");
    assert_eq!(loaded.skipped.len(), 1);
    assert!(loaded.cache.get("044f:b687:SN01", PedalAxis::Clutch).is_none());
    assert!(loaded.cache.get("044f:b687:SN01", PedalAxis::Throttle).is_some());
    assert!(loaded.cache.get("044f:b687:SN01", PedalAxis::Brake).is_some());
    assert!(loaded.cache.get("0eb7:183b:SN77", PedalAxis::Handbrake).is_some());
}

#[tokio::test]
async fn truncated_file_loads_as_empty_with_fault() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("curves.json");
    std::fs::write(&path, "{ \"044f:b687:SN01\": { \"thro").expect("write truncated");

    let store = CurveStore::new(&path);
    let loaded = store.load().await.expect("load succeeds despite corruption");
    assert!(loaded.cache.is_empty());
    assert_eq!(loaded.skipped.len(), 1);
}

#[tokio::test]
async fn backup_copies_current_file() {
    let dir = TempDir::new().expect("temp dir");
    let store = CurveStore::new(dir.path().join("curves.json"));

    assert!(store.backup().await.expect("backup succeeds").is_none());

    store.save(&populated_cache()).await.expect("save succeeds");
    let backup = store
        .backup()
        .await
        .expect("backup succeeds")
        .expect("backup path returned");
    assert!(backup.exists());
}
