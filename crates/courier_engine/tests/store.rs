use std::fs;
use std::sync::Arc;

use courier_core::{KnownRemoteFileSet, TransferHistory, TransferRecord};
use courier_engine::{
    AtomicFileWriter, FileStore, KeyValueStore, Settings, Storage, Values, API_TOKEN_KEY,
    DEFAULT_API_BASE_URL,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

fn values(pairs: &[(&str, Value)]) -> Values {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn file_store_merges_defaults_and_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("store.json");

    let store = FileStore::new(path.clone());
    store
        .set(values(&[("apiToken", json!("tok")), ("organizationId", json!("org"))]))
        .await
        .unwrap();
    store.remove(&["organizationId"]).await.unwrap();

    let reopened = FileStore::new(path);
    let got = reopened
        .get(values(&[("apiToken", Value::Null), ("organizationId", json!("fallback"))]))
        .await
        .unwrap();
    assert_eq!(got.get("apiToken"), Some(&json!("tok")));
    assert_eq!(got.get("organizationId"), Some(&json!("fallback")));

    reopened.clear().await.unwrap();
    let cleared = reopened.get(values(&[("apiToken", Value::Null)])).await.unwrap();
    assert_eq!(cleared.get("apiToken"), Some(&Value::Null));
}

#[tokio::test]
async fn storage_keeps_history_and_remote_set_under_well_known_keys() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");
    let storage = Storage::new(Arc::new(FileStore::new(path.clone())));

    let mut history = TransferHistory::new();
    history.upsert(TransferRecord {
        email_identity: "E1".to_string(),
        file_name: "a.pdf".to_string(),
        remote_file_id: Some("f1".to_string()),
        transferred_at: "2024-05-14T09:30:00.000Z".to_string(),
        subject: None,
    });
    storage.save_history(&history).await.unwrap();
    storage
        .save_remote_files(&KnownRemoteFileSet::synced(
            ["B.pdf"],
            &history,
            "2024-05-14T10:00:00.000Z".to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(storage.history().await.unwrap(), history);
    let remote = storage.remote_files().await.unwrap();
    assert!(remote.contains("a.pdf") && remote.contains("b.pdf"));
    assert_eq!(remote.last_sync(), Some("2024-05-14T10:00:00.000Z"));

    let raw: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["transferHistory"][0]["emailId"], json!("E1"));
    assert_eq!(raw["knownRemoteFiles"], json!(["a.pdf", "b.pdf"]));
    assert_eq!(raw["lastRemoteSync"], json!("2024-05-14T10:00:00.000Z"));
}

#[tokio::test]
async fn settings_need_token_and_organization() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp.path().join("store.json")));
    let storage = Storage::new(store.clone());

    storage
        .save_settings(&Settings {
            api_token: Some("tok".to_string()),
            ..Settings::default()
        })
        .await
        .unwrap();
    let settings = storage.settings().await.unwrap();
    assert!(!settings.is_configured());

    storage
        .save_settings(&Settings {
            organization_id: Some("org".to_string()),
            ..Settings::default()
        })
        .await
        .unwrap();
    let credentials = storage.settings().await.unwrap().credentials().expect("configured");
    assert_eq!(credentials.api_token, "tok");
    assert_eq!(credentials.base_url, DEFAULT_API_BASE_URL);

    let raw = store.get(values(&[(API_TOKEN_KEY, Value::Null)])).await.unwrap();
    assert_eq!(raw.get(API_TOKEN_KEY), Some(&json!("tok")));
}

#[tokio::test]
async fn malformed_history_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");
    fs::write(&path, r#"{"transferHistory": {"not": "a list"}}"#).unwrap();

    let storage = Storage::new(Arc::new(FileStore::new(path)));
    let err = storage.history().await.unwrap_err();
    assert!(err.to_string().contains("transferHistory"), "{err}");
}

#[test]
fn atomic_writer_replaces_content() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("store.json");
    let writer = AtomicFileWriter::new(target.clone());

    writer.write(b"{}").unwrap();
    writer.write(b"{\"a\":1}").unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "{\"a\":1}");
    let leftovers = fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}
