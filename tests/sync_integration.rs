//! Integration tests for export/import through the sync engine.

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use cookiesync_core::backend::{LocalConfig, RemoteDocumentConfig};
use cookiesync_core::cookie::SameSite;
use cookiesync_core::crypto::{self, EncryptedBlob};
use cookiesync_core::sync::{ExportStage, ImportStage};
use cookiesync_core::{
    ActivityLog, BackendConfig, CookieRecord, DEFAULT_FILENAME, ErrorKind, ImportSource,
    MemoryCookieStore, MemorySettingsStore, Selection, Settings, SettingsStore, Snapshot,
    SnapshotCache, SyncEngine, codec,
};
use support::socket_guard::start_mock_server_or_skip;
use support::{RejectingStore, encoded_snapshot, harness, other_environment};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PASSWORD: &str = "correct horse";

fn remote_config(server: &MockServer, document_id: Option<&str>) -> BackendConfig {
    let mut config = RemoteDocumentConfig::new("t0ken").with_api_url(server.uri());
    config.set_document_id(document_id.map(str::to_string));
    BackendConfig::RemoteDocument(config)
}

fn document_json(id: &str, content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "files": { DEFAULT_FILENAME: { "content": content, "truncated": false } }
    })
}

fn stored_document_id(settings: &MemorySettingsStore) -> Option<String> {
    match settings.load().unwrap()?.backend? {
        BackendConfig::RemoteDocument(remote) => remote.document_id,
        BackendConfig::Local(_) => None,
    }
}

fn sid_cookie() -> CookieRecord {
    let mut cookie = CookieRecord::new("sid", "abc", ".example.com", "/");
    cookie.secure = true;
    cookie.http_only = true;
    cookie
}

#[tokio::test]
async fn test_strict_session_cookie_survives_full_pipeline() {
    let mut cookie = CookieRecord::new("sid", "abc", "example.com", "/");
    cookie.secure = true;
    cookie.http_only = true;
    cookie.same_site = Some(SameSite::Strict);
    let snapshot = Snapshot {
        cookies: vec![cookie.clone()],
        timestamp: 1_700_000_000_000,
        count: 1,
        browser_id: "exporting-browser".to_string(),
    };

    let json = codec::serialize(&snapshot).unwrap();
    let blob = crypto::encrypt(json.as_bytes(), "correct-horse").unwrap();
    let encoded = codec::encode_blob(blob.as_bytes());

    let decoded = EncryptedBlob::from_bytes(codec::decode_blob(&encoded).unwrap()).unwrap();
    let plaintext = crypto::decrypt(&decoded, "correct-horse").unwrap();
    assert_eq!(codec::deserialize_bytes(&plaintext).unwrap(), snapshot);

    let importer = harness(Vec::new(), None);
    let pending = importer
        .engine
        .fetch_import(
            ImportSource::Blob {
                source_name: "download".to_string(),
                content: encoded,
            },
            "correct-horse",
        )
        .await
        .unwrap();
    assert_eq!(pending.snapshot, snapshot);
    assert_eq!(pending.summary.total, 1);

    let report = importer.engine.apply(pending, &Selection::All).await.unwrap();
    assert_eq!(report.apply.success_count, 1);
    assert_eq!(report.apply.fail_count, 0);
    assert_eq!(importer.cookies.records(), vec![cookie]);
}

#[tokio::test]
async fn test_remote_export_then_import_restores_cookie() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gists"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "doc1" })))
        .expect(1)
        .mount(&server)
        .await;

    let exporter = harness(vec![sid_cookie()], Some(remote_config(&server, None)));
    let report = exporter.engine.export(&Selection::All, PASSWORD).await.unwrap();
    assert_eq!(report.count, 1);
    assert_eq!(report.backend, "remote_document");
    assert_eq!(report.trace.current(), ExportStage::Done);
    assert_eq!(stored_document_id(&exporter.settings).as_deref(), Some("doc1"));

    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|request| request.method.as_str() == "POST")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&create.body).unwrap();
    assert_eq!(body["public"], false);
    let content = body["files"][DEFAULT_FILENAME]["content"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!content.contains("abc"));

    Mock::given(method("GET"))
        .and(path("/gists/doc1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_json("doc1", &content)))
        .mount(&server)
        .await;

    let importer = harness(Vec::new(), Some(remote_config(&server, Some("doc1"))));
    let engine = importer.engine.with_environment(&other_environment());
    let pending = engine
        .fetch_import(ImportSource::Backend, PASSWORD)
        .await
        .unwrap();
    assert_eq!(pending.summary.total, 1);
    assert!(!pending.summary.self_import);
    assert_eq!(
        pending.summary.browser_id_preview,
        &exporter.engine.browser_id()[..16]
    );

    let report = engine.apply(pending, &Selection::All).await.unwrap();
    assert_eq!(report.apply.success_count, 1);
    assert_eq!(report.trace.current(), ImportStage::Done);

    let restored = importer.cookies.records();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].name, "sid");
    assert_eq!(restored[0].value(), "abc");
    assert!(restored[0].secure);
}

#[tokio::test]
async fn test_remote_import_with_wrong_password_applies_nothing() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let content = encoded_snapshot(vec![sid_cookie()], "someone-else", PASSWORD);
    Mock::given(method("GET"))
        .and(path("/gists/doc1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_json("doc1", &content)))
        .mount(&server)
        .await;

    let importer = harness(Vec::new(), Some(remote_config(&server, Some("doc1"))));
    let err = importer
        .engine
        .import(ImportSource::Backend, "wrong", &Selection::All)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(importer.cookies.records().is_empty());
    assert!(
        importer.log.entries()[0]
            .message
            .starts_with("Import failed:")
    );
}

#[tokio::test]
async fn test_remote_import_locates_document_and_persists_id() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let content = encoded_snapshot(vec![sid_cookie()], "someone-else", PASSWORD);
    Mock::given(method("GET"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "found", "files": { DEFAULT_FILENAME: {} } }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gists/found"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_json("found", &content)))
        .mount(&server)
        .await;

    let importer = harness(Vec::new(), Some(remote_config(&server, None)));
    let pending = importer
        .engine
        .fetch_import(ImportSource::Backend, PASSWORD)
        .await
        .unwrap();
    assert_eq!(
        pending.trace.stages(),
        &[
            ImportStage::Idle,
            ImportStage::ConfigCheck,
            ImportStage::Locating,
            ImportStage::Fetching,
            ImportStage::Decrypting,
            ImportStage::Parsing,
            ImportStage::AwaitingSelection,
        ]
    );
    assert_eq!(stored_document_id(&importer.settings).as_deref(), Some("found"));
}

#[tokio::test]
async fn test_remote_import_without_document_is_not_found() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let importer = harness(Vec::new(), Some(remote_config(&server, None)));
    let err = importer
        .engine
        .fetch_import(ImportSource::Backend, PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("Push cookies first"));
    assert_eq!(stored_document_id(&importer.settings), None);
}

#[tokio::test]
async fn test_remote_import_reports_missing_and_truncated_files() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gists/empty"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "empty", "files": {} })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gists/big"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "big",
            "files": { DEFAULT_FILENAME: { "content": "", "truncated": true } }
        })))
        .mount(&server)
        .await;

    let missing = harness(Vec::new(), Some(remote_config(&server, Some("empty"))));
    let err = missing
        .engine
        .fetch_import(ImportSource::Backend, PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);

    let truncated = harness(Vec::new(), Some(remote_config(&server, Some("big"))));
    let err = truncated
        .engine
        .fetch_import(ImportSource::Backend, PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncated);
}

#[tokio::test]
async fn test_remote_export_replaces_deleted_document() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gists/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;

    let exporter = harness(vec![sid_cookie()], Some(remote_config(&server, Some("gone"))));
    exporter.engine.export(&Selection::All, PASSWORD).await.unwrap();
    assert_eq!(stored_document_id(&exporter.settings).as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_remote_export_rejected_save_fails_and_keeps_settings() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;

    let exporter = harness(vec![sid_cookie()], Some(remote_config(&server, None)));
    let err = exporter
        .engine
        .export(&Selection::All, PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, cookiesync_core::SyncError::SaveFailed { .. }));
    assert_eq!(stored_document_id(&exporter.settings), None);
    assert!(
        exporter
            .log
            .entries()
            .iter()
            .any(|entry| entry.message.starts_with("Save failed:"))
    );
}

#[tokio::test]
async fn test_partial_apply_reports_exact_failures() {
    let cookies: Vec<CookieRecord> = (1..=6)
        .map(|i| CookieRecord::new(format!("c{i}"), "v", "x.com", "/"))
        .collect();
    let content = encoded_snapshot(cookies, "someone-else", PASSWORD);

    let store = Arc::new(RejectingStore {
        rejected_names: HashSet::from(["c2".to_string(), "c4".to_string()]),
        ..RejectingStore::default()
    });
    let log = Arc::new(ActivityLog::new());
    let engine = SyncEngine::new(
        store.clone(),
        Arc::new(MemorySettingsStore::default()),
        log.clone(),
    );

    let pending = engine
        .fetch_import(
            ImportSource::Blob {
                source_name: "download".to_string(),
                content,
            },
            PASSWORD,
        )
        .await
        .unwrap();
    let selection = Selection::Ids(
        ["c1", "c2", "c3", "c4", "c5"]
            .iter()
            .map(|name| format!("x.com|{name}|/").parse().unwrap())
            .collect(),
    );
    let report = engine.apply(pending, &selection).await.unwrap();

    assert_eq!(report.apply.success_count, 3);
    assert_eq!(report.apply.fail_count, 2);
    let failed: Vec<&str> = report
        .apply
        .failed_items
        .iter()
        .map(|item| item.identity.as_str())
        .collect();
    assert_eq!(failed, vec!["x.com|c2|/", "x.com|c4|/"]);
    assert_eq!(report.trace.current(), ImportStage::PartiallyFailed);
    assert_eq!(store.inner.records().len(), 3);
    assert!(
        log.entries()
            .iter()
            .any(|entry| entry.message == "Import completed: 3 successful, 2 failed")
    );
}

#[tokio::test]
async fn test_local_export_then_file_import_with_cache_mirror() {
    let downloads = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let cookies = vec![
        sid_cookie(),
        CookieRecord::new("theme", "dark", "app.example.com", "/"),
        CookieRecord::new("id", "x", "tracker.net", "/"),
    ];
    let exporter = harness(
        cookies,
        Some(BackendConfig::Local(LocalConfig {
            downloads_dir: Some(downloads.path().to_path_buf()),
        })),
    );
    let engine = exporter
        .engine
        .with_cache(SnapshotCache::new(cache_dir.path()));

    let report = engine
        .export(&Selection::Domain("*example.com".to_string()), PASSWORD)
        .await
        .unwrap();
    assert_eq!(report.count, 2);
    let cached = SnapshotCache::new(cache_dir.path()).load().unwrap().unwrap();
    assert_eq!(cached.len(), 2);

    let content = std::fs::read_to_string(downloads.path().join(DEFAULT_FILENAME)).unwrap();
    let importer = harness(Vec::new(), None);
    let report = importer
        .engine
        .import(
            ImportSource::Blob {
                source_name: "cookies-encrypted.enc.base64".to_string(),
                content,
            },
            PASSWORD,
            &Selection::All,
        )
        .await
        .unwrap();
    assert_eq!(report.apply.success_count, 2);
    let names: Vec<String> = importer
        .cookies
        .records()
        .into_iter()
        .map(|cookie| cookie.name)
        .collect();
    assert_eq!(names, vec!["sid", "theme"]);
}

#[tokio::test]
async fn test_export_after_failed_attempt_uses_saved_local_directory() {
    let cookies = Arc::new(MemoryCookieStore::with_records(vec![sid_cookie()]));
    let settings = Arc::new(MemorySettingsStore::default());
    let engine = SyncEngine::new(cookies, settings.clone(), Arc::new(ActivityLog::new()));

    // An empty password fails before the backend is resolved, so nothing is persisted.
    assert!(engine.export(&Selection::All, "").await.is_err());
    assert_eq!(settings.load().unwrap(), None);

    let downloads = TempDir::new().unwrap();
    settings
        .save(&Settings {
            backend: Some(BackendConfig::Local(LocalConfig {
                downloads_dir: Some(downloads.path().to_path_buf()),
            })),
        })
        .unwrap();
    engine.export(&Selection::All, PASSWORD).await.unwrap();
    assert!(downloads.path().join(DEFAULT_FILENAME).exists());
}
