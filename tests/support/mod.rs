#![allow(dead_code)]

pub mod socket_guard;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use cookiesync_core::cookie::CookieStoreError;
use cookiesync_core::{
    ActivityLog, BackendConfig, CookieRecord, CookieStore, EnvironmentDescriptor,
    MemoryCookieStore, MemorySettingsStore, Settings, Snapshot, SyncEngine, codec, crypto,
};
use url::Url;

/// Environment used for engines that should not recognize a snapshot as their own.
pub fn other_environment() -> EnvironmentDescriptor {
    EnvironmentDescriptor {
        user_agent: "integration-agent".to_string(),
        platform: "test-os".to_string(),
        language: "en-US".to_string(),
        hardware_concurrency: 2,
        host: "elsewhere".to_string(),
    }
}

/// Encrypts and encodes `cookies` the way an export does.
pub fn encoded_snapshot(cookies: Vec<CookieRecord>, browser_id: &str, password: &str) -> String {
    let json = codec::serialize(&Snapshot::new(cookies, browser_id)).unwrap();
    let blob = crypto::encrypt(json.as_bytes(), password).unwrap();
    codec::encode_blob(blob.as_bytes())
}

pub struct Harness {
    pub engine: SyncEngine,
    pub cookies: Arc<MemoryCookieStore>,
    pub settings: Arc<MemorySettingsStore>,
    pub log: Arc<ActivityLog>,
}

pub fn harness(cookies: Vec<CookieRecord>, backend: Option<BackendConfig>) -> Harness {
    let cookies = Arc::new(MemoryCookieStore::with_records(cookies));
    let settings = Arc::new(match backend {
        Some(backend) => MemorySettingsStore::with_settings(Settings {
            backend: Some(backend),
        }),
        None => MemorySettingsStore::default(),
    });
    let log = Arc::new(ActivityLog::new());
    let engine = SyncEngine::new(cookies.clone(), settings.clone(), log.clone());
    Harness {
        engine,
        cookies,
        settings,
        log,
    }
}

/// Cookie store that refuses the listed cookie names.
#[derive(Debug, Default)]
pub struct RejectingStore {
    pub inner: MemoryCookieStore,
    pub rejected_names: HashSet<String>,
}

#[async_trait]
impl CookieStore for RejectingStore {
    async fn list(&self) -> Result<Vec<CookieRecord>, CookieStoreError> {
        self.inner.list().await
    }

    async fn set(&self, url: &Url, cookie: &CookieRecord) -> Result<(), CookieStoreError> {
        if self.rejected_names.contains(&cookie.name) {
            return Err(CookieStoreError::Rejected {
                identity: cookie.id().to_string(),
                reason: "blocked by policy".to_string(),
            });
        }
        self.inner.set(url, cookie).await
    }
}
