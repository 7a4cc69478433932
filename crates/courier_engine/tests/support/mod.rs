#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use courier_engine::{
    AttachmentFetcher, BackendError, Credentials, Dispatcher, FetchError, FetchedAttachment,
    FileEntity, KeyValueStore, LedgerBackend, MemoryStore, Settings, Storage, StoreError,
    TransactionDto, TransactionFilter, Values,
};

pub const NOW: &str = "2024-05-14T09:30:00.000Z";

#[derive(Default)]
pub struct FakeBackend {
    pub remote_names: Vec<String>,
    pub reject_uploads: bool,
    pub uploads: Mutex<Vec<(String, usize)>>,
}

impl FakeBackend {
    pub fn with_remote(names: &[&str]) -> Self {
        Self {
            remote_names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl LedgerBackend for FakeBackend {
    async fn upload_file(
        &self,
        _credentials: &Credentials,
        bytes: Vec<u8>,
        file_name: &str,
        _mime_type: &str,
    ) -> Result<String, BackendError> {
        if self.reject_uploads {
            return Err(BackendError::Status {
                status: 500,
                body: "storage full".to_string(),
            });
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((file_name.to_string(), bytes.len()));
        Ok(format!("file-{}", uploads.len()))
    }

    async fn list_transactions(
        &self,
        _credentials: &Credentials,
        _filter: &TransactionFilter,
    ) -> Result<Vec<TransactionDto>, BackendError> {
        Ok(Vec::new())
    }

    async fn list_files(&self, _credentials: &Credentials) -> Vec<FileEntity> {
        self.remote_names
            .iter()
            .enumerate()
            .map(|(i, name)| FileEntity {
                id: format!("remote-{i}"),
                name: name.clone(),
                created_at: None,
            })
            .collect()
    }

    async fn connect_transaction(
        &self,
        _credentials: &Credentials,
        _transaction_id: &str,
        _file_id: &str,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Every operation fails, like storage after the quota is exhausted.
pub struct FailingStore;

#[async_trait::async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _defaults: Values) -> Result<Values, StoreError> {
        Err(StoreError::Unavailable("quota exceeded".to_string()))
    }
    async fn set(&self, _values: Values) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("quota exceeded".to_string()))
    }
    async fn remove(&self, _keys: &[&str]) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("quota exceeded".to_string()))
    }
    async fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("quota exceeded".to_string()))
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    pub requested: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl AttachmentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAttachment, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(FetchedAttachment {
            bytes: b"%PDF-1.7 fake".to_vec(),
            final_url: url.to_string(),
            content_type: Some("application/pdf".to_string()),
        })
    }
}

pub fn configured_settings() -> Settings {
    Settings {
        api_token: Some("tok-123".to_string()),
        organization_id: Some("org-1".to_string()),
        api_base_url: None,
    }
}

pub async fn configured_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    Storage::new(store.clone())
        .save_settings(&configured_settings())
        .await
        .unwrap();
    store
}

pub fn dispatcher(store: Arc<dyn KeyValueStore>, backend: Arc<FakeBackend>) -> Dispatcher {
    Dispatcher::with_timestamp(store, backend, Arc::new(|| NOW.to_string()))
}
