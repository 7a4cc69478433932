//! Key-value persistence for settings, transfer history and the remote file cache.

use std::path::PathBuf;
use std::sync::Arc;

use courier_core::{KnownRemoteFileSet, TransferHistory, TransferRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::backend::{Credentials, DEFAULT_API_BASE_URL};
use crate::persist::{AtomicFileWriter, PersistError};

pub const API_TOKEN_KEY: &str = "apiToken";
pub const ORGANIZATION_ID_KEY: &str = "organizationId";
pub const API_BASE_URL_KEY: &str = "apiBaseUrl";
pub const TRANSFER_HISTORY_KEY: &str = "transferHistory";
pub const KNOWN_REMOTE_FILES_KEY: &str = "knownRemoteFiles";
pub const LAST_REMOTE_SYNC_KEY: &str = "lastRemoteSync";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("store file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("value under {key:?} is malformed: {message}")]
    Malformed { key: String, message: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Values = Map<String, Value>;

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Values for the keys in `defaults`; missing keys keep their default.
    async fn get(&self, defaults: Values) -> Result<Values, StoreError>;
    async fn set(&self, values: Values) -> Result<(), StoreError>;
    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;
}

fn merge_defaults(stored: &Values, mut defaults: Values) -> Values {
    for (key, value) in defaults.iter_mut() {
        if let Some(found) = stored.get(key) {
            *value = found.clone();
        }
    }
    defaults
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<Values>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, defaults: Values) -> Result<Values, StoreError> {
        Ok(merge_defaults(&*self.values.lock().await, defaults))
    }

    async fn set(&self, values: Values) -> Result<(), StoreError> {
        self.values.lock().await.extend(values);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut guard = self.values.lock().await;
        for key in keys {
            guard.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.values.lock().await.clear();
        Ok(())
    }
}

/// One JSON object on disk, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileStore {
    writer: AtomicFileWriter,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(path),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Values, StoreError> {
        match std::fs::read(self.writer.target()) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Values::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Values::new()),
            Err(err) => Err(PersistError::Io(err).into()),
        }
    }

    fn save(&self, values: &Values) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(values)?;
        self.writer.write(&bytes)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, defaults: Values) -> Result<Values, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(merge_defaults(&self.load()?, defaults))
    }

    async fn set(&self, values: Values) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut stored = self.load()?;
        stored.extend(values);
        self.save(&stored)
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut stored = self.load()?;
        for key in keys {
            stored.remove(*key);
        }
        self.save(&stored)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.save(&Values::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Settings {
    /// `None` unless both token and organization id are set.
    pub fn credentials(&self) -> Option<Credentials> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToOwned::to_owned)
        };
        Some(Credentials {
            api_token: present(&self.api_token)?,
            organization_id: present(&self.organization_id)?,
            base_url: present(&self.api_base_url).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }
}

/// Typed access to the well-known keys.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn settings(&self) -> Result<Settings, StoreError> {
        let values = self
            .store
            .get(defaults(&[API_TOKEN_KEY, ORGANIZATION_ID_KEY, API_BASE_URL_KEY]))
            .await?;
        Ok(Settings {
            api_token: string_value(&values, API_TOKEN_KEY),
            organization_id: string_value(&values, ORGANIZATION_ID_KEY),
            api_base_url: string_value(&values, API_BASE_URL_KEY),
        })
    }

    /// Writes the fields that are set; unset fields keep their stored value.
    pub async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let mut values = Values::new();
        for (key, value) in [
            (API_TOKEN_KEY, &settings.api_token),
            (ORGANIZATION_ID_KEY, &settings.organization_id),
            (API_BASE_URL_KEY, &settings.api_base_url),
        ] {
            if let Some(value) = value {
                values.insert(key.to_string(), Value::String(value.trim().to_string()));
            }
        }
        self.store.set(values).await
    }

    pub async fn history(&self) -> Result<TransferHistory, StoreError> {
        let values = self.store.get(defaults(&[TRANSFER_HISTORY_KEY])).await?;
        let records: Vec<TransferRecord> = typed_value(&values, TRANSFER_HISTORY_KEY)?.unwrap_or_default();
        Ok(TransferHistory::from_records(records))
    }

    pub async fn save_history(&self, history: &TransferHistory) -> Result<(), StoreError> {
        let mut values = Values::new();
        values.insert(TRANSFER_HISTORY_KEY.to_string(), serde_json::to_value(history)?);
        self.store.set(values).await
    }

    pub async fn remote_files(&self) -> Result<KnownRemoteFileSet, StoreError> {
        let values = self
            .store
            .get(defaults(&[KNOWN_REMOTE_FILES_KEY, LAST_REMOTE_SYNC_KEY]))
            .await?;
        let names: Vec<String> = typed_value(&values, KNOWN_REMOTE_FILES_KEY)?.unwrap_or_default();
        Ok(KnownRemoteFileSet::from_names(
            names,
            string_value(&values, LAST_REMOTE_SYNC_KEY),
        ))
    }

    pub async fn save_remote_files(&self, remote: &KnownRemoteFileSet) -> Result<(), StoreError> {
        let mut values = Values::new();
        let names: Vec<&str> = remote.names().collect();
        values.insert(KNOWN_REMOTE_FILES_KEY.to_string(), serde_json::to_value(names)?);
        if let Some(last_sync) = remote.last_sync() {
            values.insert(LAST_REMOTE_SYNC_KEY.to_string(), Value::String(last_sync.to_string()));
        }
        self.store.set(values).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await
    }
}

fn defaults(keys: &[&str]) -> Values {
    keys.iter().map(|key| (key.to_string(), Value::Null)).collect()
}

fn string_value(values: &Values, key: &str) -> Option<String> {
    values
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn typed_value<T: serde::de::DeserializeOwned>(values: &Values, key: &str) -> Result<Option<T>, StoreError> {
    match values.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|err| StoreError::Malformed {
                key: key.to_string(),
                message: err.to_string(),
            }),
    }
}
