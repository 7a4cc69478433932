//! Privileged side: owns storage and the backend client and answers requests.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use courier_core::{
    is_in_remote_set, transfer_stats, KnownRemoteFileSet, TransferHistory, TransferRecord,
};
use courier_logging::{courier_debug, courier_info, courier_warn};

use crate::backend::{Credentials, LedgerBackend, TransactionFilter};
use crate::messages::{ErrorCode, Request, Response};
use crate::store::{KeyValueStore, Settings, Storage};

pub type Timestamp = Arc<dyn Fn() -> String + Send + Sync>;

pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct Dispatcher {
    storage: Storage,
    backend: Arc<dyn LedgerBackend>,
    timestamp: Timestamp,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn KeyValueStore>, backend: Arc<dyn LedgerBackend>) -> Self {
        Self::with_timestamp(store, backend, Arc::new(utc_timestamp))
    }

    pub fn with_timestamp(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn LedgerBackend>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            storage: Storage::new(store),
            backend,
            timestamp,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub async fn handle(&self, request: Request) -> Response {
        courier_debug!("handling {}", request.action());
        match request {
            Request::UploadAttachment {
                email_id,
                file_name,
                subject,
                mime_type,
                file_data,
            } => {
                self.upload(email_id, file_name, subject, &mime_type, file_data)
                    .await
            }
            Request::CheckStatusById { email_id } => match self.storage.history().await {
                Ok(history) => {
                    let record = history.find_by_email(&email_id).cloned();
                    Response::TransferStatus {
                        transferred: record.is_some(),
                        record,
                    }
                }
                Err(err) => Response::failed(ErrorCode::StorageFailed, err),
            },
            Request::CheckStatusByFilename { file_name } => {
                let history = self.storage.history().await;
                let remote = self.storage.remote_files().await;
                match (history, remote) {
                    (Ok(history), Ok(remote)) => Response::FileStatus {
                        known: is_in_remote_set(&file_name, &remote, &history),
                    },
                    (Err(err), _) | (_, Err(err)) => Response::failed(ErrorCode::StorageFailed, err),
                }
            }
            Request::MarkTransferred {
                email_id,
                file_name,
                file_id,
                subject,
            } => {
                let record = TransferRecord {
                    email_identity: email_id,
                    file_name,
                    remote_file_id: file_id,
                    transferred_at: (self.timestamp)(),
                    subject,
                };
                match self.record_transfer(record).await {
                    Ok(()) => Response::ok(),
                    Err(err) => Response::failed(ErrorCode::StorageFailed, err),
                }
            }
            Request::GetSettings => match self.storage.settings().await {
                Ok(settings) => Response::Settings { settings },
                Err(err) => Response::failed(ErrorCode::StorageFailed, err),
            },
            Request::SaveSettings {
                api_token,
                organization_id,
                api_base_url,
            } => {
                let settings = Settings {
                    api_token,
                    organization_id,
                    api_base_url,
                };
                match self.storage.save_settings(&settings).await {
                    Ok(()) => Response::ok(),
                    Err(err) => Response::failed(ErrorCode::StorageFailed, err),
                }
            }
            Request::GetTransferred => match self.storage.history().await {
                Ok(history) => Response::Transferred {
                    records: history.into_records(),
                },
                Err(err) => Response::failed(ErrorCode::StorageFailed, err),
            },
            Request::RemoveTransferred { email_id } => self.remove(&email_id).await,
            Request::TestConnection => match self.credentials().await {
                Ok(credentials) => match self
                    .backend
                    .list_transactions(&credentials, &TransactionFilter::none())
                    .await
                {
                    Ok(_) => Response::ok(),
                    Err(err) => Response::Ack {
                        success: false,
                        error: Some(err.to_string()),
                    },
                },
                Err(response) => response,
            },
            Request::SyncRemoteFiles => match self.credentials().await {
                Ok(credentials) => self.sync_remote_files(&credentials).await,
                Err(response) => response,
            },
            Request::GetCachedRemoteFiles => match self.storage.remote_files().await {
                Ok(remote) => remote_files_response(&remote),
                Err(err) => Response::failed(ErrorCode::StorageFailed, err),
            },
            Request::ConnectTransaction {
                transaction_id,
                file_id,
            } => match self.credentials().await {
                Ok(credentials) => match self
                    .backend
                    .connect_transaction(&credentials, &transaction_id, &file_id)
                    .await
                {
                    Ok(()) => Response::ok(),
                    Err(err) => Response::failed(ErrorCode::BackendFailed, err),
                },
                Err(response) => response,
            },
            Request::GetStats => {
                let history = self.storage.history().await;
                let remote = self.storage.remote_files().await;
                match (history, remote) {
                    (Ok(history), Ok(remote)) => {
                        let now = (self.timestamp)();
                        let month = now.get(..7).unwrap_or(&now);
                        Response::Stats {
                            stats: transfer_stats(&history, &remote, month),
                        }
                    }
                    (Err(err), _) | (_, Err(err)) => Response::failed(ErrorCode::StorageFailed, err),
                }
            }
        }
    }

    /// Stored credentials, or the `not-configured` response to send back.
    async fn credentials(&self) -> Result<Credentials, Response> {
        let settings = self
            .storage
            .settings()
            .await
            .map_err(|err| Response::failed(ErrorCode::StorageFailed, err))?;
        settings.credentials().ok_or_else(|| {
            Response::failed(
                ErrorCode::NotConfigured,
                "API token and organization id are required",
            )
        })
    }

    async fn upload(
        &self,
        email_id: String,
        file_name: String,
        subject: Option<String>,
        mime_type: &str,
        file_data: Vec<u8>,
    ) -> Response {
        let credentials = match self.credentials().await {
            Ok(credentials) => credentials,
            Err(response) => return response,
        };
        let file_id = match self
            .backend
            .upload_file(&credentials, file_data, &file_name, mime_type)
            .await
        {
            Ok(file_id) => file_id,
            Err(err) => {
                courier_warn!("upload of {file_name} failed: {err}");
                return Response::failed(ErrorCode::UploadFailed, err);
            }
        };
        courier_info!("uploaded {file_name} for {email_id} as {file_id}");

        let record = TransferRecord {
            email_identity: email_id,
            file_name: file_name.clone(),
            remote_file_id: Some(file_id.clone()),
            transferred_at: (self.timestamp)(),
            subject,
        };
        // The file is on the backend already; a bookkeeping failure must not
        // turn the upload into an error.
        if let Err(err) = self.record_transfer(record).await {
            courier_warn!("could not record transfer of {file_name}: {err}");
        }
        if let Err(err) = self.remember_remote_name(&file_name).await {
            courier_warn!("could not cache remote name {file_name}: {err}");
        }
        Response::Uploaded { file_id }
    }

    async fn record_transfer(&self, record: TransferRecord) -> Result<(), crate::store::StoreError> {
        let mut history = self.storage.history().await?;
        if history.upsert(record) {
            courier_debug!("replaced an earlier transfer record");
        }
        self.storage.save_history(&history).await
    }

    async fn remember_remote_name(&self, file_name: &str) -> Result<(), crate::store::StoreError> {
        let mut remote = self.storage.remote_files().await?;
        if remote.insert(file_name) {
            self.storage.save_remote_files(&remote).await?;
        }
        Ok(())
    }

    async fn remove(&self, email_id: &str) -> Response {
        let mut history = match self.storage.history().await {
            Ok(history) => history,
            Err(err) => return Response::failed(ErrorCode::StorageFailed, err),
        };
        if !history.remove(email_id) {
            return Response::Ack {
                success: false,
                error: Some(format!("no transfer recorded for {email_id}")),
            };
        }
        match self.storage.save_history(&history).await {
            Ok(()) => Response::ok(),
            Err(err) => Response::failed(ErrorCode::StorageFailed, err),
        }
    }

    /// Replaces the cached remote set with the remote names plus every local
    /// transfer. A failing listing degrades to the local names only.
    async fn sync_remote_files(&self, credentials: &Credentials) -> Response {
        let files = self.backend.list_files(credentials).await;
        let history = match self.storage.history().await {
            Ok(history) => history,
            Err(err) => {
                courier_warn!("history unavailable during sync: {err}");
                TransferHistory::new()
            }
        };
        let remote = KnownRemoteFileSet::synced(
            files.iter().map(|file| file.name.as_str()),
            &history,
            (self.timestamp)(),
        );
        courier_info!("synced {} remote files ({} known names)", files.len(), remote.len());
        match self.storage.save_remote_files(&remote).await {
            Ok(()) => remote_files_response(&remote),
            Err(err) => Response::failed(ErrorCode::StorageFailed, err),
        }
    }
}

fn remote_files_response(remote: &KnownRemoteFileSet) -> Response {
    Response::RemoteFiles {
        names: remote.names().map(ToOwned::to_owned).collect(),
        last_sync: remote.last_sync().map(ToOwned::to_owned),
    }
}
