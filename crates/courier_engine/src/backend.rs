//! Client for the accounting backend REST API.
//!
//! Every request carries the bearer token and embeds the organization id in
//! its path. No client-side timeout is applied to backend calls.

use courier_logging::{courier_debug, courier_warn};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "https://api.ledger.example.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("api token or organization id missing")]
    NotConfigured,
    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_token: String,
    pub organization_id: String,
    pub base_url: String,
}

impl Credentials {
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/organizations/{}/{path}",
            self.base_url.trim_end_matches('/'),
            self.organization_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub booking_status: String,
    pub document_status: String,
    pub direction: String,
}

impl TransactionFilter {
    /// Matches nothing in particular; used to probe connectivity.
    pub fn none() -> Self {
        Self {
            booking_status: "NONE".to_string(),
            document_status: "NONE".to_string(),
            direction: "NONE".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub booking_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntity {
    pub id: String,
    #[serde(alias = "fileName", alias = "filename")]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(alias = "items")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Uploaded {
    #[serde(alias = "fileId")]
    id: String,
}

#[async_trait::async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Uploads one file and returns the backend file id.
    async fn upload_file(
        &self,
        credentials: &Credentials,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, BackendError>;

    async fn list_transactions(
        &self,
        credentials: &Credentials,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionDto>, BackendError>;

    /// Never fails: errors are logged and yield an empty list.
    async fn list_files(&self, credentials: &Credentials) -> Vec<FileEntity>;

    async fn connect_transaction(
        &self,
        credentials: &Credentials,
        transaction_id: &str,
        file_id: &str,
    ) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    async fn checked(
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<reqwest::Response, BackendError> {
        let response = response.map_err(|err| BackendError::Network(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch_files(&self, credentials: &Credentials) -> Result<Vec<FileEntity>, BackendError> {
        let response = self
            .client
            .get(credentials.endpoint("files"))
            .bearer_auth(&credentials.api_token)
            .send()
            .await;
        let listing: Listing<FileEntity> = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))?;
        Ok(listing.data)
    }
}

#[async_trait::async_trait]
impl LedgerBackend for ReqwestBackend {
    async fn upload_file(
        &self,
        credentials: &Credentials,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, BackendError> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|err| BackendError::Decode(err.to_string()))?;
        let form = Form::new().part("file", part);
        let response = self
            .client
            .post(credentials.endpoint("files/upload"))
            .bearer_auth(&credentials.api_token)
            .multipart(form)
            .send()
            .await;
        let uploaded: Uploaded = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))?;
        courier_debug!("uploaded {file_name} ({size} bytes) as {}", uploaded.id);
        Ok(uploaded.id)
    }

    async fn list_transactions(
        &self,
        credentials: &Credentials,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionDto>, BackendError> {
        let response = self
            .client
            .post(credentials.endpoint("transactions/search"))
            .bearer_auth(&credentials.api_token)
            .json(filter)
            .send()
            .await;
        let listing: Listing<TransactionDto> = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))?;
        Ok(listing.data)
    }

    async fn list_files(&self, credentials: &Credentials) -> Vec<FileEntity> {
        match self.fetch_files(credentials).await {
            Ok(files) => files,
            Err(err) => {
                courier_warn!("listing remote files failed: {err}");
                Vec::new()
            }
        }
    }

    async fn connect_transaction(
        &self,
        credentials: &Credentials,
        transaction_id: &str,
        file_id: &str,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .post(credentials.endpoint(&format!("transactions/{transaction_id}/files")))
            .bearer_auth(&credentials.api_token)
            .json(&serde_json::json!({ "fileId": file_id }))
            .send()
            .await;
        Self::checked(response).await?;
        Ok(())
    }
}
