//! Wire format between the page side and the privileged side.

use courier_core::{TransferRecord, TransferStats};
use serde::{Deserialize, Serialize};

use crate::store::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Request {
    UploadAttachment {
        email_id: String,
        file_name: String,
        #[serde(default)]
        subject: Option<String>,
        mime_type: String,
        file_data: Vec<u8>,
    },
    CheckStatusById {
        email_id: String,
    },
    CheckStatusByFilename {
        file_name: String,
    },
    MarkTransferred {
        email_id: String,
        file_name: String,
        #[serde(default)]
        file_id: Option<String>,
        #[serde(default)]
        subject: Option<String>,
    },
    GetSettings,
    SaveSettings {
        #[serde(default)]
        api_token: Option<String>,
        #[serde(default)]
        organization_id: Option<String>,
        #[serde(default)]
        api_base_url: Option<String>,
    },
    GetTransferred,
    RemoveTransferred {
        email_id: String,
    },
    TestConnection,
    SyncRemoteFiles,
    GetCachedRemoteFiles,
    ConnectTransaction {
        transaction_id: String,
        file_id: String,
    },
    GetStats,
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::UploadAttachment { .. } => "upload-attachment",
            Request::CheckStatusById { .. } => "check-status-by-id",
            Request::CheckStatusByFilename { .. } => "check-status-by-filename",
            Request::MarkTransferred { .. } => "mark-transferred",
            Request::GetSettings => "get-settings",
            Request::SaveSettings { .. } => "save-settings",
            Request::GetTransferred => "get-transferred",
            Request::RemoveTransferred { .. } => "remove-transferred",
            Request::TestConnection => "test-connection",
            Request::SyncRemoteFiles => "sync-remote-files",
            Request::GetCachedRemoteFiles => "get-cached-remote-files",
            Request::ConnectTransaction { .. } => "connect-transaction",
            Request::GetStats => "get-stats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    NotConfigured,
    UploadFailed,
    StorageFailed,
    BackendFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Response {
    Ack {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Uploaded {
        file_id: String,
    },
    TransferStatus {
        transferred: bool,
        #[serde(default)]
        record: Option<TransferRecord>,
    },
    FileStatus {
        known: bool,
    },
    Settings {
        settings: Settings,
    },
    Transferred {
        records: Vec<TransferRecord>,
    },
    RemoteFiles {
        names: Vec<String>,
        #[serde(default)]
        last_sync: Option<String>,
    },
    Stats {
        stats: TransferStats,
    },
    Failed {
        code: ErrorCode,
        error: String,
    },
}

impl Response {
    pub fn ok() -> Self {
        Response::Ack {
            success: true,
            error: None,
        }
    }

    pub fn failed(code: ErrorCode, error: impl ToString) -> Self {
        Response::Failed {
            code,
            error: error.to_string(),
        }
    }
}
