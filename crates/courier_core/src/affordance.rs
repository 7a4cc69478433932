use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of an attachment or list row across snapshots of the same
/// page. Built by the scanner from message identity and file name, so it does
/// not follow element positions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of the affordance attached to one attachment node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffordanceState {
    Checking,
    Button,
    Badge,
    Uploading,
    Error(UploadFailure),
}

impl AffordanceState {
    /// `Checking` has no visible node yet.
    pub fn is_visible(&self) -> bool {
        !matches!(self, AffordanceState::Checking)
    }

    pub fn accepts_click(&self) -> bool {
        matches!(self, AffordanceState::Button | AffordanceState::Error(_))
    }
}

/// User-facing failures of the upload path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    DownloadReferenceNotFound,
    UploadFailed(String),
    NotConfigured,
    ContextInvalidated,
}

impl UploadFailure {
    /// Every failure falls back to a retriable button after a short delay,
    /// except a lost privileged context, which needs a page reload.
    pub fn auto_reverts(&self) -> bool {
        !matches!(self, UploadFailure::ContextInvalidated)
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadFailure::DownloadReferenceNotFound => write!(
                f,
                "download link not found; open the attachment and upload it manually"
            ),
            UploadFailure::UploadFailed(reason) => write!(f, "upload failed: {reason}"),
            UploadFailure::NotConfigured => {
                write!(f, "not configured; set the API token and organization id")
            }
            UploadFailure::ContextInvalidated => {
                write!(f, "the extension was reloaded; reload the page")
            }
        }
    }
}
