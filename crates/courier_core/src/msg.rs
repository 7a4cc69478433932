use crate::{NodeKey, StatusSnapshot, UploadFailure};

/// Everything the scanner knows about a newly found attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateInfo {
    pub key: NodeKey,
    pub file_name: String,
    pub email_identity: String,
    pub subject: Option<String>,
    /// `None` when no download locator could be resolved.
    pub download_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Scanner found a PDF attachment that is not tracked yet.
    CandidateFound(CandidateInfo),
    /// Reconciliation round trip finished; `Err` carries the failure text.
    StatusResolved {
        key: NodeKey,
        outcome: Result<StatusSnapshot, String>,
    },
    /// User clicked the upload button (or an error badge to retry).
    UploadClicked { key: NodeKey },
    /// Upload round trip finished with the remote file id or a failure.
    UploadFinished {
        key: NodeKey,
        result: Result<String, UploadFailure>,
    },
    /// The error display delay elapsed.
    RevertElapsed { key: NodeKey },
    /// Host navigated to another view; per-page state is dropped.
    PageChanged,
}
