use courier_core::{CandidateInfo, NodeKey};
use scraper::Html;

use crate::inject::Placement;

/// One captured state of the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    OpenMessage,
    ListView,
}

/// A PDF attachment found during one scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentCandidate {
    /// Page-stable identity; see `attachment_key`.
    pub key: NodeKey,
    /// Element path of the attachment item in this snapshot.
    pub container: NodeKey,
    pub file_name: String,
    pub is_pdf: bool,
    pub email_identity: String,
    pub subject: Option<String>,
    pub download_ref: Option<String>,
    pub placement: Placement,
    /// Which host layout variant matched.
    pub variant: String,
}

impl AttachmentCandidate {
    pub fn info(&self) -> CandidateInfo {
        CandidateInfo {
            key: self.key.clone(),
            file_name: self.file_name.clone(),
            email_identity: self.email_identity.clone(),
            subject: self.subject.clone(),
            download_ref: self.download_ref.clone(),
        }
    }
}

/// Result of one open-message pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenMessageScan {
    /// Attachments not processed yet, in document order.
    pub candidates: Vec<AttachmentCandidate>,
    /// Processed attachments whose host node moved since they were rendered.
    pub moved: Vec<(NodeKey, Placement)>,
}

/// A list-view row whose attachment chip names a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChip {
    /// Row identity; see `list_row_key`.
    pub row: NodeKey,
    /// Element path of the row in this snapshot.
    pub row_path: NodeKey,
    pub file_name: String,
}
