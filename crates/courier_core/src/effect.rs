use crate::{AffordanceState, NodeKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CheckStatus {
        key: NodeKey,
        email_identity: String,
        file_name: String,
    },
    /// Insert the affordance, or replace it in place when one exists.
    Render {
        key: NodeKey,
        state: AffordanceState,
    },
    StartUpload(UploadJob),
    ScheduleRevert { key: NodeKey, delay_ms: u64 },
    PromptConfigure,
    PromptReload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub key: NodeKey,
    pub file_name: String,
    pub email_identity: String,
    pub subject: Option<String>,
    pub download_ref: String,
}
