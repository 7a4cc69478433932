use serde::{Deserialize, Serialize};

use crate::history::{KnownRemoteFileSet, TransferHistory};

/// What the reconciler learned about one `(email identity, file name)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// A transfer record exists for the email identity.
    pub transferred_by_id: bool,
    /// The file name is in the remote set or in the local history.
    pub known_by_name: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDecision {
    /// Offer the upload action.
    Button,
    /// Show the "already sent" indicator.
    Badge,
}

/// Normalized membership test against the remote set and local file names.
pub fn is_in_remote_set(
    file_name: &str,
    remote: &KnownRemoteFileSet,
    history: &TransferHistory,
) -> bool {
    remote.contains(file_name) || history.contains_file_name(file_name)
}

pub fn status_for(
    email_identity: &str,
    file_name: &str,
    history: &TransferHistory,
    remote: &KnownRemoteFileSet,
) -> StatusSnapshot {
    StatusSnapshot {
        transferred_by_id: history.is_transferred(email_identity),
        known_by_name: is_in_remote_set(file_name, remote, history),
    }
}

/// Badge when either signal says the file was sent; button otherwise.
///
/// A name match alone is enough: several email identities can point at the
/// same backend file. A failed lookup never hides the action.
pub fn decide<E>(status: Result<StatusSnapshot, E>) -> RenderDecision {
    match status {
        Ok(snapshot) if snapshot.transferred_by_id || snapshot.known_by_name => {
            RenderDecision::Badge
        }
        Ok(_) | Err(_) => RenderDecision::Button,
    }
}
