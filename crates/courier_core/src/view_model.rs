use serde::{Deserialize, Serialize};

use crate::{AffordanceState, KnownRemoteFileSet, NodeKey, TransferHistory};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageViewModel {
    /// Affordances in discovery order.
    pub rows: Vec<AffordanceRow>,
    pub dirty: bool,
}

impl PageViewModel {
    pub fn count_in(&self, wanted: fn(&AffordanceState) -> bool) -> usize {
        self.rows.iter().filter(|row| wanted(&row.state)).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffordanceRow {
    pub key: NodeKey,
    pub file_name: String,
    pub email_identity: String,
    pub state: AffordanceState,
}

/// Figures shown by the popup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStats {
    pub total_transfers: usize,
    pub transfers_this_month: usize,
    pub latest_file_name: Option<String>,
    pub latest_transfer_at: Option<String>,
    pub known_remote_files: usize,
    pub last_sync: Option<String>,
}

/// `current_month` is the `YYYY-MM` prefix of the current ISO-8601 date.
pub fn transfer_stats(
    history: &TransferHistory,
    remote: &KnownRemoteFileSet,
    current_month: &str,
) -> TransferStats {
    let records = history.records();
    let latest = records.iter().max_by(|a, b| a.transferred_at.cmp(&b.transferred_at));
    TransferStats {
        total_transfers: records.len(),
        transfers_this_month: records
            .iter()
            .filter(|r| r.transferred_at.starts_with(current_month))
            .count(),
        latest_file_name: latest.map(|r| r.file_name.clone()),
        latest_transfer_at: latest.map(|r| r.transferred_at.clone()),
        known_remote_files: remote.len(),
        last_sync: remote.last_sync().map(ToOwned::to_owned),
    }
}
