use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_file_name;

/// Durable proof that one attachment was sent to the accounting backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    #[serde(rename = "emailId")]
    pub email_identity: String,
    pub file_name: String,
    /// Absent for records created by an explicit manual mark.
    #[serde(rename = "fileId", default)]
    pub remote_file_id: Option<String>,
    /// ISO-8601 timestamp of the transfer.
    #[serde(rename = "timestamp")]
    pub transferred_at: String,
    #[serde(default)]
    pub subject: Option<String>,
}

/// Ordered transfer history with at most one record per email identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferHistory {
    records: Vec<TransferRecord>,
}

impl TransferHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<TransferRecord>) -> Self {
        let mut history = Self::new();
        for record in records {
            history.upsert(record);
        }
        history
    }

    /// Inserts the record, or overwrites the existing record for the same
    /// email identity in place. Returns `true` when an older record was replaced.
    pub fn upsert(&mut self, record: TransferRecord) -> bool {
        match self
            .records
            .iter_mut()
            .find(|existing| existing.email_identity == record.email_identity)
        {
            Some(existing) => {
                *existing = record;
                true
            }
            None => {
                self.records.push(record);
                false
            }
        }
    }

    pub fn remove(&mut self, email_identity: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.email_identity != email_identity);
        self.records.len() != before
    }

    pub fn find_by_email(&self, email_identity: &str) -> Option<&TransferRecord> {
        self.records
            .iter()
            .find(|r| r.email_identity == email_identity)
    }

    pub fn is_transferred(&self, email_identity: &str) -> bool {
        self.find_by_email(email_identity).is_some()
    }

    pub fn contains_file_name(&self, file_name: &str) -> bool {
        let wanted = normalize_file_name(file_name);
        self.records
            .iter()
            .any(|r| normalize_file_name(&r.file_name) == wanted)
    }

    /// Normalized file names of every recorded transfer.
    pub fn normalized_file_names(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .map(|r| normalize_file_name(&r.file_name))
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn records(&self) -> &[TransferRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TransferRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Locally cached mirror of the file names the backend already knows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KnownRemoteFileSet {
    names: BTreeSet<String>,
    last_sync: Option<String>,
}

impl KnownRemoteFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I, last_sync: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| normalize_file_name(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self { names, last_sync }
    }

    /// Builds the set stored after a sync cycle: every remote name plus every
    /// locally recorded transfer, so local-only uploads stay visible.
    pub fn synced<I, S>(remote_names: I, history: &TransferHistory, synced_at: String) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::from_names(remote_names, Some(synced_at));
        set.names.extend(history.normalized_file_names());
        set
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.names.contains(&normalize_file_name(file_name))
    }

    pub fn insert(&mut self, file_name: &str) -> bool {
        let normalized = normalize_file_name(file_name);
        if normalized.is_empty() {
            return false;
        }
        self.names.insert(normalized)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn last_sync(&self) -> Option<&str> {
        self.last_sync.as_deref()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
