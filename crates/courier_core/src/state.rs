use std::collections::BTreeMap;

use crate::view_model::{AffordanceRow, PageViewModel};
use crate::{AffordanceState, CandidateInfo, NodeKey};

/// Delay before a failed upload turns back into a retriable button.
pub const ERROR_REVERT_DELAY_MS: u64 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AffordanceEntry {
    pub(crate) seq: u64,
    pub(crate) info: CandidateInfo,
    pub(crate) state: AffordanceState,
}

/// Per-page affordance state, keyed by host node identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    entries: BTreeMap<NodeKey, AffordanceEntry>,
    next_seq: u64,
    revert_delay_ms: u64,
    dirty: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
            revert_delay_ms: ERROR_REVERT_DELAY_MS,
            dirty: false,
        }
    }
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revert_delay(revert_delay_ms: u64) -> Self {
        Self {
            revert_delay_ms,
            ..Self::default()
        }
    }

    pub fn view(&self) -> PageViewModel {
        let mut rows: Vec<_> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                (
                    entry.seq,
                    AffordanceRow {
                        key: key.clone(),
                        file_name: entry.info.file_name.clone(),
                        email_identity: entry.info.email_identity.clone(),
                        state: entry.state.clone(),
                    },
                )
            })
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        PageViewModel {
            rows: rows.into_iter().map(|(_, row)| row).collect(),
            dirty: self.dirty,
        }
    }

    pub fn state_of(&self, key: &NodeKey) -> Option<&AffordanceState> {
        self.entries.get(key).map(|e| &e.state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn revert_delay_ms(&self) -> u64 {
        self.revert_delay_ms
    }

    pub(crate) fn contains(&self, key: &NodeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn insert(&mut self, info: CandidateInfo) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            info.key.clone(),
            AffordanceEntry {
                seq,
                info,
                state: AffordanceState::Checking,
            },
        );
        self.dirty = true;
    }

    pub(crate) fn entry(&self, key: &NodeKey) -> Option<&AffordanceEntry> {
        self.entries.get(key)
    }

    pub(crate) fn set_state(&mut self, key: &NodeKey, state: AffordanceState) {
        if let Some(entry) = self.entries.get_mut(key) {
            if entry.state != state {
                entry.state = state;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.dirty = true;
        }
    }
}
