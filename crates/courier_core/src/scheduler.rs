use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::location::fragment_of;

/// Millisecond time source. The page session uses a wall clock; tests drive
/// a [`ManualClock`].
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, now_ms: u64) {
        self.now.set(now_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Timer settings, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub attachment_debounce_ms: u64,
    /// List rows churn more and matter less, so they wait longer.
    pub list_debounce_ms: u64,
    pub initial_scan_ms: u64,
    pub second_scan_ms: u64,
    pub periodic_ms: u64,
    pub navigation_settle_ms: u64,
    /// How long an upload error stays on screen before the button returns.
    pub revert_delay_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            attachment_debounce_ms: 500,
            list_debounce_ms: 1_500,
            initial_scan_ms: 1_000,
            second_scan_ms: 3_000,
            periodic_ms: 10_000,
            navigation_settle_ms: 800,
            revert_delay_ms: crate::state::ERROR_REVERT_DELAY_MS,
        }
    }
}

/// Class attribute values of the nodes added by one observer callback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationBatch {
    pub added_classes: Vec<String>,
}

impl MutationBatch {
    pub fn from_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            added_classes: classes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationClass {
    pub attachments: bool,
    pub list_rows: bool,
}

/// Sorts added nodes into attachment-area and list-row changes by class fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationClassifier {
    pub attachment_fragments: Vec<String>,
    pub list_fragments: Vec<String>,
}

impl Default for MutationClassifier {
    fn default() -> Self {
        Self {
            attachment_fragments: ["aQH", "aZo", "aV3", "brc", "adn", "ii gt", "attachment"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
            list_fragments: ["zA", "xY", "y6", "brd"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
        }
    }
}

impl MutationClassifier {
    pub fn classify(&self, batch: &MutationBatch) -> MutationClass {
        let hits = |fragments: &[String]| {
            batch.added_classes.iter().any(|class| {
                fragments
                    .iter()
                    .any(|fragment| class_matches(class, fragment))
            })
        };
        MutationClass {
            attachments: hits(self.attachment_fragments.as_slice()),
            list_rows: hits(self.list_fragments.as_slice()),
        }
    }
}

/// Single-token fragments must equal one class token; multi-token fragments
/// (`"ii gt"`) match as a substring of the attribute.
fn class_matches(class_attr: &str, fragment: &str) -> bool {
    if fragment.contains(' ') {
        class_attr.contains(fragment)
    } else {
        class_attr.split_whitespace().any(|token| token == fragment)
    }
}

/// Scans that are due now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanPlan {
    pub attachments: bool,
    pub list_view: bool,
    /// The view changed since the last plan; per-page state must be dropped first.
    pub navigated: bool,
}

impl ScanPlan {
    pub fn is_empty(&self) -> bool {
        !self.attachments && !self.list_view && !self.navigated
    }

    fn full(&mut self) {
        self.attachments = true;
        self.list_view = true;
    }
}

/// Debounced rescan timers. Each mutation class owns one single-slot timer:
/// a newer mutation replaces the pending deadline instead of queueing.
#[derive(Debug, Clone)]
pub struct RescanScheduler {
    config: ScheduleConfig,
    classifier: MutationClassifier,
    attachment_due: Option<u64>,
    list_due: Option<u64>,
    startup_due: Vec<u64>,
    periodic_due: u64,
    navigation_due: Option<u64>,
    last_fragment: Option<String>,
}

impl RescanScheduler {
    pub fn new(config: ScheduleConfig, classifier: MutationClassifier, now_ms: u64) -> Self {
        let startup_due = vec![now_ms + config.initial_scan_ms, now_ms + config.second_scan_ms];
        let periodic_due = now_ms + config.periodic_ms;
        Self {
            config,
            classifier,
            attachment_due: None,
            list_due: None,
            startup_due,
            periodic_due,
            navigation_due: None,
            last_fragment: None,
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Records the page URL seen at load time without treating it as navigation.
    pub fn start_at(&mut self, page_url: &str) {
        self.last_fragment = fragment_of(page_url);
    }

    pub fn on_mutations(&mut self, batch: &MutationBatch, now_ms: u64) -> MutationClass {
        let class = self.classifier.classify(batch);
        if class.attachments {
            self.attachment_due = Some(now_ms + self.config.attachment_debounce_ms);
        }
        if class.list_rows {
            self.list_due = Some(now_ms + self.config.list_debounce_ms);
        }
        class
    }

    /// Watches the URL fragment; a change arms the navigation timer.
    pub fn on_location(&mut self, page_url: &str, now_ms: u64) -> bool {
        let fragment = fragment_of(page_url);
        if fragment == self.last_fragment {
            return false;
        }
        self.last_fragment = fragment;
        self.navigation_due = Some(now_ms + self.config.navigation_settle_ms);
        true
    }

    pub fn poll(&mut self, now_ms: u64) -> ScanPlan {
        let mut plan = ScanPlan::default();

        if take_due(&mut self.attachment_due, now_ms) {
            plan.attachments = true;
        }
        if take_due(&mut self.list_due, now_ms) {
            plan.list_view = true;
        }
        if take_due(&mut self.navigation_due, now_ms) {
            plan.navigated = true;
            plan.full();
        }

        let before = self.startup_due.len();
        self.startup_due.retain(|due| *due > now_ms);
        if self.startup_due.len() != before {
            plan.full();
        }

        if self.periodic_due <= now_ms {
            self.periodic_due = now_ms + self.config.periodic_ms;
            plan.full();
        }

        plan
    }

    /// Earliest pending deadline; the periodic timer guarantees one exists.
    pub fn next_deadline(&self) -> u64 {
        [self.attachment_due, self.list_due, self.navigation_due]
            .into_iter()
            .flatten()
            .chain(self.startup_due.iter().copied())
            .fold(self.periodic_due, u64::min)
    }
}

fn take_due(slot: &mut Option<u64>, now_ms: u64) -> bool {
    match *slot {
        Some(due) if due <= now_ms => {
            *slot = None;
            true
        }
        _ => false,
    }
}
