//! Page-side runtime: wires the scanner, the pure state machine, the overlay
//! and the message channel together for one tab.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use courier_core::{
    update, Clock, Effect, KnownRemoteFileSet, MutationBatch, MutationClassifier, Msg, NodeKey,
    PageState, PageViewModel, RescanScheduler, ScanPlan, ScheduleConfig, StatusSnapshot,
    UploadFailure, UploadJob,
};
use courier_logging::{courier_debug, courier_info, courier_trace, courier_warn, next_scan_pass};
use futures_util::future::{join, join_all};

use crate::fetch::AttachmentFetcher;
use crate::identity::generated_identity;
use crate::inject::{AffordanceKind, InjectedNode, Overlay, Placement};
use crate::messages::{ErrorCode, Request, Response};
use crate::scan::Scanner;
use crate::transport::{MessageTransport, TransportError};
use crate::types::{AttachmentCandidate, PageSnapshot, ViewMode};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Wall clock measured from session creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Configure,
    Reload,
}

/// What one scan pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub pass: u64,
    pub view_mode: Option<ViewMode>,
    /// Newly claimed attachments.
    pub candidates: usize,
    /// Rendered attachments whose host node moved.
    pub relocated: usize,
    pub list_badges: usize,
}

pub struct PageSession<C: Clock> {
    clock: C,
    scanner: Scanner,
    scheduler: RescanScheduler,
    transport: Arc<dyn MessageTransport>,
    fetcher: Arc<dyn AttachmentFetcher>,
    state: PageState,
    overlay: Overlay,
    candidates: BTreeMap<NodeKey, AttachmentCandidate>,
    reverts: Vec<(u64, NodeKey)>,
    prompts: Vec<Prompt>,
    remote: KnownRemoteFileSet,
    snapshot: Option<PageSnapshot>,
    reports: Vec<ScanReport>,
}

impl<C: Clock> PageSession<C> {
    pub fn new(
        clock: C,
        transport: Arc<dyn MessageTransport>,
        fetcher: Arc<dyn AttachmentFetcher>,
    ) -> Self {
        let scheduler = RescanScheduler::new(
            ScheduleConfig::default(),
            MutationClassifier::default(),
            clock.now_ms(),
        );
        Self {
            clock,
            scanner: Scanner::default(),
            scheduler,
            transport,
            fetcher,
            state: PageState::new(),
            overlay: Overlay::new(),
            candidates: BTreeMap::new(),
            reverts: Vec::new(),
            prompts: Vec::new(),
            remote: KnownRemoteFileSet::new(),
            snapshot: None,
            reports: Vec::new(),
        }
    }

    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_schedule(mut self, config: ScheduleConfig, classifier: MutationClassifier) -> Self {
        self.state = PageState::with_revert_delay(config.revert_delay_ms);
        self.scheduler = RescanScheduler::new(config, classifier, self.clock.now_ms());
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn view(&self) -> PageViewModel {
        self.state.view()
    }

    pub fn remote_files(&self) -> &KnownRemoteFileSet {
        &self.remote
    }

    pub fn take_prompts(&mut self) -> Vec<Prompt> {
        std::mem::take(&mut self.prompts)
    }

    pub fn reports(&self) -> &[ScanReport] {
        &self.reports
    }

    /// Earliest time anything is due: a scan timer or an error revert.
    pub fn next_deadline(&self) -> u64 {
        self.reverts
            .iter()
            .map(|(due, _)| *due)
            .fold(self.scheduler.next_deadline(), u64::min)
    }

    /// Page load: remember the snapshot and refresh the remote file cache.
    pub async fn start(&mut self, snapshot: PageSnapshot) {
        self.scheduler.start_at(&snapshot.url);
        self.snapshot = Some(snapshot);
        self.refresh_remote_files().await;
    }

    async fn refresh_remote_files(&mut self) {
        let response = match self.transport.send(Request::SyncRemoteFiles).await {
            Ok(Response::RemoteFiles { names, last_sync }) => {
                self.remote = KnownRemoteFileSet::from_names(names, last_sync);
                courier_info!("remote sync: {} known file names", self.remote.len());
                return;
            }
            Ok(other) => other,
            Err(err) => {
                courier_warn!("remote sync unavailable: {err}");
                return;
            }
        };
        courier_debug!("remote sync skipped: {response:?}");
        if let Ok(Response::RemoteFiles { names, last_sync }) =
            self.transport.send(Request::GetCachedRemoteFiles).await
        {
            self.remote = KnownRemoteFileSet::from_names(names, last_sync);
        }
    }

    pub fn on_mutations(&mut self, batch: &MutationBatch) {
        let class = self.scheduler.on_mutations(batch, self.clock.now_ms());
        courier_trace!("mutations classified as {class:?}");
    }

    /// Advances timers against the latest snapshot and runs whatever is due.
    pub async fn tick(&mut self, snapshot: Option<PageSnapshot>) -> Option<ScanReport> {
        let now = self.clock.now_ms();
        if let Some(snapshot) = snapshot {
            if self.scheduler.on_location(&snapshot.url, now) {
                courier_info!("navigated to {}", snapshot.url);
                self.page_changed().await;
            }
            self.snapshot = Some(snapshot);
        }

        let due: Vec<Msg> = self.take_due_reverts(now);
        if !due.is_empty() {
            self.apply(due).await;
        }

        let plan = self.scheduler.poll(now);
        if plan.is_empty() {
            return None;
        }
        Some(self.run_scans(plan).await)
    }

    fn take_due_reverts(&mut self, now: u64) -> Vec<Msg> {
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.reverts)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.reverts = pending;
        due.into_iter()
            .map(|(_, key)| Msg::RevertElapsed { key })
            .collect()
    }

    async fn page_changed(&mut self) {
        self.overlay.clear();
        self.candidates.clear();
        self.reverts.clear();
        self.apply(vec![Msg::PageChanged]).await;
    }

    pub async fn run_scans(&mut self, plan: ScanPlan) -> ScanReport {
        let pass = next_scan_pass();
        let mut report = ScanReport {
            pass,
            ..ScanReport::default()
        };
        let Some(snapshot) = self.snapshot.clone() else {
            courier_debug!("no snapshot yet; scan skipped");
            return report;
        };
        let document = snapshot.parse();
        let mode = self.scanner.view_mode(&document, &snapshot.url);
        report.view_mode = Some(mode);

        if plan.attachments && mode == ViewMode::OpenMessage {
            let fallback = generated_identity(&snapshot.url, self.clock.now_ms());
            let scan = self
                .scanner
                .scan_open_message(&document, &snapshot.url, &self.overlay, &fallback);
            for (key, placement) in scan.moved {
                if let Some(candidate) = self.candidates.get_mut(&key) {
                    candidate.placement = placement.clone();
                }
                if self.overlay.relocate(&key, placement) {
                    courier_debug!("{key}: host node moved");
                    report.relocated += 1;
                }
            }
            let mut msgs = Vec::with_capacity(scan.candidates.len());
            for candidate in scan.candidates {
                if !self.overlay.claim(&candidate.key) {
                    continue;
                }
                courier_debug!(
                    "candidate {} at {} ({})",
                    candidate.file_name,
                    candidate.container,
                    candidate.variant
                );
                report.candidates += 1;
                msgs.push(Msg::CandidateFound(candidate.info()));
                self.candidates.insert(candidate.key.clone(), candidate);
            }
            self.apply(msgs).await;
        }

        if plan.list_view && mode == ViewMode::ListView {
            for chip in self.scanner.scan_list_view(&document, &self.overlay) {
                if !self.remote.contains(&chip.file_name) || self.overlay.is_processed(&chip.row) {
                    continue;
                }
                self.overlay.render(InjectedNode {
                    host: chip.row.clone(),
                    file_name: chip.file_name,
                    email_identity: String::new(),
                    kind: AffordanceKind::ListBadge,
                    placement: Placement::Inside {
                        target: chip.row_path,
                        selector: "list-row".to_string(),
                    },
                });
                report.list_badges += 1;
            }
        }

        courier_debug!(
            "scan done: {} candidates, {} list badges",
            report.candidates,
            report.list_badges
        );
        self.reports.push(report.clone());
        report
    }

    /// User clicked the affordance on `key`.
    pub async fn click(&mut self, key: &NodeKey) {
        self.apply(vec![Msg::UploadClicked { key: key.clone() }]).await;
    }

    /// Clicks the affordance showing `file_name`, if any.
    pub async fn click_file(&mut self, file_name: &str) -> bool {
        let key = self
            .candidates
            .values()
            .find(|c| c.file_name == file_name)
            .map(|c| c.key.clone());
        match key {
            Some(key) => {
                self.click(&key).await;
                true
            }
            None => false,
        }
    }

    /// Feeds messages through `update` until no effect produces new ones.
    /// Status checks raised in one round run concurrently.
    async fn apply(&mut self, msgs: Vec<Msg>) {
        let mut queue: VecDeque<Msg> = msgs.into();
        while !queue.is_empty() {
            let mut checks = Vec::new();
            let mut uploads = Vec::new();
            while let Some(msg) = queue.pop_front() {
                let (state, effects) = update(std::mem::take(&mut self.state), msg);
                self.state = state;
                for effect in effects {
                    match effect {
                        Effect::CheckStatus {
                            key,
                            email_identity,
                            file_name,
                        } => checks.push((key, email_identity, file_name)),
                        Effect::Render { key, state } => {
                            if let Some(kind) = AffordanceKind::for_state(&state) {
                                self.render(&key, kind);
                            }
                        }
                        Effect::StartUpload(job) => uploads.push(job),
                        Effect::ScheduleRevert { key, delay_ms } => {
                            self.reverts.push((self.clock.now_ms() + delay_ms, key));
                        }
                        Effect::PromptConfigure => self.prompts.push(Prompt::Configure),
                        Effect::PromptReload => self.prompts.push(Prompt::Reload),
                    }
                }
            }

            let transport = self.transport.as_ref();
            let resolved = join_all(checks.into_iter().map(|(key, email, file)| async move {
                let outcome = check_status(transport, &email, &file).await;
                Msg::StatusResolved { key, outcome }
            }))
            .await;
            queue.extend(resolved);

            for job in uploads {
                let result = self.upload(&job).await;
                queue.push_back(Msg::UploadFinished {
                    key: job.key,
                    result,
                });
            }
        }
        self.state.consume_dirty();
    }

    fn render(&mut self, key: &NodeKey, kind: AffordanceKind) {
        let Some(candidate) = self.candidates.get(key) else {
            courier_warn!("render for unknown node {key}");
            return;
        };
        let outcome = self.overlay.render(InjectedNode {
            host: key.clone(),
            file_name: candidate.file_name.clone(),
            email_identity: candidate.email_identity.clone(),
            kind,
            placement: candidate.placement.clone(),
        });
        courier_trace!("{key}: {outcome:?}");
    }

    async fn upload(&mut self, job: &UploadJob) -> Result<String, UploadFailure> {
        match self.transport.send(Request::GetSettings).await {
            Ok(Response::Settings { settings }) if settings.is_configured() => {}
            Ok(Response::Settings { .. }) => return Err(UploadFailure::NotConfigured),
            Ok(other) => {
                courier_warn!("unexpected settings response {other:?}");
                return Err(UploadFailure::NotConfigured);
            }
            Err(err) => return Err(transport_failure(err)),
        }

        let fetched = self
            .fetcher
            .fetch(&job.download_ref)
            .await
            .map_err(|err| UploadFailure::UploadFailed(err.to_string()))?;
        courier_debug!("{}: {} bytes fetched", job.file_name, fetched.bytes.len());

        let request = Request::UploadAttachment {
            email_id: job.email_identity.clone(),
            file_name: job.file_name.clone(),
            subject: job.subject.clone(),
            mime_type: PDF_MIME_TYPE.to_string(),
            file_data: fetched.bytes,
        };
        match self.transport.send(request).await {
            Ok(Response::Uploaded { file_id }) => {
                self.remote.insert(&job.file_name);
                Ok(file_id)
            }
            Ok(Response::Failed {
                code: ErrorCode::NotConfigured,
                ..
            }) => Err(UploadFailure::NotConfigured),
            Ok(Response::Failed { error, .. }) => Err(UploadFailure::UploadFailed(error)),
            Ok(other) => Err(UploadFailure::UploadFailed(format!("unexpected response {other:?}"))),
            Err(err) => Err(transport_failure(err)),
        }
    }
}

fn transport_failure(err: TransportError) -> UploadFailure {
    if err.is_context_invalidated() {
        UploadFailure::ContextInvalidated
    } else {
        UploadFailure::UploadFailed(err.to_string())
    }
}

/// Asks for the id and the name status concurrently; any failure fails the check.
async fn check_status(
    transport: &dyn MessageTransport,
    email_identity: &str,
    file_name: &str,
) -> Result<StatusSnapshot, String> {
    let (by_id, by_name) = join(
        transport.send(Request::CheckStatusById {
            email_id: email_identity.to_string(),
        }),
        transport.send(Request::CheckStatusByFilename {
            file_name: file_name.to_string(),
        }),
    )
    .await;
    let transferred_by_id = match by_id.map_err(|err| err.to_string())? {
        Response::TransferStatus { transferred, .. } => transferred,
        other => return Err(format!("unexpected response {other:?}")),
    };
    let known_by_name = match by_name.map_err(|err| err.to_string())? {
        Response::FileStatus { known } => known,
        other => return Err(format!("unexpected response {other:?}")),
    };
    Ok(StatusSnapshot {
        transferred_by_id,
        known_by_name,
    })
}
