use crate::effect::UploadJob;
use crate::reconcile::{decide, RenderDecision};
use crate::{AffordanceState, Effect, Msg, NodeKey, PageState, UploadFailure};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: PageState, msg: Msg) -> (PageState, Vec<Effect>) {
    let effects = match msg {
        Msg::CandidateFound(info) => {
            // Re-announcing a tracked node is a no-op; rescans rely on this.
            if state.contains(&info.key) {
                return (state, Vec::new());
            }
            let effect = Effect::CheckStatus {
                key: info.key.clone(),
                email_identity: info.email_identity.clone(),
                file_name: info.file_name.clone(),
            };
            state.insert(info);
            vec![effect]
        }
        Msg::StatusResolved { key, outcome } => {
            if state.state_of(&key) != Some(&AffordanceState::Checking) {
                return (state, Vec::new());
            }
            let next = match decide(outcome) {
                RenderDecision::Badge => AffordanceState::Badge,
                RenderDecision::Button => AffordanceState::Button,
            };
            transition(&mut state, key, next)
        }
        Msg::UploadClicked { key } => {
            let Some(entry) = state.entry(&key) else {
                return (state, Vec::new());
            };
            if !entry.state.accepts_click() {
                return (state, Vec::new());
            }
            match entry.info.download_ref.clone() {
                Some(download_ref) => {
                    let job = UploadJob {
                        key: key.clone(),
                        file_name: entry.info.file_name.clone(),
                        email_identity: entry.info.email_identity.clone(),
                        subject: entry.info.subject.clone(),
                        download_ref,
                    };
                    let mut effects = transition(&mut state, key, AffordanceState::Uploading);
                    effects.push(Effect::StartUpload(job));
                    effects
                }
                None => fail(&mut state, key, UploadFailure::DownloadReferenceNotFound),
            }
        }
        Msg::UploadFinished { key, result } => {
            if state.state_of(&key) != Some(&AffordanceState::Uploading) {
                return (state, Vec::new());
            }
            match result {
                Ok(_file_id) => transition(&mut state, key, AffordanceState::Badge),
                Err(failure) => fail(&mut state, key, failure),
            }
        }
        Msg::RevertElapsed { key } => match state.state_of(&key) {
            Some(AffordanceState::Error(failure)) if failure.auto_reverts() => {
                transition(&mut state, key, AffordanceState::Button)
            }
            _ => Vec::new(),
        },
        Msg::PageChanged => {
            state.clear();
            Vec::new()
        }
    };

    (state, effects)
}

fn transition(state: &mut PageState, key: NodeKey, next: AffordanceState) -> Vec<Effect> {
    state.set_state(&key, next.clone());
    vec![Effect::Render { key, state: next }]
}

fn fail(state: &mut PageState, key: NodeKey, failure: UploadFailure) -> Vec<Effect> {
    let delay_ms = state.revert_delay_ms();
    let mut effects = transition(state, key.clone(), AffordanceState::Error(failure.clone()));
    match failure {
        UploadFailure::ContextInvalidated => effects.push(Effect::PromptReload),
        UploadFailure::NotConfigured => effects.push(Effect::PromptConfigure),
        UploadFailure::DownloadReferenceNotFound | UploadFailure::UploadFailed(_) => {}
    }
    if failure.auto_reverts() {
        effects.push(Effect::ScheduleRevert { key, delay_ms });
    }
    effects
}
