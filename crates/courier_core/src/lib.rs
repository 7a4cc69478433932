//! Courier core: pure attachment state machine, reconciliation and rescan timing.
mod affordance;
mod effect;
mod history;
mod location;
mod msg;
mod normalize;
mod reconcile;
mod scheduler;
mod state;
mod update;
mod view_model;

pub use affordance::{AffordanceState, NodeKey, UploadFailure};
pub use effect::{Effect, UploadJob};
pub use history::{KnownRemoteFileSet, TransferHistory, TransferRecord};
pub use location::{fragment_of, message_id_from_fragment, message_id_from_url};
pub use msg::{CandidateInfo, Msg};
pub use normalize::{mentions_pdf, normalize_file_name, truncate_after_pdf};
pub use reconcile::{decide, is_in_remote_set, status_for, RenderDecision, StatusSnapshot};
pub use scheduler::{
    Clock, ManualClock, MutationBatch, MutationClass, MutationClassifier, RescanScheduler,
    ScanPlan, ScheduleConfig,
};
pub use state::{PageState, ERROR_REVERT_DELAY_MS};
pub use update::update;
pub use view_model::{transfer_stats, AffordanceRow, PageViewModel, TransferStats};
