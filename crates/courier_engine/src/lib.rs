//! Courier engine: snapshot scanning, injection overlay, storage, backend IO
//! and the page session runtime.
mod backend;
mod decode;
mod dispatch;
mod dom;
mod download;
mod fetch;
mod identity;
mod inject;
mod messages;
mod observe;
mod persist;
mod scan;
mod selectors;
mod session;
mod signals;
mod store;
mod transport;
mod types;

pub use backend::{
    BackendError, Credentials, FileEntity, LedgerBackend, ReqwestBackend, TransactionDto,
    TransactionFilter, DEFAULT_API_BASE_URL,
};
pub use decode::{decode_snapshot, DecodeError, DecodedSnapshot};
pub use dispatch::{utc_timestamp, Dispatcher, Timestamp};
pub use dom::node_key;
pub use download::{DownloadStep, DOWNLOAD_CASCADE};
pub use fetch::{AttachmentFetcher, FetchError, FetchSettings, FetchedAttachment, ReqwestAttachmentFetcher};
pub use identity::{attachment_key, generated_identity, list_row_key};
pub use inject::{
    AffordanceKind, InjectedNode, LayoutProbe, Overlay, Placement, RenderOutcome,
    StyleLayoutProbe, EMAIL_ATTRIBUTE, FILE_ATTRIBUTE,
};
pub use messages::{ErrorCode, Request, Response};
pub use observe::mutation_batch_between;
pub use persist::{ensure_store_dir, AtomicFileWriter, PersistError};
pub use scan::Scanner;
pub use selectors::{AttachmentVariant, HostProfile};
pub use session::{PageSession, Prompt, ScanReport, SystemClock, PDF_MIME_TYPE};
pub use signals::{
    classify, extract_file_name, Classification, Signal, CLASSIFICATION_CASCADE, NAME_CASCADE,
    PLACEHOLDER_FILE_NAME,
};
pub use store::{
    FileStore, KeyValueStore, MemoryStore, Settings, Storage, StoreError, Values, API_BASE_URL_KEY,
    API_TOKEN_KEY, KNOWN_REMOTE_FILES_KEY, LAST_REMOTE_SYNC_KEY, ORGANIZATION_ID_KEY,
    TRANSFER_HISTORY_KEY,
};
pub use transport::{InProcessTransport, MessageTransport, TransportError, CONTEXT_INVALIDATED_TEXT};
pub use types::{AttachmentCandidate, ListChip, OpenMessageScan, PageSnapshot, ViewMode};
