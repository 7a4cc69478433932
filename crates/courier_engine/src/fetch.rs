use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("redirect limit exceeded")]
    RedirectLimitExceeded,
    #[error("attachment too large (max {max_bytes}, actual {actual:?})")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// The host answered with something else, typically a sign-in page.
    #[error("not a PDF (content type {content_type:?})")]
    NotPdf { content_type: Option<String> },
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub connect_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            redirect_limit: 5,
            max_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAttachment {
    pub bytes: Vec<u8>,
    pub final_url: String,
    pub content_type: Option<String>,
}

/// Retrieves attachment bytes from a resolved download reference.
#[async_trait::async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedAttachment, FetchError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestAttachmentFetcher {
    settings: FetchSettings,
}

impl ReqwestAttachmentFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, redirect_counter: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        // No overall request timeout: large attachments may take a while.
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(self.settings.connect_timeout_secs))
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::Network(err.to_string()))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::TooLarge {
            max_bytes: self.settings.max_bytes,
            actual: Some(actual),
        }
    }
}

#[async_trait::async_trait]
impl AttachmentFetcher for ReqwestAttachmentFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAttachment, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|err| FetchError::InvalidUrl(err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        if !looks_like_pdf(&bytes, content_type.as_deref()) {
            return Err(FetchError::NotPdf { content_type });
        }

        courier_logging::courier_debug!(
            "fetched {} bytes from {final_url} after {} redirects",
            bytes.len(),
            redirect_counter.load(Ordering::Relaxed)
        );
        Ok(FetchedAttachment {
            bytes,
            final_url,
            content_type,
        })
    }
}

/// Magic bytes win; a PDF content type is accepted for bodies with leading junk.
fn looks_like_pdf(bytes: &[u8], content_type: Option<&str>) -> bool {
    if bytes.starts_with(b"%PDF") {
        return true;
    }
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    essence.as_deref() == Some(crate::session::PDF_MIME_TYPE) && !bytes.is_empty()
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout;
    }
    if err.is_redirect() {
        return FetchError::RedirectLimitExceeded;
    }
    FetchError::Network(err.to_string())
}
