//! PDF classification and file-name extraction for one attachment item.
//!
//! Each [`Signal`] is a pure reader over the item's markup. The cascades below
//! are ordered data: classification accepts the first signal that indicates a
//! PDF, name extraction takes the first signal that yields a `.pdf` name.

use courier_core::{mentions_pdf, truncate_after_pdf};
use scraper::{ElementRef, Selector};

use crate::dom::{attr_in_subtree, collapsed_text, first_text};

/// Name used when an item is a PDF but no signal spells out its file name.
pub const PLACEHOLDER_FILE_NAME: &str = "attachment.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    DisplayName,
    Tooltip,
    Title,
    AriaLabel,
    TextContent,
    /// `download_url="<mime>:<name>:<url>"` attribute.
    DownloadMeta,
    /// File-type icon; says "PDF" but never names the file.
    Icon,
}

pub const CLASSIFICATION_CASCADE: &[Signal] = &[
    Signal::DisplayName,
    Signal::Tooltip,
    Signal::Title,
    Signal::AriaLabel,
    Signal::TextContent,
    Signal::DownloadMeta,
    Signal::Icon,
];

pub const NAME_CASCADE: &[Signal] = &[
    Signal::DisplayName,
    Signal::Tooltip,
    Signal::Title,
    Signal::AriaLabel,
    Signal::TextContent,
    Signal::DownloadMeta,
];

/// Wording hosts put in front of the file name in labels.
const LABEL_PREFIXES: &[&str] = &[
    "download attachment",
    "preview attachment",
    "attachment:",
    "attachment",
    "download",
    "anhang:",
    "anhang",
];

impl Signal {
    /// Raw value of the signal, if the item carries it.
    pub fn read(self, item: ElementRef<'_>, name_selectors: &[Selector]) -> Option<String> {
        match self {
            Signal::DisplayName => first_text(item, name_selectors),
            Signal::Tooltip => attr_in_subtree(item, "data-tooltip"),
            Signal::Title => attr_in_subtree(item, "title"),
            Signal::AriaLabel => attr_in_subtree(item, "aria-label"),
            Signal::TextContent => text_content(item),
            Signal::DownloadMeta => attr_in_subtree(item, "download_url"),
            Signal::Icon => icon_hint(item),
        }
    }

    pub fn indicates_pdf(self, raw: &str) -> bool {
        match self {
            Signal::DownloadMeta => raw.to_ascii_lowercase().starts_with("application/pdf:"),
            Signal::Icon => raw.to_ascii_lowercase().contains("pdf"),
            _ => mentions_pdf(raw),
        }
    }

    pub fn file_name(self, raw: &str) -> Option<String> {
        let candidate = match self {
            Signal::DownloadMeta => raw.splitn(3, ':').nth(1)?.to_string(),
            Signal::AriaLabel | Signal::TextContent => strip_label_prefix(raw).to_string(),
            Signal::Icon => return None,
            _ => raw.to_string(),
        };
        let name = truncate_after_pdf(candidate.trim())?.trim();
        (name.len() > ".pdf".len()).then(|| name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_pdf: bool,
    pub matched_by: Option<Signal>,
}

pub fn classify(item: ElementRef<'_>, name_selectors: &[Selector]) -> Classification {
    let matched_by = CLASSIFICATION_CASCADE.iter().copied().find(|signal| {
        signal
            .read(item, name_selectors)
            .is_some_and(|raw| signal.indicates_pdf(&raw))
    });
    Classification {
        is_pdf: matched_by.is_some(),
        matched_by,
    }
}

/// Best-effort file name; never fails.
pub fn extract_file_name(item: ElementRef<'_>, name_selectors: &[Selector]) -> String {
    NAME_CASCADE
        .iter()
        .find_map(|signal| {
            signal
                .read(item, name_selectors)
                .and_then(|raw| signal.file_name(&raw))
        })
        .unwrap_or_else(|| PLACEHOLDER_FILE_NAME.to_string())
}

/// The first text node that mentions a PDF, else the whole collapsed text.
fn text_content(item: ElementRef<'_>) -> Option<String> {
    let pdf_line = item
        .text()
        .map(str::trim)
        .find(|text| mentions_pdf(text))
        .map(ToOwned::to_owned);
    pdf_line
        .or_else(|| Some(collapsed_text(item)))
        .filter(|text| !text.is_empty())
}

fn icon_hint(item: ElementRef<'_>) -> Option<String> {
    item.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "img")
        .find_map(|img| {
            let src = img.value().attr("src").unwrap_or_default();
            let alt = img.value().attr("alt").unwrap_or_default();
            let hint = format!("{src} {alt}");
            hint.to_ascii_lowercase().contains("pdf").then_some(hint)
        })
}

fn strip_label_prefix(raw: &str) -> &str {
    let mut rest = raw.trim();
    loop {
        let lower = rest.to_ascii_lowercase();
        // A prefix only counts as a whole word, so "downloads.pdf" survives.
        let Some(prefix) = LABEL_PREFIXES.iter().find(|p| {
            lower
                .strip_prefix(**p)
                .is_some_and(|tail| p.ends_with(':') || tail.starts_with([' ', ':', '-']))
        }) else {
            return rest;
        };
        // ASCII lowercasing keeps byte offsets, so the prefix length indexes `rest`.
        rest = rest[prefix.len()..].trim_start_matches([' ', ':', '-']).trim();
    }
}

#[cfg(test)]
mod tests {
    use super::{strip_label_prefix, Signal};

    #[test]
    fn label_prefixes_are_stripped_repeatedly() {
        assert_eq!(strip_label_prefix("Download attachment Invoice 2024.pdf"), "Invoice 2024.pdf");
        assert_eq!(strip_label_prefix("Attachment: scan.PDF"), "scan.PDF");
        assert_eq!(strip_label_prefix("report.pdf"), "report.pdf");
    }

    #[test]
    fn download_meta_names_the_file() {
        let raw = "application/pdf:Invoice.pdf:https://mail.example.com/?view=att&attid=0.1";
        assert!(Signal::DownloadMeta.indicates_pdf(raw));
        assert_eq!(Signal::DownloadMeta.file_name(raw).as_deref(), Some("Invoice.pdf"));
        assert!(!Signal::DownloadMeta.indicates_pdf("image/png:a.png:https://x"));
    }

    #[test]
    fn bare_extension_is_not_a_name() {
        assert_eq!(Signal::Title.file_name(".pdf"), None);
        assert_eq!(Signal::Title.file_name("  Invoice.pdf (84 KB)").as_deref(), Some("Invoice.pdf"));
    }
}
