//! Lookup tables describing the host webmail DOM.
//!
//! The host UI is unversioned and ships several DOM variants at once, so every
//! entry is an ordered list of alternatives. Entries are plain data so they can
//! be overridden from the application config and covered by fixtures.

use scraper::Selector;
use serde::{Deserialize, Serialize};

/// One known layout of the attachment strip inside an opened message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentVariant {
    pub name: String,
    pub container: String,
    pub item: String,
    /// Elements inside an item that show the file name.
    pub name_selectors: Vec<String>,
}

impl AttachmentVariant {
    fn new(name: &str, container: &str, item: &str, name_selectors: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            container: container.to_string(),
            item: item.to_string(),
            name_selectors: owned(name_selectors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostProfile {
    /// Any match means an opened message is on screen.
    pub message_detail: Vec<String>,
    /// Tried in order; the first variant whose container and items match wins.
    pub attachment_variants: Vec<AttachmentVariant>,
    pub subject: Vec<String>,
    /// Ancestor attributes that carry a message id.
    pub email_id_attributes: Vec<String>,
    pub list_rows: Vec<String>,
    /// Attachment chips shown inside list rows.
    pub list_chips: Vec<String>,
    /// Where an affordance is inserted, relative to the attachment item.
    pub injection_targets: Vec<String>,
    /// URL fragments of the host's attachment download endpoints.
    pub remote_asset_patterns: Vec<String>,
    /// Last-resort attributes that may hold a download URL.
    pub data_url_attributes: Vec<String>,
}

impl Default for HostProfile {
    fn default() -> Self {
        Self {
            message_detail: owned(&[".adn", "[data-message-id]", ".h7", "div.a3s"]),
            attachment_variants: vec![
                AttachmentVariant::new("strip", "div.aQH", "span.aZo", &["span.aV3", "div.aV3"]),
                AttachmentVariant::new("card", "div.hq", "div.aQy", &[".aQA span", ".aQA"]),
                AttachmentVariant::new(
                    "aria-list",
                    "[role='list'][aria-label*='ttachment']",
                    "[role='listitem']",
                    &["[class*='filename']", "[class*='file-name']"],
                ),
                AttachmentVariant::new("legacy-table", "table.cf.hr", "td.hu", &["b", "span.file"]),
            ],
            subject: owned(&["h2.hP", "h2[data-thread-perm-id]", "[data-legacy-thread-id]"]),
            email_id_attributes: owned(&["data-legacy-message-id", "data-message-id"]),
            list_rows: owned(&["tr.zA"]),
            list_chips: owned(&["div.brc [title]", "span.aZ1[title]", "[data-tooltip].brg"]),
            injection_targets: owned(&["div.aQw", "div.aSK", "div.aQp"]),
            remote_asset_patterns: owned(&[
                "mail-attachment.googleusercontent.com",
                "view=att",
                "attid=",
                "disp=safe",
            ]),
            data_url_attributes: owned(&["data-url", "data-download-url", "data-src"]),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledVariant {
    pub(crate) name: String,
    pub(crate) container: Selector,
    pub(crate) item: Selector,
    pub(crate) name_selectors: Vec<Selector>,
}

/// [`HostProfile`] with every selector parsed once. Entries that fail to parse
/// are dropped with a warning instead of failing the whole table.
#[derive(Debug, Clone)]
pub(crate) struct CompiledProfile {
    pub(crate) message_detail: Vec<Selector>,
    pub(crate) variants: Vec<CompiledVariant>,
    pub(crate) subject: Vec<Selector>,
    pub(crate) list_rows: Vec<Selector>,
    pub(crate) list_chips: Vec<Selector>,
    pub(crate) injection_targets: Vec<(String, Selector)>,
    pub(crate) email_id_attributes: Vec<String>,
    pub(crate) remote_asset_patterns: Vec<String>,
    pub(crate) data_url_attributes: Vec<String>,
}

impl CompiledProfile {
    pub(crate) fn compile(profile: &HostProfile) -> Self {
        let variants = profile
            .attachment_variants
            .iter()
            .filter_map(|variant| {
                Some(CompiledVariant {
                    name: variant.name.clone(),
                    container: parse(&variant.container)?,
                    item: parse(&variant.item)?,
                    name_selectors: parse_all(&variant.name_selectors),
                })
            })
            .collect();
        Self {
            message_detail: parse_all(&profile.message_detail),
            variants,
            subject: parse_all(&profile.subject),
            list_rows: parse_all(&profile.list_rows),
            list_chips: parse_all(&profile.list_chips),
            injection_targets: profile
                .injection_targets
                .iter()
                .filter_map(|raw| parse(raw).map(|sel| (raw.clone(), sel)))
                .collect(),
            email_id_attributes: profile.email_id_attributes.clone(),
            remote_asset_patterns: profile.remote_asset_patterns.clone(),
            data_url_attributes: profile.data_url_attributes.clone(),
        }
    }
}

pub(crate) fn parse(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(err) => {
            courier_logging::courier_warn!("ignoring invalid selector {raw:?}: {err:?}");
            None
        }
    }
}

fn parse_all(raw: &[String]) -> Vec<Selector> {
    raw.iter().filter_map(|s| parse(s)).collect()
}
