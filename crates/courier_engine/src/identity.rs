use courier_core::{message_id_from_url, normalize_file_name, NodeKey};
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};

use crate::dom::{attr_in_subtree, first_text, node_key, self_and_ancestors};

/// Identity of one attachment on the page: its message and normalized file
/// name. Element paths shift when the host renders content above; this does not.
pub fn attachment_key(email_identity: &str, file_name: &str) -> NodeKey {
    NodeKey::new(format!("{email_identity}/{}", normalize_file_name(file_name)))
}

/// Identity of a list row: a message id attribute inside the row, else its
/// element path.
pub fn list_row_key(row: ElementRef<'_>, id_attributes: &[String]) -> NodeKey {
    match id_attributes.iter().find_map(|name| attr_in_subtree(row, name)) {
        Some(id) => NodeKey::new(format!("row:{}", id.trim_start_matches('#'))),
        None => NodeKey::new(format!("row@{}", node_key(row))),
    }
}

/// Identity of the open message: URL fragment, then a message id attribute on
/// the attachment's ancestors, then the per-pass fallback.
pub fn email_identity(
    page_url: &str,
    container: ElementRef<'_>,
    id_attributes: &[String],
    fallback: &str,
) -> String {
    message_id_from_url(page_url)
        .or_else(|| id_from_ancestors(container, id_attributes))
        .unwrap_or_else(|| fallback.to_string())
}

fn id_from_ancestors(container: ElementRef<'_>, id_attributes: &[String]) -> Option<String> {
    self_and_ancestors(container).find_map(|el| {
        id_attributes.iter().find_map(|name| {
            el.value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| v.trim_start_matches('#').to_string())
        })
    })
}

/// Synthetic identity for messages that expose no id at all.
///
/// Stable for one scan pass only; every attachment found in that pass shares it.
pub fn generated_identity(page_url: &str, now_ms: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page_url.as_bytes());
    hasher.update(now_ms.to_le_bytes());
    let digest = hasher.finalize();
    let short: String = digest[..6].iter().map(|b| format!("{b:02x}")).collect();
    format!("email_{short}")
}

pub fn subject(document: &Html, selectors: &[Selector]) -> Option<String> {
    first_text(document.root_element(), selectors)
}
