use std::collections::BTreeSet;

use courier_core::{fragment_of, mentions_pdf, message_id_from_fragment, normalize_file_name, truncate_after_pdf};
use courier_logging::{courier_debug, courier_trace};
use scraper::{ElementRef, Html};

use crate::dom::{attr_in_subtree, collapsed_text, node_key, self_and_ancestors};
use crate::download::resolve_download;
use crate::identity::{attachment_key, email_identity, list_row_key, subject};
use crate::inject::{choose_placement, LayoutProbe, Overlay, StyleLayoutProbe};
use crate::selectors::{CompiledProfile, CompiledVariant, HostProfile};
use crate::signals::{classify, extract_file_name};
use crate::types::{AttachmentCandidate, ListChip, OpenMessageScan, ViewMode};

/// Read-only pass over a parsed snapshot. Never touches the overlay; callers
/// claim the returned candidates.
pub struct Scanner {
    profile: CompiledProfile,
    probe: Box<dyn LayoutProbe + Send + Sync>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("variants", &self.profile.variants.len())
            .finish_non_exhaustive()
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(&HostProfile::default())
    }
}

impl Scanner {
    pub fn new(profile: &HostProfile) -> Self {
        Self::with_probe(profile, Box::new(StyleLayoutProbe))
    }

    pub fn with_probe(profile: &HostProfile, probe: Box<dyn LayoutProbe + Send + Sync>) -> Self {
        Self {
            profile: CompiledProfile::compile(profile),
            probe,
        }
    }

    /// Open message when a detail container is present and either the URL
    /// points at a message or no list rows are on screen.
    pub fn view_mode(&self, document: &Html, page_url: &str) -> ViewMode {
        let has_detail = self
            .profile
            .message_detail
            .iter()
            .any(|sel| document.select(sel).next().is_some());
        if !has_detail {
            return ViewMode::ListView;
        }
        let message_shaped = fragment_of(page_url)
            .and_then(|fragment| message_id_from_fragment(&fragment))
            .is_some();
        let has_rows = self
            .profile
            .list_rows
            .iter()
            .any(|sel| document.select(sel).next().is_some());
        if message_shaped || !has_rows {
            ViewMode::OpenMessage
        } else {
            ViewMode::ListView
        }
    }

    pub fn scan_open_message(
        &self,
        document: &Html,
        page_url: &str,
        overlay: &Overlay,
        fallback_identity: &str,
    ) -> OpenMessageScan {
        let mut scan = OpenMessageScan::default();
        let Some((variant, items)) = self.matching_variant(document) else {
            courier_trace!("no attachment layout matched");
            return scan;
        };
        let subject = subject(document, &self.profile.subject);
        let mut seen_paths = BTreeSet::new();
        let mut seen_names = BTreeSet::new();

        for item in items {
            let path = node_key(item);
            if !seen_paths.insert(path.clone()) {
                continue;
            }
            let classification = classify(item, &variant.name_selectors);
            if !classification.is_pdf {
                courier_trace!("{path}: not a pdf");
                continue;
            }
            let file_name = extract_file_name(item, &variant.name_selectors);
            let email_identity = email_identity(
                page_url,
                item,
                &self.profile.email_id_attributes,
                fallback_identity,
            );
            let key = attachment_key(&email_identity, &file_name);
            let placement = choose_placement(item, &self.profile, self.probe.as_ref());
            if overlay.is_processed(&key) {
                seen_names.insert(normalize_file_name(&file_name));
                if overlay.node(&key).is_some_and(|node| node.placement != placement) {
                    scan.moved.push((key, placement));
                }
                continue;
            }
            if overlay.has_rendered(&file_name) || !seen_names.insert(normalize_file_name(&file_name)) {
                courier_trace!("{path}: {file_name} already handled on this page");
                continue;
            }
            let download_ref = resolve_download(item, page_url, &self.profile);
            if download_ref.is_none() {
                courier_debug!("{path}: no download reference for {file_name}");
            }
            scan.candidates.push(AttachmentCandidate {
                key,
                container: path,
                email_identity,
                placement,
                file_name,
                is_pdf: true,
                subject: subject.clone(),
                download_ref,
                variant: variant.name.clone(),
            });
        }
        scan
    }

    /// PDF chips shown in list rows that carry no affordance yet.
    pub fn scan_list_view(&self, document: &Html, overlay: &Overlay) -> Vec<ListChip> {
        let mut chips = Vec::new();
        for row_sel in &self.profile.list_rows {
            for row in document.select(row_sel) {
                let row_key = list_row_key(row, &self.profile.email_id_attributes);
                if overlay.is_processed(&row_key) {
                    continue;
                }
                for chip_sel in &self.profile.list_chips {
                    for chip in row.select(chip_sel) {
                        if let Some(file_name) = chip_file_name(chip) {
                            chips.push(ListChip {
                                row: row_key.clone(),
                                row_path: node_key(row),
                                file_name,
                            });
                        }
                    }
                }
            }
        }
        chips
    }

    /// First variant with at least one item inside a message detail container.
    fn matching_variant<'d>(
        &self,
        document: &'d Html,
    ) -> Option<(&CompiledVariant, Vec<ElementRef<'d>>)> {
        self.profile.variants.iter().find_map(|variant| {
            let items: Vec<_> = document
                .select(&variant.container)
                .flat_map(|container| container.select(&variant.item))
                .filter(|item| self.inside_message(*item))
                .collect();
            if items.is_empty() {
                None
            } else {
                courier_trace!("attachment layout {:?}: {} items", variant.name, items.len());
                Some((variant, items))
            }
        })
    }

    fn inside_message(&self, item: ElementRef<'_>) -> bool {
        self_and_ancestors(item).any(|el| self.profile.message_detail.iter().any(|sel| sel.matches(&el)))
    }
}

fn chip_file_name(chip: ElementRef<'_>) -> Option<String> {
    ["title", "data-tooltip", "aria-label"]
        .iter()
        .filter_map(|name| attr_in_subtree(chip, name))
        .chain(std::iter::once(collapsed_text(chip)))
        .find(|raw| mentions_pdf(raw))
        .and_then(|raw| truncate_after_pdf(raw.trim()).map(|name| name.trim().to_string()))
}
