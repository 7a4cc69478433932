//! Injected affordances, kept in an overlay keyed by attachment identity.
//!
//! Host nodes are never annotated. The overlay records which nodes were
//! processed during the current page and which affordance sits on each, so
//! repeated scans of the same markup stay idempotent.

use std::collections::{BTreeMap, BTreeSet};

use courier_core::{normalize_file_name, AffordanceState, NodeKey};
use scraper::ElementRef;

use crate::dom::{node_key, self_and_ancestors};
use crate::selectors::CompiledProfile;

pub const FILE_ATTRIBUTE: &str = "data-courier-file";
pub const EMAIL_ATTRIBUTE: &str = "data-courier-email";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffordanceKind {
    UploadButton,
    SentBadge,
    Uploading,
    ErrorBadge(String),
    /// Compact marker on a list-view row.
    ListBadge,
}

impl AffordanceKind {
    /// `None` while the status is still being checked.
    pub fn for_state(state: &AffordanceState) -> Option<Self> {
        match state {
            AffordanceState::Checking => None,
            AffordanceState::Button => Some(Self::UploadButton),
            AffordanceState::Badge => Some(Self::SentBadge),
            AffordanceState::Uploading => Some(Self::Uploading),
            AffordanceState::Error(failure) => Some(Self::ErrorBadge(failure.to_string())),
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
            AffordanceKind::UploadButton => "courier-upload",
            AffordanceKind::SentBadge => "courier-sent",
            AffordanceKind::Uploading => "courier-uploading",
            AffordanceKind::ErrorBadge(_) => "courier-error",
            AffordanceKind::ListBadge => "courier-list-badge",
        }
    }

    fn label(&self) -> String {
        match self {
            AffordanceKind::UploadButton => "Upload to ledger".to_string(),
            AffordanceKind::SentBadge => "Sent".to_string(),
            AffordanceKind::Uploading => "Uploading...".to_string(),
            AffordanceKind::ErrorBadge(message) => message.clone(),
            AffordanceKind::ListBadge => "PDF sent".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Inside a rendered target container; `selector` names the profile entry.
    Inside { target: NodeKey, selector: String },
    /// Sibling right after the attachment node.
    AfterNode { anchor: NodeKey },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedNode {
    pub host: NodeKey,
    pub file_name: String,
    pub email_identity: String,
    pub kind: AffordanceKind,
    pub placement: Placement,
}

impl InjectedNode {
    pub fn to_html(&self) -> String {
        let tag = match self.kind {
            AffordanceKind::UploadButton | AffordanceKind::ErrorBadge(_) => "button",
            _ => "span",
        };
        format!(
            "<{tag} class=\"{}\" {FILE_ATTRIBUTE}=\"{}\" {EMAIL_ATTRIBUTE}=\"{}\">{}</{tag}>",
            self.kind.class_name(),
            escape(&self.file_name),
            escape(&self.email_identity),
            escape(&self.kind.label()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Inserted,
    Replaced,
}

#[derive(Debug, Default)]
pub struct Overlay {
    processed: BTreeSet<NodeKey>,
    nodes: BTreeMap<NodeKey, InjectedNode>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` processed; `false` when it already was.
    pub fn claim(&mut self, key: &NodeKey) -> bool {
        self.processed.insert(key.clone())
    }

    pub fn is_processed(&self, key: &NodeKey) -> bool {
        self.processed.contains(key) || self.nodes.contains_key(key)
    }

    /// Whether any affordance on the page already carries this file name.
    pub fn has_rendered(&self, file_name: &str) -> bool {
        let wanted = normalize_file_name(file_name);
        self.nodes
            .values()
            .any(|node| normalize_file_name(&node.file_name) == wanted)
    }

    /// Inserts the node, or swaps its kind in place keeping its placement.
    pub fn render(&mut self, node: InjectedNode) -> RenderOutcome {
        self.processed.insert(node.host.clone());
        match self.nodes.get_mut(&node.host) {
            Some(existing) => {
                existing.kind = node.kind;
                existing.file_name = node.file_name;
                existing.email_identity = node.email_identity;
                RenderOutcome::Replaced
            }
            None => {
                self.nodes.insert(node.host.clone(), node);
                RenderOutcome::Inserted
            }
        }
    }

    /// Moves an existing affordance after its host node shifted in the page.
    pub fn relocate(&mut self, host: &NodeKey, placement: Placement) -> bool {
        match self.nodes.get_mut(host) {
            Some(existing) if existing.placement != placement => {
                existing.placement = placement;
                true
            }
            _ => false,
        }
    }

    pub fn node(&self, host: &NodeKey) -> Option<&InjectedNode> {
        self.nodes.get(host)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &InjectedNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget everything; used on navigation.
    pub fn clear(&mut self) {
        self.processed.clear();
        self.nodes.clear();
    }
}

/// Tells whether an element has a rendered, non-zero box.
pub trait LayoutProbe {
    fn is_rendered(&self, element: ElementRef<'_>) -> bool;
}

/// Inline-style heuristic; snapshots carry no layout information.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleLayoutProbe;

impl LayoutProbe for StyleLayoutProbe {
    fn is_rendered(&self, element: ElementRef<'_>) -> bool {
        !self_and_ancestors(element).any(|el| {
            let value = el.value();
            if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
                return true;
            }
            let style: String = value
                .attr("style")
                .unwrap_or_default()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            style.contains("display:none")
                || style.contains("visibility:hidden")
                || style.contains("width:0px")
                || style.contains("height:0px")
                || style.contains("width:0;")
                || style.contains("height:0;")
                || style.ends_with("width:0")
                || style.ends_with("height:0")
        })
    }
}

/// First injection target found in the item; falls back to after the item
/// when none exists or the chosen one is not rendered.
pub fn choose_placement(
    item: ElementRef<'_>,
    profile: &CompiledProfile,
    probe: &dyn LayoutProbe,
) -> Placement {
    let chosen = profile
        .injection_targets
        .iter()
        .find_map(|(raw, sel)| item.select(sel).next().map(|target| (raw, target)));
    match chosen {
        Some((raw, target)) if probe.is_rendered(target) => Placement::Inside {
            target: node_key(target),
            selector: raw.clone(),
        },
        _ => Placement::AfterNode {
            anchor: node_key(item),
        },
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
