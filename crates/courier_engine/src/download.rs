//! Locating the download URL of an attachment item.

use scraper::ElementRef;
use url::Url;

use crate::dom::{element_siblings, parent_element};
use crate::selectors::CompiledProfile;

/// How far up the tree the nearby-container step looks.
const PARENT_SEARCH_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStep {
    /// `a[download]` links and `download_url` metadata.
    DownloadMarked,
    /// Links pointing at the host's attachment endpoints.
    RemoteAssetPattern,
    /// The first two steps applied to siblings and a few parents.
    NearbyContainers,
    AnyAnchor,
    DataAttribute,
}

pub const DOWNLOAD_CASCADE: &[DownloadStep] = &[
    DownloadStep::DownloadMarked,
    DownloadStep::RemoteAssetPattern,
    DownloadStep::NearbyContainers,
    DownloadStep::AnyAnchor,
    DownloadStep::DataAttribute,
];

impl DownloadStep {
    /// Raw references in document order; not yet resolved against the page.
    fn locate(self, item: ElementRef<'_>, profile: &CompiledProfile) -> Vec<String> {
        match self {
            DownloadStep::DownloadMarked => download_marked(item),
            DownloadStep::RemoteAssetPattern => remote_asset_links(item, &profile.remote_asset_patterns),
            DownloadStep::NearbyContainers => {
                let parents = std::iter::successors(parent_element(item), |el| parent_element(*el))
                    .take(PARENT_SEARCH_DEPTH);
                element_siblings(item)
                    .chain(parents)
                    .flat_map(|scope| {
                        let mut refs = download_marked(scope);
                        refs.extend(remote_asset_links(scope, &profile.remote_asset_patterns));
                        refs
                    })
                    .collect()
            }
            DownloadStep::AnyAnchor => anchors(item)
                .filter_map(|a| a.value().attr("href").map(ToOwned::to_owned))
                .collect(),
            DownloadStep::DataAttribute => item
                .descendants()
                .filter_map(ElementRef::wrap)
                .flat_map(|el| {
                    profile
                        .data_url_attributes
                        .iter()
                        .filter_map(move |name| el.value().attr(name).map(ToOwned::to_owned))
                })
                .collect(),
        }
    }
}

/// First reference any cascade step yields that resolves to an http(s) URL.
pub fn resolve_download(
    item: ElementRef<'_>,
    page_url: &str,
    profile: &CompiledProfile,
) -> Option<String> {
    let base = Url::parse(page_url).ok();
    DOWNLOAD_CASCADE.iter().find_map(|step| {
        step.locate(item, profile)
            .iter()
            .find_map(|raw| resolve_url(raw, base.as_ref()))
            .map(String::from)
    })
}

fn download_marked(scope: ElementRef<'_>) -> Vec<String> {
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|el| {
            let value = el.value();
            if let Some(meta) = value.attr("download_url") {
                return meta.splitn(3, ':').nth(2).map(ToOwned::to_owned);
            }
            if value.name() == "a" && value.attr("download").is_some() {
                return value.attr("href").map(ToOwned::to_owned);
            }
            None
        })
        .collect()
}

fn remote_asset_links(scope: ElementRef<'_>, patterns: &[String]) -> Vec<String> {
    anchors(scope)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| patterns.iter().any(|p| href.contains(p.as_str())))
        .map(ToOwned::to_owned)
        .collect()
}

/// `a` elements in the subtree, the scope itself included.
fn anchors(scope: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("mailto:") {
        return None;
    }
    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => base?.join(trimmed).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}

#[cfg(test)]
mod tests {
    use super::resolve_url;
    use url::Url;

    #[test]
    fn query_only_links_resolve_against_the_page() {
        let base = Url::parse("https://mail.example.com/mail/u/0/#inbox/abc").ok();
        let url = resolve_url("?ui=2&view=att&attid=0.1", base.as_ref()).map(String::from);
        assert_eq!(
            url.as_deref(),
            Some("https://mail.example.com/mail/u/0/?ui=2&view=att&attid=0.1")
        );
    }

    #[test]
    fn non_http_references_are_rejected() {
        let base = Url::parse("https://mail.example.com/").ok();
        assert!(resolve_url("#", base.as_ref()).is_none());
        assert!(resolve_url("javascript:void(0)", base.as_ref()).is_none());
        assert!(resolve_url("mailto:a@b.c", base.as_ref()).is_none());
        assert!(resolve_url("  ", base.as_ref()).is_none());
    }
}
