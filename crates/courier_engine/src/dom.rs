use courier_core::NodeKey;
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Selector};

/// Element path from the document root, e.g. `html[0]/body[1]/div[3]`.
///
/// Indexes count element siblings only, so whitespace text nodes do not shift
/// keys between snapshots of the same markup.
pub fn node_key(element: ElementRef<'_>) -> NodeKey {
    let mut segments = Vec::new();
    let mut current: Option<NodeRef<'_, Node>> = Some(*element);
    while let Some(node) = current {
        if let Node::Element(el) = node.value() {
            let index = node
                .prev_siblings()
                .filter(|sibling| sibling.value().is_element())
                .count();
            segments.push(format!("{}[{index}]", el.name()));
        }
        current = node.parent();
    }
    segments.reverse();
    NodeKey::new(segments.join("/"))
}

/// Attribute on the element itself, else on its first descendant carrying it.
pub fn attr_in_subtree(element: ElementRef<'_>, name: &str) -> Option<String> {
    if let Some(value) = non_empty(element.value().attr(name)) {
        return Some(value);
    }
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .find_map(|el| non_empty(el.value().attr(name)))
}

pub fn first_text(element: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        element
            .select(sel)
            .map(collapsed_text)
            .find(|text| !text.is_empty())
    })
}

/// Text content with runs of whitespace collapsed to one space.
pub fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

pub fn element_siblings(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element
        .prev_siblings()
        .chain(element.next_siblings())
        .filter_map(ElementRef::wrap)
}

/// Element and its ancestors up to the document root.
pub fn self_and_ancestors(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::once(element).chain(element.ancestors().filter_map(ElementRef::wrap))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}
