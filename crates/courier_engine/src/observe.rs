use std::collections::BTreeMap;

use courier_core::MutationBatch;
use scraper::{ElementRef, Html};

/// Class attributes that occur more often in `current` than in `previous`,
/// standing in for the added nodes a live observer would report.
pub fn mutation_batch_between(previous: &Html, current: &Html) -> MutationBatch {
    let mut before = class_counts(previous);
    let mut added = Vec::new();
    for class in classes(current) {
        match before.get_mut(class) {
            Some(count) if *count > 0 => *count -= 1,
            _ => added.push(class.to_string()),
        }
    }
    MutationBatch::from_classes(added)
}

fn class_counts(document: &Html) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for class in classes(document) {
        *counts.entry(class).or_insert(0) += 1;
    }
    counts
}

fn classes(document: &Html) -> impl Iterator<Item = &str> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|el| el.value().attr("class"))
        .map(str::trim)
        .filter(|class| !class.is_empty())
}

#[cfg(test)]
mod tests {
    use super::mutation_batch_between;
    use scraper::Html;

    #[test]
    fn only_new_class_values_are_reported() {
        let before = Html::parse_document(r#"<div class="zA"></div><div class="aQH"></div>"#);
        let after = Html::parse_document(
            r#"<div class="zA"></div><div class="zA"></div><div class="aQH"></div><span class="aZo x"></span>"#,
        );
        let batch = mutation_batch_between(&before, &after);
        assert_eq!(batch.added_classes, vec!["zA".to_string(), "aZo x".to_string()]);
    }
}
