use url::Url;

/// Shortest trailing fragment segment that is treated as a message id.
const MIN_MESSAGE_ID_LEN: usize = 16;

/// Returns the URL fragment without the leading `#`, if any.
pub fn fragment_of(page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    parsed
        .fragment()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(ToOwned::to_owned)
}

/// Extracts the message id from a fragment shaped like `#<folder>/<id>` or
/// `#<folder>/<sub>/<id>`.
///
/// The last segment must be long and alphanumeric; list-view fragments such
/// as `#inbox` or `#inbox/p2` yield `None`.
pub fn message_id_from_fragment(fragment: &str) -> Option<String> {
    let mut segments = fragment.split('/').filter(|s| !s.is_empty());
    let _folder = segments.next()?;
    let last = segments.last()?;
    let is_message_id = last.len() >= MIN_MESSAGE_ID_LEN
        && last.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    is_message_id.then(|| last.to_string())
}

/// Message id taken from the page URL fragment.
pub fn message_id_from_url(page_url: &str) -> Option<String> {
    fragment_of(page_url).and_then(|f| message_id_from_fragment(&f))
}

#[cfg(test)]
mod tests {
    use super::{fragment_of, message_id_from_fragment, message_id_from_url};

    #[test]
    fn message_fragments_yield_the_trailing_id() {
        assert_eq!(
            message_id_from_fragment("inbox/FMfcgzQXJWRtbDpxSwZtqTqHnXxVfKjM").as_deref(),
            Some("FMfcgzQXJWRtbDpxSwZtqTqHnXxVfKjM")
        );
        assert_eq!(
            message_id_from_fragment("label/Work/FMfcgzQXJWRtbDpxSwZtqTqHnXxVfKjM").as_deref(),
            Some("FMfcgzQXJWRtbDpxSwZtqTqHnXxVfKjM")
        );
    }

    #[test]
    fn list_fragments_have_no_message_id() {
        assert_eq!(message_id_from_fragment("inbox"), None);
        assert_eq!(message_id_from_fragment("inbox/p2"), None);
        assert_eq!(message_id_from_fragment(""), None);
    }

    #[test]
    fn urls_without_fragment_are_handled() {
        assert_eq!(fragment_of("https://mail.example.com/mail/u/0/"), None);
        assert_eq!(
            message_id_from_url("https://mail.example.com/mail/u/0/#inbox/FMfcgzQXJWRtbDpxSwZt"),
            Some("FMfcgzQXJWRtbDpxSwZt".to_string())
        );
        assert_eq!(message_id_from_url("not a url"), None);
    }
}
