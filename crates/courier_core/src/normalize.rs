/// Equality key for attachment names: trimmed and lowercased.
///
/// This is the only notion of name equality used for reconciliation, so
/// `"Invoice.PDF"` and `" invoice.pdf "` are the same file.
pub fn normalize_file_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// True when the text carries a `.pdf` marker anywhere, ignoring case.
pub fn mentions_pdf(text: &str) -> bool {
    text.to_ascii_lowercase().contains(".pdf")
}

/// Cuts `text` right after the last `.pdf` occurrence, keeping the original casing.
///
/// Returns `None` when the text has no `.pdf` marker.
pub fn truncate_after_pdf(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    lower.rfind(".pdf").map(|idx| &text[..idx + ".pdf".len()])
}

#[cfg(test)]
mod tests {
    use super::{mentions_pdf, normalize_file_name, truncate_after_pdf};

    #[test]
    fn normalization_ignores_case_and_outer_whitespace() {
        assert_eq!(normalize_file_name("Invoice.PDF"), normalize_file_name(" invoice.pdf "));
        assert_eq!(normalize_file_name("  Rechnung März.pdf\n"), "rechnung märz.pdf");
    }

    #[test]
    fn pdf_marker_is_case_insensitive() {
        assert!(mentions_pdf("Scan.Pdf"));
        assert!(mentions_pdf("Download report.pdf (120 KB)"));
        assert!(!mentions_pdf("photo.png"));
        assert!(!mentions_pdf("pdf"));
    }

    #[test]
    fn truncation_drops_trailing_noise() {
        assert_eq!(truncate_after_pdf("Invoice.PDF. Press enter"), Some("Invoice.PDF"));
        assert_eq!(truncate_after_pdf("notes.txt"), None);
    }
}
