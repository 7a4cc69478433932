use courier_engine::{
    AffordanceKind, InjectedNode, Overlay, PageSnapshot, Placement, Scanner, ViewMode,
    PLACEHOLDER_FILE_NAME,
};
use pretty_assertions::assert_eq;

const MESSAGE_URL: &str = "https://mail.example.com/mail/u/0/#inbox/FMfcgzQXJWDsKmVxTqLr";
const INBOX_URL: &str = "https://mail.example.com/mail/u/0/#inbox";

fn page(body: &str) -> String {
    format!("<html><head><title>Mail</title></head><body>{body}</body></html>")
}

fn strip(items: &str) -> String {
    page(&format!(
        r#"<div class="adn"><h2 class="hP">Quarterly invoices</h2><div class="aQH">{items}</div></div>"#
    ))
}

fn scan(html: &str, url: &str, overlay: &Overlay) -> Vec<courier_engine::AttachmentCandidate> {
    let scanner = Scanner::default();
    let document = PageSnapshot::new(url, html).parse();
    scanner
        .scan_open_message(&document, url, overlay, "email_fallback")
        .candidates
}

fn names(candidates: &[courier_engine::AttachmentCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.file_name.as_str()).collect()
}

#[test]
fn tooltip_alone_names_the_pdf() {
    let html = strip(
        r#"<span class="aZo" data-tooltip="Invoice_2024.pdf"><a href="?ui=2&amp;view=att&amp;attid=0.1">open</a></span>"#,
    );
    let found = scan(&html, MESSAGE_URL, &Overlay::new());

    assert_eq!(found.len(), 1);
    let candidate = &found[0];
    assert!(candidate.is_pdf);
    assert_eq!(candidate.file_name, "Invoice_2024.pdf");
    assert_eq!(candidate.email_identity, "FMfcgzQXJWDsKmVxTqLr");
    assert_eq!(candidate.subject.as_deref(), Some("Quarterly invoices"));
    assert_eq!(candidate.variant, "strip");
    assert_eq!(
        candidate.download_ref.as_deref(),
        Some("https://mail.example.com/mail/u/0/?ui=2&view=att&attid=0.1")
    );
}

#[test]
fn display_name_wins_over_later_signals() {
    let html = strip(
        r#"<span class="aZo" title="ignored.pdf"><span class="aV3">Statement March.PDF</span></span>"#,
    );
    let found = scan(&html, MESSAGE_URL, &Overlay::new());
    assert_eq!(names(&found), vec!["Statement March.PDF"]);
}

#[test]
fn aria_label_prefix_is_stripped() {
    let html = strip(r#"<span class="aZo" aria-label="Download attachment receipt-17.pdf"></span>"#);
    let found = scan(&html, MESSAGE_URL, &Overlay::new());
    assert_eq!(names(&found), vec!["receipt-17.pdf"]);
}

#[test]
fn non_pdf_attachments_are_ignored() {
    let html = strip(
        r#"<span class="aZo"><span class="aV3">photo.png</span></span>
           <span class="aZo"><span class="aV3">notes.docx</span></span>"#,
    );
    assert!(scan(&html, MESSAGE_URL, &Overlay::new()).is_empty());
}

#[test]
fn pdf_icon_without_name_uses_placeholder() {
    let html = strip(r#"<span class="aZo"><img src="https://static.example.com/icons/pdf_20.png" alt=""></span>"#);
    let found = scan(&html, MESSAGE_URL, &Overlay::new());
    assert_eq!(names(&found), vec![PLACEHOLDER_FILE_NAME]);
    assert_eq!(found[0].download_ref, None);
}

#[test]
fn later_layout_variant_is_used_when_first_is_absent() {
    let html = page(
        r#"<div class="adn"><div class="hq">
             <div class="aQy"><div class="aQA"><span>Contract.pdf</span></div>
               <a download href="https://mail.example.com/dl/contract">get</a></div>
           </div></div>"#,
    );
    let found = scan(&html, MESSAGE_URL, &Overlay::new());
    assert_eq!(names(&found), vec!["Contract.pdf"]);
    assert_eq!(found[0].variant, "card");
    assert_eq!(found[0].download_ref.as_deref(), Some("https://mail.example.com/dl/contract"));
}

#[test]
fn download_reference_found_in_sibling_container() {
    let html = page(
        r#"<div class="adn"><div class="aQH">
             <span class="aZo" title="Offer.pdf"></span>
             <div class="aQw"><a href="https://mail-attachment.googleusercontent.com/attachment/u/0/?ui=2&amp;attid=0.2">dl</a></div>
           </div></div>"#,
    );
    let found = scan(&html, MESSAGE_URL, &Overlay::new());
    assert_eq!(
        found[0].download_ref.as_deref(),
        Some("https://mail-attachment.googleusercontent.com/attachment/u/0/?ui=2&attid=0.2")
    );
}

#[test]
fn download_meta_attribute_is_a_download_reference() {
    let html = strip(
        r#"<span class="aZo" download_url="application/pdf:Payslip.pdf:https://mail.example.com/att/9"></span>"#,
    );
    let found = scan(&html, MESSAGE_URL, &Overlay::new());
    assert_eq!(names(&found), vec!["Payslip.pdf"]);
    assert_eq!(found[0].download_ref.as_deref(), Some("https://mail.example.com/att/9"));
}

#[test]
fn attachments_outside_an_open_message_are_not_candidates() {
    let html = page(r#"<div class="aQH"><span class="aZo" title="loose.pdf"></span></div>"#);
    assert!(scan(&html, MESSAGE_URL, &Overlay::new()).is_empty());
}

#[test]
fn same_name_twice_in_one_pass_yields_one_candidate() {
    let html = strip(
        r#"<span class="aZo" title="Invoice.pdf"></span><span class="aZo" title=" invoice.PDF "></span>"#,
    );
    assert_eq!(scan(&html, MESSAGE_URL, &Overlay::new()).len(), 1);
}

#[test]
fn rescanning_processed_nodes_finds_nothing() {
    let html = strip(r#"<span class="aZo" title="a.pdf"></span><span class="aZo" title="b.pdf"></span>"#);
    let mut overlay = Overlay::new();
    let first = scan(&html, MESSAGE_URL, &overlay);
    assert_eq!(first.len(), 2);
    for candidate in &first {
        assert!(overlay.claim(&candidate.key));
    }

    assert!(scan(&html, MESSAGE_URL, &overlay).is_empty());
}

#[test]
fn content_rendered_above_does_not_steal_identity() {
    let scanner = Scanner::default();
    let mut overlay = Overlay::new();
    let first_html = strip(r#"<span class="aZo" title="a.pdf"></span>"#);
    let first = scan(&first_html, MESSAGE_URL, &overlay);
    for candidate in first {
        overlay.render(InjectedNode {
            host: candidate.key.clone(),
            file_name: candidate.file_name.clone(),
            email_identity: candidate.email_identity.clone(),
            kind: AffordanceKind::UploadButton,
            placement: candidate.placement.clone(),
        });
    }

    let newer_above = page(
        r#"<div class="adn"><div class="aQH"><span class="aZo" title="b.pdf"></span></div></div>
           <div class="adn"><div class="aQH"><span class="aZo" title="a.pdf"></span></div></div>"#,
    );
    let document = PageSnapshot::new(MESSAGE_URL, newer_above).parse();
    let rescan = scanner.scan_open_message(&document, MESSAGE_URL, &overlay, "email_fallback");

    assert_eq!(names(&rescan.candidates), vec!["b.pdf"]);
    assert_eq!(rescan.moved.len(), 1);
    let (moved_key, placement) = &rescan.moved[0];
    assert_eq!(*moved_key, courier_engine::attachment_key("FMfcgzQXJWDsKmVxTqLr", "a.pdf"));
    assert_ne!(Some(placement), overlay.node(moved_key).map(|node| &node.placement));
}

#[test]
fn names_already_rendered_elsewhere_are_skipped() {
    let html = strip(r#"<span class="aZo" title="A.pdf"></span><span class="aZo" title="c.pdf"></span>"#);
    let mut overlay = Overlay::new();
    overlay.render(InjectedNode {
        host: courier_core::NodeKey::new("html[0]/body[1]/div[9]"),
        file_name: "a.pdf".to_string(),
        email_identity: "E0".to_string(),
        kind: AffordanceKind::SentBadge,
        placement: Placement::AfterNode {
            anchor: courier_core::NodeKey::new("html[0]/body[1]/div[9]"),
        },
    });

    let found = scan(&html, MESSAGE_URL, &overlay);
    assert_eq!(names(&found), vec!["c.pdf"]);
}

#[test]
fn identity_falls_back_to_ancestor_attribute_then_generated() {
    let with_attr = page(
        r#"<div class="adn" data-legacy-message-id="18c2f0a9b1d2e3f4"><div class="aQH">
             <span class="aZo" title="x.pdf"></span></div></div>"#,
    );
    let found = scan(&with_attr, INBOX_URL, &Overlay::new());
    assert_eq!(found[0].email_identity, "18c2f0a9b1d2e3f4");

    let bare = strip(r#"<span class="aZo" title="x.pdf"></span>"#);
    let found = scan(&bare, INBOX_URL, &Overlay::new());
    assert_eq!(found[0].email_identity, "email_fallback");
}

#[test]
fn visible_target_receives_the_affordance_hidden_one_falls_back() {
    let visible = strip(r#"<span class="aZo" title="a.pdf"><div class="aQw"></div></span>"#);
    let found = scan(&visible, MESSAGE_URL, &Overlay::new());
    assert!(matches!(
        &found[0].placement,
        Placement::Inside { selector, .. } if selector == "div.aQw"
    ));

    let hidden = strip(r#"<span class="aZo" title="a.pdf"><div class="aQw" style="display: none"></div></span>"#);
    let found = scan(&hidden, MESSAGE_URL, &Overlay::new());
    assert_eq!(
        found[0].placement,
        Placement::AfterNode {
            anchor: found[0].container.clone()
        }
    );
}

#[test]
fn view_mode_follows_fragment_and_containers() {
    let scanner = Scanner::default();
    let open = PageSnapshot::new(MESSAGE_URL, strip("")).parse();
    assert_eq!(scanner.view_mode(&open, MESSAGE_URL), ViewMode::OpenMessage);

    let list_only = page(r#"<table><tr class="zA"><td>row</td></tr></table>"#);
    let list = PageSnapshot::new(INBOX_URL, list_only).parse();
    assert_eq!(scanner.view_mode(&list, INBOX_URL), ViewMode::ListView);

    // Preview pane: rows and a detail container, but the fragment is a folder.
    let split = page(r#"<table><tr class="zA"><td>row</td></tr></table><div class="adn"></div>"#);
    let split = PageSnapshot::new(INBOX_URL, split).parse();
    assert_eq!(scanner.view_mode(&split, INBOX_URL), ViewMode::ListView);
}

#[test]
fn list_view_reports_pdf_chips_per_row() {
    let html = page(
        r#"<table>
             <tr class="zA"><td><div class="brc"><span title="a.pdf">a.pdf</span></div></td></tr>
             <tr class="zA"><td><span class="aZ1" title="holiday.jpg"></span></td></tr>
             <tr class="zA"><td><span class="aZ1" title="Scan 12.PDF"></span></td></tr>
           </table>"#,
    );
    let scanner = Scanner::default();
    let document = PageSnapshot::new(INBOX_URL, html).parse();
    let chips = scanner.scan_list_view(&document, &Overlay::new());

    let names: Vec<_> = chips.iter().map(|c| c.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "Scan 12.PDF"]);
    assert_ne!(chips[0].row, chips[1].row);
}
