use courier_engine::{BackendError, Credentials, LedgerBackend, ReqwestBackend, TransactionFilter};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials(server: &MockServer) -> Credentials {
    Credentials {
        api_token: "tok-123".to_string(),
        organization_id: "org-1".to_string(),
        base_url: format!("{}/", server.uri()),
    }
}

#[tokio::test]
async fn upload_posts_multipart_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/organizations/org-1/files/upload"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "file-9" })))
        .expect(1)
        .mount(&server)
        .await;

    let file_id = ReqwestBackend::new()
        .upload_file(&credentials(&server), b"%PDF-1.7".to_vec(), "b.pdf", "application/pdf")
        .await
        .expect("upload ok");
    assert_eq!(file_id, "file-9");
}

#[tokio::test]
async fn upload_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/organizations/org-1/files/upload"))
        .respond_with(ResponseTemplate::new(413).set_body_string("too big"))
        .mount(&server)
        .await;

    let err = ReqwestBackend::new()
        .upload_file(&credentials(&server), vec![0; 16], "big.pdf", "application/pdf")
        .await
        .unwrap_err();
    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 413);
            assert_eq!(body, "too big");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn list_files_accepts_alternate_name_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizations/org-1/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                { "id": "f1", "name": "A.pdf" },
                { "id": "f2", "fileName": "b.pdf", "createdAt": "2024-03-01T10:00:00Z" }
            ]
        })))
        .mount(&server)
        .await;

    let files = ReqwestBackend::new().list_files(&credentials(&server)).await;
    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["A.pdf", "b.pdf"]);
    assert_eq!(files[1].created_at.as_deref(), Some("2024-03-01T10:00:00Z"));
}

#[tokio::test]
async fn list_files_degrades_to_empty_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/organizations/org-1/files"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(ReqwestBackend::new().list_files(&credentials(&server)).await.is_empty());
}

#[tokio::test]
async fn connectivity_probe_sends_all_none_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/organizations/org-1/transactions/search"))
        .and(body_json(serde_json::json!({
            "bookingStatus": "NONE",
            "documentStatus": "NONE",
            "direction": "NONE"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let transactions = ReqwestBackend::new()
        .list_transactions(&credentials(&server), &TransactionFilter::none())
        .await
        .expect("probe ok");
    assert!(transactions.is_empty());
}

#[tokio::test]
async fn connect_transaction_posts_file_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/organizations/org-1/transactions/tx-7/files"))
        .and(body_json(serde_json::json!({ "fileId": "file-9" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    ReqwestBackend::new()
        .connect_transaction(&credentials(&server), "tx-7", "file-9")
        .await
        .expect("connect ok");
}
