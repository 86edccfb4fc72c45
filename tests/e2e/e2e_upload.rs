//! End-to-end probe run against a local axum server, through the real
//! reqwest transport. Gated behind the `e2e-tests` feature.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use rorschach_probe::{Client, ProbeConfig, ProbeOutcome, run_upload_rotate};
use tokio::net::TcpListener;

const EXPECTED_ROTATE_JSON: &[u8] =
    br#"{"1":0,"2":0,"3":0,"4":0,"5":0,"6":0,"7":0,"8":0,"9":0,"10":0}"#;

#[derive(Debug)]
struct PartRecord {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct UploadRecord {
    authorization: Option<String>,
    user_id_header: Option<String>,
    parts: Vec<PartRecord>,
}

#[derive(Clone, Default)]
struct Captured {
    upload: Arc<Mutex<Option<UploadRecord>>>,
}

async fn record_upload(
    captured: &Captured,
    headers: &HeaderMap,
    multipart: &mut Multipart,
) {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .expect("multipart field should decode")
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .expect("multipart field bytes should read")
            .to_vec();
        parts.push(PartRecord {
            name,
            filename,
            content_type,
            bytes,
        });
    }

    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    *captured.upload.lock().expect("capture mutex poisoned") = Some(UploadRecord {
        authorization: header_text("authorization"),
        user_id_header: header_text("user-id"),
        parts,
    });
}

async fn accept_handler(
    State(captured): State<Captured>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    record_upload(&captured, &headers, &mut multipart).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"code":0}"#,
    )
}

async fn reject_handler() -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"code":3,"msg":"no active session"}"#,
    )
}

async fn error_handler() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>internal error")
}

struct TestServer {
    base_url: String,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start(app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { base_url, task }
    }

    fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::new(self.base_url.clone(), "e2e-token", "Bubble_Lis")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[tokio::test]
async fn e2e_upload_rotate_roundtrip() {
    let captured = Captured::default();
    let app = Router::new()
        .route("/rorschach/analyze/upload_rotate", post(accept_handler))
        .with_state(captured.clone());
    let server = TestServer::start(app).await;

    let client = Client::new();
    let outcome = run_upload_rotate(&client, &server.probe_config()).await;
    assert!(outcome.is_accepted());

    let upload = captured.upload.lock().expect("capture mutex poisoned");
    let upload = upload.as_ref().expect("server should have seen the upload");

    assert_eq!(upload.authorization.as_deref(), Some("Bearer e2e-token"));
    assert_eq!(upload.user_id_header.as_deref(), Some("Bubble_Lis"));
    assert_eq!(upload.parts.len(), 2);

    let user_part = &upload.parts[0];
    assert_eq!(user_part.name, "user_id");
    assert_eq!(user_part.bytes, b"Bubble_Lis");

    let file_part = &upload.parts[1];
    assert_eq!(file_part.name, "file");
    assert_eq!(file_part.filename.as_deref(), Some("rotate.json"));
    assert_eq!(file_part.content_type.as_deref(), Some("application/json"));
    assert_eq!(file_part.bytes, EXPECTED_ROTATE_JSON);
}

#[tokio::test]
async fn e2e_service_rejection_surfaces_the_service_message() {
    let app = Router::new().route("/rorschach/analyze/upload_rotate", post(reject_handler));
    let server = TestServer::start(app).await;

    let client = Client::new();
    let outcome = run_upload_rotate(&client, &server.probe_config()).await;
    assert_eq!(
        outcome,
        ProbeOutcome::Rejected {
            reason: "no active session".to_string()
        }
    );
}

#[tokio::test]
async fn e2e_http_error_is_rejected_without_parsing() {
    let app = Router::new().route("/rorschach/analyze/upload_rotate", post(error_handler));
    let server = TestServer::start(app).await;

    let client = Client::new();
    let outcome = run_upload_rotate(&client, &server.probe_config()).await;
    assert_eq!(
        outcome,
        ProbeOutcome::Rejected {
            reason: "http error: status 500".to_string()
        }
    );
}
