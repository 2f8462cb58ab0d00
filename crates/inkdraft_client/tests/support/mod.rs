#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use crossbeam_channel::Receiver;
use inkdraft_client::{DocumentSummary, GatewayError, PersistenceGateway};
use inkdraft_core::models::document::{
    Collaborator, Document, DocumentRecord, InvitationStatus, Permission, SaveDocumentRequest,
};
use inkdraft_core::{Delta, ExportFormat, Notification};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::time::Instant;

pub const TEST_TOKEN: &str = "test-token";

pub fn document(id: &str, title: &str, text: &str) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        content: Delta::from_plain_text(text),
        created_at: None,
        collaborators: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct UpdateCall {
    pub at: Instant,
    pub id: String,
    pub title: String,
    pub content: String,
}

impl UpdateCall {
    pub fn plain_text(&self) -> String {
        Delta::parse(&self.content).expect("saved delta").plain_text()
    }
}

enum FetchOutcome {
    Record(DocumentRecord),
    Missing,
}

/// In-memory gateway that records update calls.
///
/// Gated gateways hold every update until [`MockGateway::release`] hands out
/// a permit, which keeps a save in flight for as long as a test needs.
pub struct MockGateway {
    fetch: FetchOutcome,
    updates: Mutex<Vec<UpdateCall>>,
    update_count: watch::Sender<usize>,
    failures_left: AtomicUsize,
    gate: Option<Semaphore>,
    active: AtomicUsize,
    peak: AtomicUsize,
    docx: Mutex<Vec<u8>>,
}

impl MockGateway {
    fn with_fetch(fetch: FetchOutcome) -> Self {
        Self {
            fetch,
            updates: Mutex::new(Vec::new()),
            update_count: watch::channel(0).0,
            failures_left: AtomicUsize::new(0),
            gate: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            docx: Mutex::new(b"PK\x03\x04 fake docx body".to_vec()),
        }
    }

    pub fn with_document(document: Document) -> Self {
        let record = DocumentRecord {
            id: Some(document.id),
            title: Some(document.title),
            content: Some(document.content.to_json().expect("content json")),
            created_at: document.created_at,
            collaborators: document.collaborators,
        };
        Self::with_fetch(FetchOutcome::Record(record))
    }

    pub fn with_record(record: DocumentRecord) -> Self {
        Self::with_fetch(FetchOutcome::Record(record))
    }

    pub fn missing() -> Self {
        Self::with_fetch(FetchOutcome::Missing)
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, saves: usize) {
        if let Some(gate) = self.gate.as_ref() {
            gate.add_permits(saves);
        }
    }

    pub fn fail_next_updates(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn set_docx(&self, bytes: &[u8]) {
        *self.docx.lock().expect("docx lock") = bytes.to_vec();
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().expect("updates lock").clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` updates have been issued.
    pub async fn wait_for_updates(&self, count: usize) -> Vec<UpdateCall> {
        let mut rx = self.update_count.subscribe();
        tokio::time::timeout(Duration::from_secs(120), rx.wait_for(|seen| *seen >= count))
            .await
            .expect("timed out waiting for updates")
            .expect("update counter closed");
        self.updates()
    }
}

impl PersistenceGateway for MockGateway {
    async fn fetch(&self, id: &str) -> Result<Document, GatewayError> {
        match &self.fetch {
            FetchOutcome::Record(record) => Ok(Document::from_record(record.clone(), id)?),
            FetchOutcome::Missing => Err(GatewayError::NotFound),
        }
    }

    async fn update(&self, id: &str, request: &SaveDocumentRequest) -> Result<(), GatewayError> {
        self.updates.lock().expect("updates lock").push(UpdateCall {
            at: Instant::now(),
            id: id.to_string(),
            title: request.title.clone(),
            content: request.content.clone(),
        });
        self.update_count.send_modify(|count| *count += 1);

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if let Some(gate) = self.gate.as_ref() {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if fail {
            return Err(GatewayError::Status {
                status: 500,
                message: "store unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn create(&self, _request: &SaveDocumentRequest) -> Result<String, GatewayError> {
        Ok("created-id".to_string())
    }

    async fn delete(&self, _id: &str) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>, GatewayError> {
        Ok(Vec::new())
    }

    async fn download_docx(&self, _id: &str) -> Result<Vec<u8>, GatewayError> {
        Ok(self.docx.lock().expect("docx lock").clone())
    }

    async fn invite(&self, _id: &str, emails: &[String]) -> Result<Vec<Collaborator>, GatewayError> {
        Ok(emails
            .iter()
            .map(|email| Collaborator {
                email: email.clone(),
                permission: Permission::Edit,
                status: InvitationStatus::Pending,
            })
            .collect())
    }
}

/// Poll `rx` until a notification arrives, yielding to the runtime between
/// attempts without moving the clock.
pub async fn next_notification(rx: &Receiver<Notification>) -> Notification {
    for _ in 0..10_000 {
        if let Ok(notification) = rx.try_recv() {
            return notification;
        }
        tokio::task::yield_now().await;
    }
    panic!("no notification arrived");
}

/// Yield to the runtime until spawned work has had a chance to run.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// In-process document store
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct StoreState {
    pub documents: Arc<Mutex<HashMap<String, Value>>>,
    next_id: Arc<AtomicUsize>,
}

impl StoreState {
    pub fn insert(&self, id: &str, title: &str, content: &str) {
        self.documents.lock().expect("store lock").insert(
            id.to_string(),
            json!({
                "_id": id,
                "title": title,
                "content": content,
                "createdAt": "2024-05-01T12:00:00Z",
                "collaborators": [],
            }),
        );
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.documents.lock().expect("store lock").get(id).cloned()
    }
}

pub struct StubStore {
    pub addr: SocketAddr,
    pub state: StoreState,
}

impl StubStore {
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {}", TEST_TOKEN))
}

async fn list_documents(State(state): State<StoreState>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut documents: Vec<Value> = state
        .documents
        .lock()
        .expect("store lock")
        .values()
        .cloned()
        .collect();
    documents.sort_by_key(|document| document["_id"].as_str().unwrap_or_default().to_string());
    Json(json!({ "data": documents })).into_response()
}

async fn create_document(
    State(state): State<StoreState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let id = format!("doc-{}", state.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    state.insert(
        &id,
        body["title"].as_str().unwrap_or_default(),
        body["content"].as_str().unwrap_or_default(),
    );
    (
        StatusCode::CREATED,
        Json(json!({ "document": { "_id": id } })),
    )
        .into_response()
}

async fn fetch_document(
    State(state): State<StoreState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if id == "explode" {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "database offline");
    }
    match state.get(&id) {
        Some(document) => Json(json!({ "data": document })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Document not found"),
    }
}

async fn update_document(
    State(state): State<StoreState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut documents = state.documents.lock().expect("store lock");
    let Some(document) = documents.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Document not found");
    };
    document["title"] = body["title"].clone();
    document["content"] = body["content"].clone();
    Json(json!({ "message": "Document updated" })).into_response()
}

async fn delete_document(
    State(state): State<StoreState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    match state.documents.lock().expect("store lock").remove(&id) {
        Some(_) => Json(json!({ "message": "Document deleted" })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Document not found"),
    }
}

async fn download_document(
    State(state): State<StoreState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if state.get(&id).is_none() {
        return error(StatusCode::NOT_FOUND, "Document not found");
    }
    let accepts_docx = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == ExportFormat::Docx.mime_type());
    if !accepts_docx {
        return error(StatusCode::NOT_ACCEPTABLE, "Only DOCX downloads are supported");
    }
    let mut body = b"PK\x03\x04".to_vec();
    body.extend_from_slice(id.as_bytes());
    body.into_response()
}

async fn invite_collaborators(
    State(state): State<StoreState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut documents = state.documents.lock().expect("store lock");
    let Some(document) = documents.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Document not found");
    };
    let invited: Vec<Value> = body["emails"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|email| json!({ "email": email, "permission": "edit", "status": "pending" }))
        .collect();
    document["collaborators"] = Value::Array(invited.clone());
    Json(json!({ "collaborators": invited })).into_response()
}

/// Serve the stub store on an ephemeral localhost port.
pub async fn spawn_stub_store() -> StubStore {
    let state = StoreState::default();
    let app = Router::new()
        .route("/api/v1/document", get(list_documents).post(create_document))
        .route(
            "/api/v1/document/:id",
            get(fetch_document)
                .put(update_document)
                .delete(delete_document),
        )
        .route("/api/v1/document/:id/download", get(download_document))
        .route(
            "/api/v1/document/:id/collaborators",
            post(invite_collaborators),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub store");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub store");
    });
    StubStore { addr, state }
}
