//! Shared test fixtures: a fake CMS over HTTP and in-memory doubles

use async_trait::async_trait;
use axum::{
    extract::Query,
    http::{header::HOST, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::content::{Cursor, RawListingPage, RawPost};
use crate::source::{PageFetcher, PostSource, SourceError};

const MASTER_REF: &str = "master-ref-1";

/// The three posts the fake CMS knows about
pub fn fixture_posts() -> Vec<Value> {
    vec![
        json!({
            "id": "doc-1",
            "uid": "first-post",
            "type": "posts",
            "first_publication_date": "2021-03-25T19:25:28+0000",
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira",
                "banner": { "url": "https://images.example/hooks.png" },
                "content": [
                    { "heading": "Proin et varius", "body": [
                        { "type": "paragraph", "text": "Lorem ipsum dolor sit amet", "spans": [
                            { "start": 0, "end": 5, "type": "strong" }
                        ] }
                    ] },
                    { "heading": "Cras laoreet", "body": [
                        { "type": "list-item", "text": "Nullam dolor", "spans": [] },
                        { "type": "list-item", "text": "Ut varius", "spans": [] }
                    ] }
                ]
            }
        }),
        json!({
            "id": "doc-2",
            "uid": "second-post",
            "type": "posts",
            "first_publication_date": "2021-03-20T10:00:00+0000",
            "data": {
                "title": "Criando um app CRA do zero",
                "subtitle": "Tudo sobre como criar a sua primeira aplicação",
                "author": "Danilo Vieira",
                "banner": { "url": null },
                "content": []
            }
        }),
        json!({
            "id": "doc-3",
            "uid": "third-post",
            "type": "posts",
            "first_publication_date": null,
            "data": {
                "title": "Rascunho",
                "subtitle": "Ainda não publicado",
                "author": "Ana Souza",
                "content": []
            }
        }),
    ]
}

pub fn fixture_raw_posts() -> Vec<RawPost> {
    fixture_posts()
        .into_iter()
        .map(|v| serde_json::from_value(v).expect("fixture post"))
        .collect()
}

/// Bind `app` on an ephemeral port and return its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Router mimicking the CMS API under `/api/v2`, plus `/page2` as the
/// continuation of the posts listing and `/garbage` returning invalid JSON
pub fn api_router() -> Router {
    Router::new()
        .route("/api/v2", get(api_root))
        .route("/api/v2/documents/search", get(api_search))
        .route("/page2", get(api_page2))
        .route("/garbage", get(|| async { "this is not json" }))
}

async fn api_root() -> Json<Value> {
    Json(json!({
        "refs": [
            { "id": "preview", "ref": "preview-ref", "isMasterRef": false },
            { "id": "master", "ref": MASTER_REF, "isMasterRef": true }
        ]
    }))
}

async fn api_search(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("ref").map(String::as_str) != Some(MASTER_REF) {
        return (StatusCode::BAD_REQUEST, "bad ref").into_response();
    }
    if params
        .get("access_token")
        .is_some_and(|t| t != "token-123")
    {
        return (StatusCode::UNAUTHORIZED, "bad token").into_response();
    }

    let posts = fixture_posts();
    let q = params.get("q").cloned().unwrap_or_default();
    let page_size: usize = params
        .get("pageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);

    if q == r#"[[at(document.type,"posts")]]"# {
        let host = headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        let results: Vec<Value> = posts.iter().take(page_size).cloned().collect();
        let next_page = (page_size < posts.len())
            .then(|| format!("http://{}/page2?ref={}", host, MASTER_REF));
        return Json(json!({ "page": 1, "results": results, "next_page": next_page }))
            .into_response();
    }

    let results: Vec<Value> = posts
        .into_iter()
        .filter(|p| {
            let uid = p["uid"].as_str().unwrap_or_default();
            let id = p["id"].as_str().unwrap_or_default();
            q == format!(r#"[[at(my.posts.uid,"{}")]]"#, uid)
                || q == format!(r#"[[at(document.id,"{}")][at(document.type,"posts")]]"#, id)
        })
        .collect();
    Json(json!({ "page": 1, "results": results, "next_page": null })).into_response()
}

async fn api_page2(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("ref").map(String::as_str) != Some(MASTER_REF) {
        return (StatusCode::NOT_FOUND, "unknown page").into_response();
    }
    let posts = fixture_posts();
    Json(json!({ "page": 2, "results": [posts[2].clone()], "next_page": null })).into_response()
}

/// In-memory [`PostSource`]. Lookups match the way the CMS does: by uid
/// or by document id, never one for the other. With a gate set, every uid
/// lookup waits until the gate is notified.
#[derive(Debug)]
pub struct MockSource {
    fail: bool,
    posts: Vec<RawPost>,
    gate: Option<Arc<Notify>>,
    lookups: AtomicUsize,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new(fixture_raw_posts())
    }
}

impl MockSource {
    pub fn new(posts: Vec<RawPost>) -> Self {
        Self {
            fail: false,
            posts,
            gate: None,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of uid lookups made so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostSource for MockSource {
    async fn query_by_type(
        &self,
        _doc_type: &str,
        page_size: usize,
    ) -> Result<RawListingPage, SourceError> {
        if self.fail {
            return Err(SourceError::NoMasterRef);
        }
        let next_page =
            (page_size < self.posts.len()).then(|| "https://api.example/page2".to_string());
        Ok(RawListingPage {
            results: self.posts.iter().take(page_size).cloned().collect(),
            next_page,
        })
    }

    async fn get_by_uid(&self, _doc_type: &str, uid: &str) -> Result<Option<RawPost>, SourceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(SourceError::NoMasterRef);
        }
        Ok(self.posts.iter().find(|p| p.uid.as_deref() == Some(uid)).cloned())
    }

    async fn get_by_id(&self, _doc_type: &str, id: &str) -> Result<Option<RawPost>, SourceError> {
        if self.fail {
            return Err(SourceError::NoMasterRef);
        }
        Ok(self.posts.iter().find(|p| p.id == id).cloned())
    }
}

/// Scripted [`PageFetcher`]: hands out queued responses in order and
/// records every cursor it was asked for. With a gate set, each fetch
/// waits until the gate is notified.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<VecDeque<Result<RawListingPage, SourceError>>>,
    requested: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl MockFetcher {
    pub fn new(responses: Vec<Result<RawListingPage, SourceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requested: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("requested lock").clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_page(&self, cursor: &Cursor) -> Result<RawListingPage, SourceError> {
        self.requested
            .lock()
            .expect("requested lock")
            .push(cursor.as_str().to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or(Err(SourceError::NoMasterRef))
    }
}

/// A published post without a uid, linked by its document id
pub fn uidless_post() -> RawPost {
    serde_json::from_value(json!({
        "id": "doc-9",
        "type": "posts",
        "first_publication_date": "2021-04-01T12:00:00+0000",
        "data": {
            "title": "Sem uid",
            "subtitle": "Encontrado pelo id do documento",
            "author": "Ana Souza",
            "content": [{ "heading": "Único", "body": [] }]
        }
    }))
    .expect("uid-less post")
}

/// Build a raw page from `(uid, title)` pairs
pub fn raw_page(posts: &[(&str, &str)], next_page: Option<&str>) -> RawListingPage {
    RawListingPage {
        results: posts
            .iter()
            .map(|(uid, title)| {
                serde_json::from_value(json!({
                    "id": format!("doc-{}", uid),
                    "uid": uid,
                    "first_publication_date": "2021-03-25T00:00:00+0000",
                    "data": {
                        "title": title,
                        "subtitle": "",
                        "author": "Autor",
                        "content": [{ "heading": "h", "body": [] }]
                    }
                }))
                .expect("raw post")
            })
            .collect(),
        next_page: next_page.map(str::to_string),
    }
}
