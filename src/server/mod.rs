//! HTTP server rendering the listing and post pages on request

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::SiteConfig;
use crate::detail::{DetailPage, DetailState};
use crate::generator::Generator;
use crate::listing::ListingState;
use crate::source::{initial_page, PostSource};
use crate::Blog;

/// Shared server state
pub struct AppState {
    config: SiteConfig,
    source: Arc<dyn PostSource>,
    generator: Generator,
    /// Rendered post pages by identifier
    pages: RwLock<HashMap<String, String>>,
    /// Identifiers with a background load in flight
    loading: Mutex<HashSet<String>>,
}

impl AppState {
    pub fn new(config: &SiteConfig, source: Arc<dyn PostSource>) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            source,
            generator: Generator::new(config)?,
            pages: RwLock::new(HashMap::new()),
            loading: Mutex::new(HashSet::new()),
        })
    }

    /// Render the first `cms.prerender` posts of the listing ahead of time.
    ///
    /// Returns how many pages were cached. Posts that fail to load are
    /// skipped and rendered on first request instead.
    pub async fn prerender(&self) -> Result<usize> {
        let cms = &self.config.cms;
        let page = initial_page(self.source.as_ref(), &cms.document_type, cms.page_size).await?;

        let mut rendered = 0;
        for summary in page.results.iter().take(cms.prerender) {
            let mut detail = DetailPage::new(summary.id.as_str());
            if let DetailState::Loaded(post) =
                detail.load(self.source.as_ref(), &cms.document_type).await
            {
                let html = self.generator.render_post(post)?;
                self.pages.write().await.insert(summary.id.clone(), html);
                rendered += 1;
            }
        }

        Ok(rendered)
    }

    pub async fn cached_pages(&self) -> usize {
        self.pages.read().await.len()
    }
}

/// Build the router over a prepared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/post/:id", get(post_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, source: Arc<dyn PostSource>, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(&blog.config, source)?);

    match state.prerender().await {
        Ok(count) => tracing::info!("Prerendered {} posts", count),
        Err(e) => tracing::warn!("Prerender skipped: {}", e),
    }

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let cms = &state.config.cms;
    match initial_page(state.source.as_ref(), &cms.document_type, cms.page_size).await {
        Ok(page) => page_response(
            StatusCode::OK,
            state
                .generator
                .render_listing(&ListingState::initialize(page)),
        ),
        Err(e) => {
            tracing::warn!("Failed to load the listing: {}", e);
            page_response(
                StatusCode::BAD_GATEWAY,
                state.generator.render_error(&e.to_string()),
            )
        }
    }
}

/// Serve a post page. A cached page is returned as is. Otherwise the post
/// is loaded in a background task; if it is not ready within
/// `server.placeholder_after_ms` the loading placeholder is served and the
/// task keeps going, caching the page for the next request.
async fn post_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if let Some(html) = state.pages.read().await.get(&id) {
        return Html(html.clone()).into_response();
    }

    let Some(pending) = PendingLoad::claim(&state, &id) else {
        tracing::debug!("Post {} is already loading", id);
        return placeholder_response(&state);
    };

    let task_state = state.clone();
    let mut task = tokio::spawn(async move {
        let state = task_state;
        let mut detail = DetailPage::new(pending.id.as_str());
        let status = match detail
            .load(state.source.as_ref(), &state.config.cms.document_type)
            .await
        {
            DetailState::Loaded(_) => StatusCode::OK,
            DetailState::Missing => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        };

        let rendered = state.generator.render_detail(&pending.id, detail.state());
        if let (true, Ok(html)) = (status.is_success(), &rendered) {
            state.pages.write().await.insert(pending.id.clone(), html.clone());
        }
        drop(pending);
        (status, rendered)
    });

    match tokio::time::timeout(state.config.server.placeholder_after(), &mut task).await {
        Ok(Ok((status, rendered))) => page_response(status, rendered),
        Ok(Err(e)) => {
            tracing::error!("Render task for {} failed: {}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Render failed").into_response()
        }
        Err(_) => {
            tracing::debug!("Post {} not ready, serving placeholder", id);
            placeholder_response(&state)
        }
    }
}

fn placeholder_response(state: &AppState) -> Response {
    match state.generator.render_loading() {
        Ok(html) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Html(html),
        )
            .into_response(),
        Err(e) => page_response(StatusCode::OK, Err(e)),
    }
}

/// Marks a post as being loaded in the background. Released on drop, so a
/// panicking task does not leave the post stuck on the placeholder.
struct PendingLoad {
    state: Arc<AppState>,
    id: String,
}

impl PendingLoad {
    fn claim(state: &Arc<AppState>, id: &str) -> Option<Self> {
        let mut loading = state.loading.lock().unwrap_or_else(PoisonError::into_inner);
        loading.insert(id.to_string()).then(|| Self {
            state: state.clone(),
            id: id.to_string(),
        })
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        self.state
            .loading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

async fn fallback_handler(State(state): State<Arc<AppState>>) -> Response {
    page_response(StatusCode::NOT_FOUND, state.generator.render_not_found(""))
}

fn page_response(status: StatusCode, rendered: Result<String>) -> Response {
    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Render failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Render failed").into_response()
        }
    }
}
