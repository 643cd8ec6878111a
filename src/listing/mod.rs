//! Incremental listing: the growing list of post summaries behind "load more"
//!
//! A [`ListingController`] owns one [`ListingState`] per page view. It is the
//! only writer; renderers read snapshots or subscribe to changes. Pages after
//! the first are fetched from the opaque cursor the previous page returned,
//! normalized, and appended in arrival order.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::content::{Cursor, ListingPage, PostSummary};
use crate::source::{PageFetcher, SourceError};

/// Label used when the configured one is empty
const DEFAULT_LOADING_LABEL: &str = "Loading…";

/// Everything a renderer needs to draw the listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingState {
    /// Append-only for the lifetime of the state
    pub posts: Vec<PostSummary>,
    /// `None` once the last page has been merged
    pub cursor: Option<Cursor>,
    /// Empty while idle, the in-progress label while a page is in flight
    pub loading_label: String,
    /// Description of the last failed load, cleared when a new load starts
    pub last_error: Option<String>,
}

impl ListingState {
    /// Seed the state from the first page
    pub fn initialize(page: ListingPage) -> Self {
        Self {
            posts: page.results,
            cursor: page.next_cursor,
            loading_label: String::new(),
            last_error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        !self.loading_label.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// Whether a "load more" control should be offered and enabled
    pub fn can_load_more(&self) -> bool {
        self.has_more() && !self.is_loading()
    }
}

/// What a call to [`ListingController::load_next`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was merged; holds the number of posts appended
    Appended(usize),
    /// No cursor left, nothing was requested
    Exhausted,
    /// Another load is still in flight, nothing was requested
    Busy,
}

#[derive(Debug, Error)]
pub enum ListingError {
    /// Retryable: posts and cursor are untouched
    #[error("Failed to load the next page: {0}")]
    Source(#[from] SourceError),
}

/// Single writer of a [`ListingState`].
///
/// At most one `load_next` is in flight at a time; overlapping calls return
/// [`LoadOutcome::Busy`] without touching the network. Callers should still
/// disable their trigger while [`ListingState::is_loading`] is true.
pub struct ListingController {
    fetcher: Arc<dyn PageFetcher>,
    loading_label: String,
    state: watch::Sender<ListingState>,
}

impl ListingController {
    pub fn new(
        initial: ListingPage,
        fetcher: Arc<dyn PageFetcher>,
        loading_label: impl Into<String>,
    ) -> Self {
        let mut loading_label = loading_label.into();
        if loading_label.is_empty() {
            loading_label = DEFAULT_LOADING_LABEL.to_string();
        }

        let (state, _) = watch::channel(ListingState::initialize(initial));
        Self {
            fetcher,
            loading_label,
            state,
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ListingState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change, including the loading label
    pub fn subscribe(&self) -> watch::Receiver<ListingState> {
        self.state.subscribe()
    }

    /// Fetch the page behind the current cursor and append it.
    ///
    /// The loading label is set before the request goes out and is cleared
    /// when the response has been processed, when it fails, or when this
    /// future is dropped mid-flight.
    pub async fn load_next(&self) -> Result<LoadOutcome, ListingError> {
        let mut claimed: Option<Cursor> = None;
        let mut outcome = LoadOutcome::Exhausted;

        self.state.send_if_modified(|state| {
            if state.is_loading() {
                outcome = LoadOutcome::Busy;
                return false;
            }
            match &state.cursor {
                Some(cursor) => {
                    claimed = Some(cursor.clone());
                    state.loading_label = self.loading_label.clone();
                    state.last_error = None;
                    true
                }
                None => false,
            }
        });

        let Some(cursor) = claimed else {
            tracing::debug!("load_next skipped: {:?}", outcome);
            return Ok(outcome);
        };

        let _guard = LoadingGuard { state: &self.state };
        tracing::debug!("Loading next page from {}", cursor);

        match self.fetcher.fetch_page(&cursor).await {
            Ok(raw) => {
                let page = ListingPage::from(raw);
                let appended = page.results.len();
                self.state.send_modify(|state| {
                    state.posts.extend(page.results);
                    state.cursor = page.next_cursor;
                    state.loading_label.clear();
                });
                tracing::debug!("Appended {} posts", appended);
                Ok(LoadOutcome::Appended(appended))
            }
            Err(e) => {
                tracing::warn!("Failed to load next page: {}", e);
                self.state.send_modify(|state| {
                    state.last_error = Some(e.to_string());
                    state.loading_label.clear();
                });
                Err(e.into())
            }
        }
    }

    /// Keep loading until the cursor runs out. Returns the number of posts
    /// appended.
    pub async fn load_all(&self) -> Result<usize, ListingError> {
        let mut total = 0;
        loop {
            match self.load_next().await? {
                LoadOutcome::Appended(n) => total += n,
                LoadOutcome::Exhausted | LoadOutcome::Busy => return Ok(total),
            }
        }
    }
}

/// Clears the loading label if the load ends without doing so itself
struct LoadingGuard<'a> {
    state: &'a watch::Sender<ListingState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                state.loading_label.clear();
                true
            } else {
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CmsConfig;
    use crate::content::RawListingPage;
    use crate::source::{initial_page, CmsClient};
    use crate::testing::{api_router, raw_page, spawn_server, MockFetcher};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn ids(state: &ListingState) -> Vec<&str> {
        state.posts.iter().map(|p| p.id.as_str()).collect()
    }

    fn first_page() -> ListingPage {
        ListingPage::from(raw_page(
            &[("a", "A"), ("b", "B")],
            Some("https://api.example/page2"),
        ))
    }

    #[test]
    fn test_initialize() {
        let state = ListingState::initialize(first_page());
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert_eq!(
            state.cursor.as_ref().map(Cursor::as_str),
            Some("https://api.example/page2")
        );
        assert_eq!(state.loading_label, "");
        assert!(state.can_load_more());
    }

    #[tokio::test]
    async fn test_load_until_exhausted() {
        let fetcher = Arc::new(MockFetcher::new(vec![Ok(raw_page(&[("c", "C")], None))]));
        let controller = ListingController::new(first_page(), fetcher.clone(), "Carregando...");

        let outcome = controller.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended(1));

        let state = controller.snapshot();
        assert_eq!(ids(&state), vec!["a", "b", "c"]);
        assert!(state.cursor.is_none());
        assert!(!state.is_loading());
        assert!(!state.can_load_more());

        // Nothing left: no request goes out
        assert_eq!(controller.load_next().await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(fetcher.requested(), vec!["https://api.example/page2"]);
    }

    #[tokio::test]
    async fn test_pages_are_appended_in_call_order() {
        let fetcher = Arc::new(MockFetcher::new(vec![
            Ok(raw_page(&[("c", "C"), ("d", "D")], Some("https://api.example/page3"))),
            Ok(raw_page(&[("e", "E")], Some("https://api.example/page4?x=1&y=2"))),
            Ok(raw_page(&[], None)),
        ]));
        let controller = ListingController::new(first_page(), fetcher.clone(), "Carregando...");

        assert_eq!(controller.load_all().await.unwrap(), 3);
        assert_eq!(ids(&controller.snapshot()), vec!["a", "b", "c", "d", "e"]);
        // Each cursor is requested exactly as the previous page returned it
        assert_eq!(
            fetcher.requested(),
            vec![
                "https://api.example/page2",
                "https://api.example/page3",
                "https://api.example/page4?x=1&y=2",
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_kept() {
        let fetcher = Arc::new(MockFetcher::new(vec![Ok(raw_page(&[("b", "B again")], None))]));
        let controller = ListingController::new(first_page(), fetcher, "Carregando...");

        controller.load_next().await.unwrap();
        let state = controller.snapshot();
        assert_eq!(ids(&state), vec!["a", "b", "b"]);
        assert_eq!(state.posts[2].title, "B again");
    }

    #[tokio::test]
    async fn test_results_are_normalized() {
        let fetcher = Arc::new(MockFetcher::new(vec![Ok(raw_page(&[("c", "C")], None))]));
        let controller = ListingController::new(first_page(), fetcher, "Carregando...");
        controller.load_next().await.unwrap();

        let appended = &controller.snapshot().posts[2];
        assert_eq!(
            appended,
            &PostSummary {
                id: "c".to_string(),
                publication_date: Some(
                    crate::content::parse_cms_date("2021-03-25T00:00:00Z").unwrap(),
                ),
                title: "C".to_string(),
                subtitle: String::new(),
                author: "Autor".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_loading_label_is_visible_only_in_flight() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(
            MockFetcher::new(vec![Ok(raw_page(&[("c", "C")], None))]).gated(gate.clone()),
        );
        let controller = Arc::new(ListingController::new(
            first_page(),
            fetcher.clone(),
            "Carregando...",
        ));
        let mut rx = controller.subscribe();

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.load_next().await }
        });

        rx.changed().await.unwrap();
        let in_flight = rx.borrow_and_update().clone();
        assert_eq!(in_flight.loading_label, "Carregando...");
        assert!(!in_flight.can_load_more());
        assert_eq!(ids(&in_flight), vec!["a", "b"]);

        // A second call while the first is pending does not issue a request
        assert_eq!(controller.load_next().await.unwrap(), LoadOutcome::Busy);

        gate.notify_one();
        assert_eq!(task.await.unwrap().unwrap(), LoadOutcome::Appended(1));
        assert_eq!(fetcher.requested().len(), 1);

        let done = controller.snapshot();
        assert_eq!(done.loading_label, "");
        assert_eq!(ids(&done), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failure_resets_label_and_is_retryable() {
        let fetcher = Arc::new(MockFetcher::new(vec![
            Err(SourceError::NoMasterRef),
            Ok(raw_page(&[("c", "C")], None)),
        ]));
        let controller = ListingController::new(first_page(), fetcher.clone(), "Carregando...");

        let err = controller.load_next().await.unwrap_err();
        assert!(matches!(err, ListingError::Source(SourceError::NoMasterRef)));

        let state = controller.snapshot();
        assert_eq!(state.loading_label, "");
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert!(state.cursor.is_some());
        assert!(state.last_error.is_some());
        assert!(state.can_load_more());

        assert_eq!(controller.load_next().await.unwrap(), LoadOutcome::Appended(1));
        let state = controller.snapshot();
        assert!(state.last_error.is_none());
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_load_clears_label() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(MockFetcher::new(vec![]).gated(gate));
        let controller = ListingController::new(first_page(), fetcher, "Carregando...");

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), controller.load_next()).await;
        assert!(abandoned.is_err());

        let state = controller.snapshot();
        assert_eq!(state.loading_label, "");
        assert!(state.can_load_more());
        assert_eq!(ids(&state), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_label_falls_back_to_default() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(
            MockFetcher::new(vec![Ok(RawListingPage::default())]).gated(gate.clone()),
        );
        let controller = Arc::new(ListingController::new(first_page(), fetcher, ""));
        let mut rx = controller.subscribe();

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.load_next().await }
        });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().loading_label, DEFAULT_LOADING_LABEL);

        gate.notify_one();
        assert_eq!(task.await.unwrap().unwrap(), LoadOutcome::Appended(0));
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let base = spawn_server(api_router()).await;
        let client = Arc::new(
            CmsClient::new(&CmsConfig {
                endpoint: format!("{}/api/v2", base),
                ..CmsConfig::default()
            })
            .unwrap(),
        );

        let first = initial_page(client.as_ref(), "posts", 2).await.unwrap();
        assert_eq!(first.results.len(), 2);

        let controller = ListingController::new(first, client, "Carregando...");
        assert_eq!(controller.load_next().await.unwrap(), LoadOutcome::Appended(1));

        let state = controller.snapshot();
        assert_eq!(ids(&state), vec!["first-post", "second-post", "third-post"]);
        assert!(state.cursor.is_none());
        assert!(state.posts[2].publication_date.is_none());
    }
}
