//! Post detail loading

use crate::content::{PostDetail, RichText};
use crate::helpers::{count_words, reading_minutes};
use crate::source::{PostSource, SourceError};

/// Lifecycle of one detail page view
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    NotLoaded,
    Loading,
    /// Terminal
    Loaded(PostDetail),
    /// Terminal: the identifier does not resolve to a post
    Missing,
    /// The source failed; loading again may succeed
    Failed(String),
}

impl DetailState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DetailState::Loaded(_) | DetailState::Missing)
    }
}

/// Look up one post by identifier.
///
/// Listing links use the uid, or the document id for records without one,
/// so a uid miss is retried as a document id lookup.
pub async fn fetch_detail(
    source: &dyn PostSource,
    doc_type: &str,
    id: &str,
) -> Result<Option<PostDetail>, SourceError> {
    let raw = match source.get_by_uid(doc_type, id).await? {
        Some(raw) => Some(raw),
        None => {
            tracing::debug!("No uid {}, trying it as a document id", id);
            source
                .get_by_id(doc_type, id)
                .await?
                .filter(|raw| raw.identifier() == id)
        }
    };
    Ok(raw.map(PostDetail::from))
}

/// A detail page for one identifier, driven through [`DetailState`]
#[derive(Debug, Clone)]
pub struct DetailPage {
    id: String,
    state: DetailState,
}

impl DetailPage {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: DetailState::NotLoaded,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn into_state(self) -> DetailState {
        self.state
    }

    /// Fetch the post unless a terminal state was already reached
    pub async fn load(&mut self, source: &dyn PostSource, doc_type: &str) -> &DetailState {
        if self.state.is_terminal() {
            return &self.state;
        }

        self.state = DetailState::Loading;
        self.state = match fetch_detail(source, doc_type, &self.id).await {
            Ok(Some(post)) => DetailState::Loaded(post),
            Ok(None) => {
                tracing::debug!("Post {} not found", self.id);
                DetailState::Missing
            }
            Err(e) => {
                tracing::warn!("Failed to load post {}: {}", self.id, e);
                DetailState::Failed(e.to_string())
            }
        };
        &self.state
    }
}

impl PostDetail {
    /// Words in the title, section headings and section bodies
    pub fn word_count(&self) -> usize {
        count_words(&self.title)
            + self
                .content
                .iter()
                .map(|s| count_words(&s.heading) + count_words(&RichText::plain_text(&s.body)))
                .sum::<usize>()
    }

    /// Estimated reading time in minutes
    pub fn reading_minutes(&self, words_per_minute: usize) -> usize {
        reading_minutes(self.word_count(), words_per_minute)
    }
}
