//! Post Summary Source: where posts come from
//!
//! Two seams are exposed so they can be swapped in tests:
//! [`PostSource`] answers the queries the site builds itself, and
//! [`PageFetcher`] resolves the opaque continuation cursors the CMS hands out.

mod client;

pub use client::CmsClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::content::{Cursor, ListingPage, RawListingPage, RawPost};

/// Errors talking to the CMS
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid CMS endpoint: {0}")]
    Endpoint(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CMS did not report a master ref")]
    NoMasterRef,
}

/// Queries the site issues against the CMS
#[async_trait]
pub trait PostSource: Send + Sync {
    /// First page of documents of `doc_type`, `page_size` per page
    async fn query_by_type(
        &self,
        doc_type: &str,
        page_size: usize,
    ) -> Result<RawListingPage, SourceError>;

    /// Single document by its uid, `None` when nothing matches
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<RawPost>, SourceError>;

    /// Single document by its CMS document id, for records without a uid
    async fn get_by_id(&self, doc_type: &str, id: &str) -> Result<Option<RawPost>, SourceError>;
}

/// Resolves a continuation cursor into the next page of results
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, cursor: &Cursor) -> Result<RawListingPage, SourceError>;
}

/// Fetch and normalize the first listing page
pub async fn initial_page(
    source: &dyn PostSource,
    doc_type: &str,
    page_size: usize,
) -> Result<ListingPage, SourceError> {
    let raw = source.query_by_type(doc_type, page_size).await?;
    tracing::debug!(
        "Initial page: {} results, next page {:?}",
        raw.results.len(),
        raw.next_page
    );
    Ok(ListingPage::from(raw))
}
