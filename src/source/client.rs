//! HTTP client for a Prismic-style content API

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{PageFetcher, PostSource, SourceError};
use crate::config::CmsConfig;
use crate::content::{Cursor, RawListingPage, RawPost};

/// API root document, only the refs are of interest
#[derive(Debug, Deserialize)]
struct ApiRoot {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Client for the CMS REST API
#[derive(Debug, Clone)]
pub struct CmsClient {
    http: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl CmsClient {
    /// Create a client from the `cms` section of the site config
    pub fn new(config: &CmsConfig) -> Result<Self, SourceError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| SourceError::Endpoint(format!("{}: {}", config.endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(SourceError::Endpoint(config.endpoint.clone()));
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("cms-blog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SourceError::Client)?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Current master ref; every query must carry it
    pub async fn master_ref(&self) -> Result<String, SourceError> {
        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }

        let root: ApiRoot = self.get_json(url).await?;
        root.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(SourceError::NoMasterRef)
    }

    /// Run a predicate query against the search endpoint
    async fn search(&self, query: &str, page_size: usize) -> Result<RawListingPage, SourceError> {
        let master_ref = self.master_ref().await?;

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Endpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["documents", "search"]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("ref", &master_ref)
                .append_pair("q", query)
                .append_pair("pageSize", &page_size.to_string());
            if let Some(token) = &self.access_token {
                pairs.append_pair("access_token", token);
            }
        }

        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        let shown = display_url(url.as_str());
        tracing::debug!("GET {}", shown);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: shown.clone(),
                source,
            })?;

        decode(response, shown).await
    }
}

#[async_trait]
impl PostSource for CmsClient {
    async fn query_by_type(
        &self,
        doc_type: &str,
        page_size: usize,
    ) -> Result<RawListingPage, SourceError> {
        let query = format!(r#"[[at(document.type,"{}")]]"#, escape_literal(doc_type));
        self.search(&query, page_size).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<RawPost>, SourceError> {
        let query = format!(
            r#"[[at(my.{}.uid,"{}")]]"#,
            escape_literal(doc_type),
            escape_literal(uid)
        );
        let page = self.search(&query, 1).await?;
        Ok(page.results.into_iter().next())
    }

    async fn get_by_id(&self, doc_type: &str, id: &str) -> Result<Option<RawPost>, SourceError> {
        let query = format!(
            r#"[[at(document.id,"{}")][at(document.type,"{}")]]"#,
            escape_literal(id),
            escape_literal(doc_type)
        );
        let page = self.search(&query, 1).await?;
        Ok(page.results.into_iter().next())
    }
}

#[async_trait]
impl PageFetcher for CmsClient {
    /// The cursor is requested exactly as the CMS returned it
    async fn fetch_page(&self, cursor: &Cursor) -> Result<RawListingPage, SourceError> {
        let shown = display_url(cursor.as_str());
        tracing::debug!("GET {} (cursor)", shown);

        let response = self
            .http
            .get(cursor.as_str())
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: shown.clone(),
                source,
            })?;

        decode(response, shown).await
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    shown: String,
) -> Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status { url: shown, status });
    }

    let bytes = response.bytes().await.map_err(|source| SourceError::Http {
        url: shown.clone(),
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|source| SourceError::Decode { url: shown, source })
}

/// URL without its query string, so tokens never reach logs or errors
fn display_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => format!("{}{}", url.origin().ascii_serialization(), url.path()),
        Err(_) => raw.split('?').next().unwrap_or(raw).to_string(),
    }
}

/// Escape a value placed inside a double-quoted predicate literal
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
