//! Post models: raw CMS records and the normalized shapes the site renders

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::richtext::RichText;

/// A post document exactly as the CMS returns it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    /// Document id assigned by the CMS
    #[serde(default)]
    pub id: String,

    /// Human-friendly unique identifier used in URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    /// Null while the document has never been published
    #[serde(default, with = "cms_date")]
    pub first_publication_date: Option<DateTime<Utc>>,

    pub data: RawPostData,
}

/// The custom fields of a post document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPostData {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<RawSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: Option<String>,
}

/// One `{heading, body}` group of a post body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSection {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: RichText,
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListingPage {
    #[serde(default)]
    pub results: Vec<RawPost>,
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Lightweight preview of a post, as shown in the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub id: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A page of normalized summaries plus the continuation cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub results: Vec<PostSummary>,
    pub next_cursor: Option<Cursor>,
}

/// Opaque continuation token handed out by the CMS.
///
/// Always a full URL; it is fetched verbatim and never rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully loaded post for the detail page
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    pub id: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: Option<String>,
    pub content: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub body: RichText,
}

impl RawPost {
    /// Identifier used in detail links: the uid, or the document id when
    /// the document has none
    pub fn identifier(&self) -> &str {
        match self.uid.as_deref() {
            Some(uid) if !uid.is_empty() => uid,
            _ => &self.id,
        }
    }
}

/// Reduce a raw record to the summary fields, dropping everything else
pub fn normalize(raw: RawPost) -> PostSummary {
    let id = raw.identifier().to_string();
    PostSummary {
        id,
        publication_date: raw.first_publication_date,
        title: raw.data.title,
        subtitle: raw.data.subtitle,
        author: raw.data.author,
    }
}

impl From<RawListingPage> for ListingPage {
    fn from(page: RawListingPage) -> Self {
        Self {
            results: page.results.into_iter().map(normalize).collect(),
            next_cursor: page.next_page.map(Cursor::new),
        }
    }
}

/// Re-express a summary in the wire shape, with no extra fields.
///
/// Used to seed the browser-side listing with the same JSON the CMS
/// returns for later pages.
impl From<&PostSummary> for RawPost {
    fn from(summary: &PostSummary) -> Self {
        Self {
            id: summary.id.clone(),
            uid: Some(summary.id.clone()),
            doc_type: None,
            first_publication_date: summary.publication_date,
            data: RawPostData {
                title: summary.title.clone(),
                subtitle: summary.subtitle.clone(),
                author: summary.author.clone(),
                banner: None,
                content: Vec::new(),
            },
        }
    }
}

impl From<&ListingPage> for RawListingPage {
    fn from(page: &ListingPage) -> Self {
        Self {
            results: page.results.iter().map(RawPost::from).collect(),
            next_page: page.next_cursor.as_ref().map(|c| c.as_str().to_string()),
        }
    }
}

impl From<RawPost> for PostDetail {
    fn from(raw: RawPost) -> Self {
        let id = raw.identifier().to_string();
        let banner_url = raw
            .data
            .banner
            .and_then(|b| b.url)
            .filter(|url| !url.is_empty());
        let content = raw
            .data
            .content
            .into_iter()
            .map(|s| Section {
                heading: s.heading,
                body: s.body,
            })
            .collect();

        Self {
            id,
            publication_date: raw.first_publication_date,
            title: raw.data.title,
            subtitle: raw.data.subtitle,
            author: raw.data.author,
            banner_url,
            content,
        }
    }
}

impl PostDetail {
    /// Summary view of this post
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.id.clone(),
            publication_date: self.publication_date,
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
        }
    }
}

/// Serde adapter for CMS timestamps.
///
/// The CMS writes offsets without a colon (`+0000`), which RFC 3339
/// parsing rejects, so both forms are accepted.
mod cms_date {
    use super::*;

    const CMS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&date.format(CMS_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => parse(s).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::<FixedOffset>::parse_from_str(s, CMS_FORMAT))
            .map(|d| d.with_timezone(&Utc))
    }
}

pub use cms_date::parse as parse_cms_date;
