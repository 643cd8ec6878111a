//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use chrono::Locale;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    /// Display language for dates, e.g. `pt-BR`
    pub language: String,
    /// IANA timezone used when formatting publication dates
    pub timezone: String,

    // Directory
    pub public_dir: String,

    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub reading: ReadingConfig,
    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "UTC".to_string(),

            public_dir: "public".to_string(),

            labels: LabelsConfig::default(),
            reading: ReadingConfig::default(),
            cms: CmsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve `language` into a chrono locale. Accepts both `pt-BR` and `pt_BR`.
    pub fn locale(&self) -> Result<Locale> {
        let normalized = self.language.replace('-', "_");
        Locale::try_from(normalized.as_str())
            .map_err(|_| anyhow::anyhow!("Unknown language: {}", self.language))
    }

    /// Resolve `timezone` into a chrono-tz zone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone {}: {}", self.timezone, e))
    }
}

/// User-facing labels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Shown on the load-more control while a page is being fetched
    pub loading: String,
    pub load_more: String,
    /// Rendered in place of a null publication date
    pub unpublished: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            loading: "Carregando...".to_string(),
            load_more: "Carregar mais posts".to_string(),
            unpublished: "Não publicado".to_string(),
        }
    }
}

/// Reading time estimate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub words_per_minute: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
        }
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Size of the initial listing page
    pub page_size: usize,
    /// Number of detail pages rendered ahead of time
    pub prerender: usize,
    pub timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 2,
            prerender: 2,
            timeout_secs: 10,
        }
    }
}

impl CmsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// On-demand rendering in `serve`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// How long a request waits for an unrendered post before the loading
    /// placeholder is served instead
    pub placeholder_after_ms: u64,
    /// Reload interval the placeholder asks the browser for, 0 disables it
    pub refresh_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            placeholder_after_ms: 800,
            refresh_secs: 1,
        }
    }
}

impl ServerConfig {
    pub fn placeholder_after(&self) -> Duration {
        Duration::from_millis(self.placeholder_after_ms)
    }
}
