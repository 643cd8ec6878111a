//! cms-blog: a blog front end over a headless CMS
//!
//! Posts are fetched from a Prismic-style content API. The listing grows a
//! page at a time behind a "load more" control and each post has its own
//! detail page. Pages are rendered with embedded Tera templates, either
//! served on demand or written out as static files.

pub mod commands;
pub mod config;
pub mod content;
pub mod detail;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod server;
pub mod source;
pub mod templates;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use source::{CmsClient, PostSource};

/// The main blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new blog from a directory, reading `_config.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };

        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
        })
    }

    /// Override the CMS connection settings from the command line or environment
    pub fn with_cms(mut self, endpoint: Option<String>, access_token: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.config.cms.endpoint = endpoint;
        }
        if access_token.is_some() {
            self.config.cms.access_token = access_token;
        }
        self
    }

    /// HTTP client for the configured CMS
    pub fn client(&self) -> Result<Arc<CmsClient>> {
        if self.config.cms.endpoint.is_empty() {
            anyhow::bail!(
                "No CMS endpoint configured. Set cms.endpoint in _config.yml or pass --endpoint"
            );
        }
        Ok(Arc::new(CmsClient::new(&self.config.cms)?))
    }

    /// Render the first listing page and prerendered posts to `public_dir`
    pub async fn generate(&self, source: &dyn PostSource) -> Result<()> {
        commands::generate::run(self, source).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
