//! Generator module - renders listing and post pages and writes static files

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tera::Context;

use crate::config::SiteConfig;
use crate::content::{
    HtmlRichText, ListingPage, PostDetail, PostSummary, RawListingPage, RichTextRenderer,
};
use crate::detail::DetailState;
use crate::helpers::{html_escape, post_output_path, post_path, DateFormatter};
use crate::listing::ListingState;
use crate::templates::{
    LabelsData, PostData, SectionData, SiteData, SummaryData, TemplateRenderer, LOAD_MORE_SCRIPT,
};

/// Renders site pages from listing and detail state
pub struct Generator {
    config: SiteConfig,
    renderer: TemplateRenderer,
    dates: DateFormatter,
    rich_text: Arc<dyn RichTextRenderer>,
}

impl Generator {
    /// Create a new generator with the default HTML rich text renderer
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            renderer: TemplateRenderer::new()?,
            dates: DateFormatter::from_config(config)?,
            rich_text: Arc::new(HtmlRichText),
        })
    }

    /// Swap the rich text collaborator
    pub fn with_rich_text(mut self, rich_text: Arc<dyn RichTextRenderer>) -> Self {
        self.rich_text = rich_text;
        self
    }

    /// Render the listing page for the given state.
    ///
    /// The load-more control is present only while a cursor remains.
    pub fn render_listing(&self, state: &ListingState) -> Result<String> {
        let posts: Vec<SummaryData> = state.posts.iter().map(|p| self.summary_data(p)).collect();

        let mut context = self.base_context();
        context.insert("posts", &posts);
        context.insert("has_more", &state.has_more());
        context.insert("loading", &state.is_loading());
        context.insert("seed", &self.seed_json(state)?);
        context.insert("script", LOAD_MORE_SCRIPT);

        self.renderer.render("index.html", &context)
    }

    /// Render a loaded post
    pub fn render_post(&self, post: &PostDetail) -> Result<String> {
        let mut context = self.base_context();
        context.insert("post", &self.post_data(post));
        self.renderer.render("post.html", &context)
    }

    /// Render whatever the detail page currently shows
    pub fn render_detail(&self, id: &str, state: &DetailState) -> Result<String> {
        match state {
            DetailState::Loaded(post) => self.render_post(post),
            DetailState::NotLoaded | DetailState::Loading => self.render_loading(),
            DetailState::Missing => self.render_not_found(id),
            DetailState::Failed(message) => self.render_error(message),
        }
    }

    /// Placeholder shown while a post is still being fetched. It asks the
    /// browser to reload after `server.refresh_secs`.
    pub fn render_loading(&self) -> Result<String> {
        let mut context = self.base_context();
        context.insert("refresh", &self.config.server.refresh_secs);
        self.renderer.render("loading.html", &context)
    }

    pub fn render_not_found(&self, id: &str) -> Result<String> {
        let mut context = self.base_context();
        context.insert("id", &html_escape(id));
        self.renderer.render("not_found.html", &context)
    }

    pub fn render_error(&self, message: &str) -> Result<String> {
        let mut context = self.base_context();
        context.insert("message", &html_escape(message));
        self.renderer.render("error.html", &context)
    }

    /// Write the listing and the given posts under `public_dir`
    pub fn write_site(
        &self,
        public_dir: &Path,
        listing: &ListingState,
        posts: &[PostDetail],
    ) -> Result<()> {
        fs::create_dir_all(public_dir)?;
        fs::write(public_dir.join("index.html"), self.render_listing(listing)?)?;

        for post in posts {
            let output = public_dir.join(post_output_path(&post.id));
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output, self.render_post(post)?)?;
            tracing::debug!("Wrote {:?}", output);
        }

        Ok(())
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert(
            "site",
            &SiteData {
                title: html_escape(&self.config.title),
                language: html_escape(&self.config.language.replace('_', "-")),
                timezone: html_escape(&self.config.timezone),
                generator: format!("cms-blog {}", env!("CARGO_PKG_VERSION")),
            },
        );
        context.insert(
            "labels",
            &LabelsData {
                loading: html_escape(&self.config.labels.loading),
                load_more: html_escape(&self.config.labels.load_more),
                unpublished: html_escape(&self.config.labels.unpublished),
            },
        );
        context
    }

    fn summary_data(&self, post: &PostSummary) -> SummaryData {
        SummaryData {
            path: html_escape(&post_path(&post.id)),
            title: html_escape(&post.title),
            subtitle: html_escape(&post.subtitle),
            author: html_escape(&post.author),
            date: html_escape(&self.dates.format(post.publication_date.as_ref())),
            datetime: self.dates.datetime_attr(post.publication_date.as_ref()),
        }
    }

    fn post_data(&self, post: &PostDetail) -> PostData {
        let sections = post
            .content
            .iter()
            .map(|s| SectionData {
                heading: html_escape(&s.heading),
                html: self.rich_text.to_markup(&s.body),
            })
            .collect();

        PostData {
            title: html_escape(&post.title),
            banner_url: post.banner_url.as_deref().map(html_escape),
            author: html_escape(&post.author),
            date: html_escape(&self.dates.format(post.publication_date.as_ref())),
            datetime: self.dates.datetime_attr(post.publication_date.as_ref()),
            reading_time: format!(
                "{} min",
                post.reading_minutes(self.config.reading.words_per_minute)
            ),
            sections,
        }
    }

    /// Listing state in the CMS wire shape, safe to embed in a `<script>`
    fn seed_json(&self, state: &ListingState) -> Result<String> {
        let seed = RawListingPage::from(&ListingPage {
            results: state.posts.clone(),
            next_cursor: state.cursor.clone(),
        });
        Ok(serde_json::to_string(&seed)?.replace('<', "\\u003c"))
    }
}
