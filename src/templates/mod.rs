//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping is off: every value
//! placed in a context is escaped when the view data is built, and markup
//! fields (section bodies) arrive already sanitized.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Browser script behind the listing's load-more button
pub const LOAD_MORE_SCRIPT: &str = include_str!("site/load_more.js");

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("loading.html", include_str!("site/loading.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            ("error.html", include_str!("site/error.html")),
            (
                "partials/style.css",
                include_str!("site/partials/style.css"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    /// BCP 47 tag, as browsers expect it
    pub language: String,
    pub timezone: String,
    pub generator: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelsData {
    pub loading: String,
    pub load_more: String,
    pub unpublished: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub datetime: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub date: String,
    pub datetime: Option<String>,
    pub reading_time: String,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    /// Sanitized markup
    pub html: String,
}
