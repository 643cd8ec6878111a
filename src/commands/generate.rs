//! Generate static files

use anyhow::Result;

use crate::detail::{DetailPage, DetailState};
use crate::generator::Generator;
use crate::listing::ListingState;
use crate::source::{initial_page, PostSource};
use crate::Blog;

/// Write the first listing page and the first `cms.prerender` posts.
///
/// Later listing pages are fetched by the browser through the load-more
/// script, so only the first page is baked into `index.html`.
pub async fn run(blog: &Blog, source: &dyn PostSource) -> Result<()> {
    let start = std::time::Instant::now();
    let cms = &blog.config.cms;

    let page = initial_page(source, &cms.document_type, cms.page_size).await?;
    tracing::info!("Loaded {} posts for the listing", page.results.len());

    let mut posts = Vec::new();
    for summary in page.results.iter().take(cms.prerender) {
        let mut detail = DetailPage::new(summary.id.as_str());
        detail.load(source, &cms.document_type).await;
        match detail.into_state() {
            DetailState::Loaded(post) => posts.push(post),
            DetailState::Missing => tracing::warn!("Post {} vanished, skipping", summary.id),
            state => tracing::warn!("Post {} not rendered: {:?}", summary.id, state),
        }
    }

    let generator = Generator::new(&blog.config)?;
    generator.write_site(&blog.public_dir, &ListingState::initialize(page), &posts)?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated listing and {} posts in {:.2}s",
        posts.len(),
        duration.as_secs_f64()
    );

    Ok(())
}
