//! List posts in the terminal, one page at a time

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::content::PostSummary;
use crate::helpers::DateFormatter;
use crate::listing::{ListingController, LoadOutcome};
use crate::source::{initial_page, PageFetcher, PostSource};
use crate::Blog;

/// List posts from the CMS. With `all`, every page is loaded without
/// asking; otherwise the user is prompted before each further page.
pub async fn run(
    blog: &Blog,
    source: &dyn PostSource,
    fetcher: Arc<dyn PageFetcher>,
    all: bool,
) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    run_with(blog, source, fetcher, all, input, &mut out).await
}

/// Same as [`run`] over explicit input and output streams
pub async fn run_with<R, W>(
    blog: &Blog,
    source: &dyn PostSource,
    fetcher: Arc<dyn PageFetcher>,
    all: bool,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let cms = &blog.config.cms;
    let labels = &blog.config.labels;
    let dates = DateFormatter::from_config(&blog.config)?;

    let page = initial_page(source, &cms.document_type, cms.page_size).await?;
    let controller = ListingController::new(page, fetcher, labels.loading.as_str());
    let mut lines = input.lines();

    let mut printed = 0;
    loop {
        let state = controller.snapshot();
        for post in &state.posts[printed..] {
            print_summary(out, &dates, post)?;
        }
        printed = state.posts.len();

        if !state.has_more() {
            writeln!(out, "Posts ({})", printed)?;
            return Ok(());
        }

        if !all {
            write!(out, "{} [Y/n] ", labels.load_more)?;
            out.flush()?;
            let answer = lines.next_line().await?.unwrap_or_else(|| "n".to_string());
            if !wants_more(&answer) {
                writeln!(out, "Posts ({}, more available)", printed)?;
                return Ok(());
            }
        }

        match load_with_indicator(&controller, out).await {
            Ok(LoadOutcome::Appended(n)) => tracing::debug!("Appended {} posts", n),
            Ok(outcome) => tracing::debug!("Nothing loaded: {:?}", outcome),
            Err(e) if !all => writeln!(out, "{}", e)?,
            Err(e) => return Err(e),
        }
    }
}

/// Run one `load_next`, echoing the loading label when it appears
async fn load_with_indicator<W: Write>(
    controller: &ListingController,
    out: &mut W,
) -> Result<LoadOutcome> {
    let mut changes = controller.subscribe();
    let load = controller.load_next();
    tokio::pin!(load);

    loop {
        tokio::select! {
            outcome = &mut load => return Ok(outcome?),
            Ok(()) = changes.changed() => {
                let label = changes.borrow_and_update().loading_label.clone();
                if !label.is_empty() {
                    writeln!(out, "{}", label)?;
                }
            }
        }
    }
}

fn print_summary<W: Write>(out: &mut W, dates: &DateFormatter, post: &PostSummary) -> Result<()> {
    writeln!(
        out,
        "  {} - {} ({}) [{}]",
        dates.format(post.publication_date.as_ref()),
        post.title,
        post.author,
        post.id
    )?;
    if !post.subtitle.is_empty() {
        writeln!(out, "      {}", post.subtitle)?;
    }
    Ok(())
}

fn wants_more(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "" | "y" | "yes" | "s" | "sim"
    )
}
