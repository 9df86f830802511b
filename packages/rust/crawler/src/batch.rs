//! Bounded-concurrency source fetching for a pipeline run.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use firmscope_extract::{ParagraphRule, visible_paragraph_text};
use firmscope_shared::{FetchOutcome, SourceDocument};

use crate::fetcher::{PageContent, PageFetcher};

/// Fetch every URL with at most `concurrency` requests in flight.
///
/// The result has one entry per input URL, in input order. A failed fetch
/// becomes a [`FetchOutcome::Failed`] marker; it never aborts the batch.
#[instrument(skip_all, fields(urls = urls.len(), concurrency = concurrency))]
pub async fn fetch_sources(
    fetcher: Arc<dyn PageFetcher>,
    urls: &[Url],
    concurrency: usize,
    rule: ParagraphRule,
) -> Vec<SourceDocument> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    // Dropping the set aborts any task still running.
    let mut tasks = JoinSet::new();

    for (idx, url) in urls.iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let sem = Arc::clone(&semaphore);
        let url = url.clone();

        tasks.spawn(async move {
            let outcome = match sem.acquire().await {
                Ok(_permit) => fetch_one(fetcher.as_ref(), &url, rule).await,
                Err(e) => FetchOutcome::Failed(e.to_string()),
            };
            (idx, SourceDocument { url, outcome })
        });
    }

    let mut documents: Vec<SourceDocument> = urls
        .iter()
        .map(|url| SourceDocument {
            url: url.clone(),
            outcome: FetchOutcome::Failed("fetch task failed".to_string()),
        })
        .collect();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, doc)) => documents[idx] = doc,
            Err(e) => warn!(error = %e, "fetch task failed"),
        }
    }

    let failed = documents.iter().filter(|d| d.text().is_none()).count();
    info!(
        fetched = documents.len() - failed,
        failed, "source fetch completed"
    );

    documents
}

async fn fetch_one(fetcher: &dyn PageFetcher, url: &Url, rule: ParagraphRule) -> FetchOutcome {
    match fetcher.fetch(url).await {
        Ok(PageContent::Html(html)) => FetchOutcome::Text(visible_paragraph_text(&html, rule)),
        Ok(PageContent::Text(text)) => FetchOutcome::Text(text),
        Err(e) => {
            debug!(%url, error = %e, "source fetch failed");
            FetchOutcome::Failed(e.to_string())
        }
    }
}
