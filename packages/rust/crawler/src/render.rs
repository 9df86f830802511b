//! JS-rendering fetcher backed by a WebDriver (headless Chrome).
//!
//! Each fetch opens its own browser session and always quits it. A semaphore
//! bounds live sessions to the configured pool size no matter how many
//! requests are in flight.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use url::Url;

use firmscope_extract::{ParagraphRule, select_paragraphs};
use firmscope_shared::{FetchConfig, FirmscopeError, Result};

use crate::fetcher::{PageContent, PageFetcher};

const CHROME_ARGS: [&str; 4] = [
    "--headless",
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
];

fn render_error(url: &Url, e: impl std::fmt::Display) -> FirmscopeError {
    FirmscopeError::Render(format!("{url}: {e}"))
}

/// Fetcher that loads pages in a real browser and returns visible paragraph text.
pub struct RenderingFetcher {
    webdriver_url: String,
    pool: Arc<Semaphore>,
    settle: Duration,
    page_timeout: Duration,
    rule: ParagraphRule,
}

impl RenderingFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            pool: Arc::new(Semaphore::new(config.render_workers.max(1))),
            settle: config.render_settle,
            page_timeout: config.timeout + config.render_settle,
            rule: ParagraphRule::from(config),
        }
    }

    /// Number of sessions that may still be opened right now.
    pub fn available_sessions(&self) -> usize {
        self.pool.available_permits()
    }

    async fn open_session(&self, url: &Url) -> Result<WebDriver> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in CHROME_ARGS {
            caps.add_arg(arg).map_err(|e| render_error(url, e))?;
        }
        WebDriver::new(self.webdriver_url.as_str(), caps)
            .await
            .map_err(|e| render_error(url, e))
    }

    async fn collect_paragraphs(&self, driver: &WebDriver, url: &Url) -> Result<String> {
        driver
            .goto(url.as_str())
            .await
            .map_err(|e| render_error(url, e))?;

        // Give client-side rendering time to populate the DOM.
        tokio::time::sleep(self.settle).await;

        let elements = driver
            .find_all(By::Tag("p"))
            .await
            .map_err(|e| render_error(url, e))?;

        let mut texts = Vec::with_capacity(elements.len());
        for el in elements {
            match el.text().await {
                Ok(text) => texts.push(text),
                Err(e) => debug!(error = %e, "skipping unreadable paragraph"),
            }
        }

        Ok(select_paragraphs(texts, self.rule))
    }
}

#[async_trait]
impl PageFetcher for RenderingFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<PageContent> {
        let _permit = self
            .pool
            .acquire()
            .await
            .map_err(|e| render_error(url, e))?;

        let driver = self.open_session(url).await?;
        let outcome =
            tokio::time::timeout(self.page_timeout, self.collect_paragraphs(&driver, url)).await;

        if let Err(e) = driver.quit().await {
            warn!(error = %e, "failed to quit browser session");
        }

        match outcome {
            Ok(text) => text.map(PageContent::Text),
            Err(_) => Err(FirmscopeError::Timeout(format!(
                "{url}: rendering exceeded {}s",
                self.page_timeout.as_secs()
            ))),
        }
    }
}
