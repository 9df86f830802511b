//! Page fetching capability and the static HTTP fetcher.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, instrument, warn};
use url::Url;

use firmscope_shared::{FetchConfig, FirmscopeError, Result};

/// Browser User-Agent sent with static fetches. Many company sites reject
/// obvious bot agents outright.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Maximum redirects followed per fetch.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we accept (5 MB).
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024;

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

/// What a fetcher hands back for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// Raw HTML from a static fetch.
    Html(String),
    /// Visible text from a rendered page.
    Text(String),
}

/// Retrieves one page. Implementations do not retry.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<PageContent>;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Static fetcher: a plain GET with a browser User-Agent.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Allow a localhost/private first hop (for tests against mock servers).
    /// Redirects are always checked.
    allow_localhost: bool,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher with the timeout from `config`.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Self::with_timeout(config.timeout)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(redirect_policy())
            .timeout(timeout)
            .build()
            .map_err(|e| FirmscopeError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_localhost: false,
            max_body_bytes: MAX_RESPONSE_SIZE,
        })
    }

    /// Allow fetching localhost/private IPs (for tests).
    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    #[cfg(test)]
    fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// GET `url` and return the body as text.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_html(&self, url: &Url) -> Result<String> {
        if !self.allow_localhost && is_ssrf_target(url) {
            warn!("SSRF protection: blocked");
            return Err(FirmscopeError::validation(format!(
                "refusing to fetch local or private address: {url}"
            )));
        }

        debug!("fetching page");

        let mut response = self.client.get(url.as_str()).send().await.map_err(|e| {
            if e.is_timeout() {
                FirmscopeError::Timeout(format!("{url}: {e}"))
            } else if e.is_redirect() {
                FirmscopeError::validation(format!("{url}: {e}"))
            } else {
                FirmscopeError::Transport(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FirmscopeError::upstream(
                url.as_str(),
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        let max = self.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > max as u64 {
                return Err(too_large(url, max));
            }
        }

        // Content-Length is absent on chunked responses, so count as we read.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                FirmscopeError::Timeout(format!("{url}: {e}"))
            } else {
                FirmscopeError::Transport(format!("{url}: body read failed: {e}"))
            }
        })? {
            if body.len() + chunk.len() > max {
                return Err(too_large(url, max));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn too_large(url: &Url, max: usize) -> FirmscopeError {
    warn!(max_bytes = max, "response body over size cap");
    FirmscopeError::validation(format!("{url}: response too large (max {max} bytes)"))
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<PageContent> {
        self.fetch_html(url).await.map(PageContent::Html)
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// What to do with one redirect hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectStep {
    Follow,
    /// Hop limit reached; the redirect response itself is returned.
    Stop,
    /// The target is local or private.
    Refuse,
}

/// `hops` is the number of redirects already followed.
fn redirect_step(next: &Url, hops: usize) -> RedirectStep {
    if is_ssrf_target(next) {
        RedirectStep::Refuse
    } else if hops >= MAX_REDIRECTS {
        RedirectStep::Stop
    } else {
        RedirectStep::Follow
    }
}

/// Redirect policy that re-applies the SSRF check to every hop.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        match redirect_step(attempt.url(), attempt.previous().len()) {
            RedirectStep::Follow => attempt.follow(),
            RedirectStep::Stop => attempt.stop(),
            RedirectStep::Refuse => {
                warn!(target_url = %attempt.url(), "SSRF protection: redirect blocked");
                attempt.error("redirect to local or private address")
            }
        }
    })
}

/// Check if a URL targets a potentially dangerous resource.
///
/// Search results are untrusted input, so anything that is not a public
/// http(s) address is refused.
pub fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            let host = host.to_ascii_lowercase();
            host == "localhost"
                || host.ends_with(".localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (v6.segments()[0] & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}
