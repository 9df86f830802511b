//! Structured extraction: model output parsed into typed values.
//!
//! Transport-level failures are retried under the [`RetryPolicy`]. Once a
//! completion arrives, it is parsed exactly once: a parse or validation
//! failure yields [`Parsed::Malformed`] immediately, never a retry and never
//! a partially-filled value.

use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use firmscope_shared::{ExtractionSettings, FirmscopeError, Result};

use crate::client::CompletionProvider;
use crate::retry::RetryPolicy;
use crate::types::CompletionRequest;

/// Outcome of parsing one model response.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// The response parsed and validated.
    Valid(T),
    /// The response arrived but could not be used; carries the raw text.
    Malformed(String),
}

impl<T> Parsed<T> {
    pub fn valid(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Malformed(_) => None,
        }
    }
}

/// Remove Markdown code fences (```` ``` ```` and ```` ```json ````) and trim.
pub fn strip_code_fences(raw: &str) -> String {
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"```(?:json|JSON)?").expect("fence regex"));

    FENCE_RE.replace_all(raw, "").trim().to_string()
}

/// Runs completions under a retry policy and parses their output.
#[derive(Clone)]
pub struct StructuredExtractor {
    provider: Arc<dyn CompletionProvider>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl StructuredExtractor {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            policy,
            attempt_timeout,
        }
    }

    pub fn from_settings(provider: Arc<dyn CompletionProvider>, settings: &ExtractionSettings) -> Self {
        Self::new(
            provider,
            RetryPolicy::from_settings(settings),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// One call, bounded by the per-attempt timeout, no retry.
    pub async fn complete_once(&self, request: &CompletionRequest) -> Result<String> {
        match tokio::time::timeout(self.attempt_timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(FirmscopeError::Timeout(format!(
                "completion exceeded {}s",
                self.attempt_timeout.as_secs()
            ))),
        }
    }

    /// Extract a value that deserializes directly from the model's JSON.
    ///
    /// Missing required fields make the response [`Parsed::Malformed`].
    pub async fn extract<T: DeserializeOwned>(
        &self,
        label: &str,
        request: &CompletionRequest,
    ) -> Result<Parsed<T>> {
        self.extract_with(label, request, |cleaned| {
            serde_json::from_str::<T>(cleaned).map_err(|e| e.to_string())
        })
        .await
    }

    /// Extract with a custom parser applied to the fence-stripped response.
    ///
    /// Fails only with [`FirmscopeError::ExtractionFailed`] (retries exhausted)
    /// or a non-retriable provider error.
    #[instrument(skip_all, fields(label = %label))]
    pub async fn extract_with<T, P>(
        &self,
        label: &str,
        request: &CompletionRequest,
        parse: P,
    ) -> Result<Parsed<T>>
    where
        P: FnOnce(&str) -> std::result::Result<T, String>,
    {
        let raw = self
            .policy
            .run(label, || self.complete_once(request))
            .await?;

        let cleaned = strip_code_fences(&raw);
        match parse(&cleaned) {
            Ok(value) => {
                debug!("model output parsed");
                Ok(Parsed::Valid(value))
            }
            Err(reason) => {
                warn!(%reason, raw = %raw, "model output malformed");
                Ok(Parsed::Malformed(raw))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use firmscope_shared::ExtractedExecutive;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted results in order; errors once the script runs out.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(next) => next,
                None => Err(FirmscopeError::Transport("script exhausted".into())),
            }
        }
    }

    fn extractor(provider: Arc<ScriptedProvider>) -> StructuredExtractor {
        StructuredExtractor::new(
            provider,
            RetryPolicy::fixed(3, Duration::ZERO),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn strips_json_fences() {
        assert_eq!(
            strip_code_fences("```json\n[{\"name\":\"Jane Doe\",\"title\":\"CEO\"}]\n```"),
            r#"[{"name":"Jane Doe","title":"CEO"}]"#
        );
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[tokio::test]
    async fn fenced_executive_list_parses() {
        let provider = ScriptedProvider::new(vec![Ok(
            "```json\n[{\"name\":\"Jane Doe\",\"title\":\"CEO\"}]\n```".into(),
        )]);
        let parsed: Parsed<Vec<ExtractedExecutive>> = extractor(provider.clone())
            .extract("leadership", &CompletionRequest::new("text"))
            .await
            .unwrap();

        assert_eq!(
            parsed,
            Parsed::Valid(vec![ExtractedExecutive {
                name: "Jane Doe".into(),
                title: "CEO".into()
            }])
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_output_is_not_retried() {
        let provider = ScriptedProvider::new(vec![
            Ok("Sorry, I could not find any executives.".into()),
            Ok("[]".into()),
        ]);
        let parsed: Parsed<Vec<ExtractedExecutive>> = extractor(provider.clone())
            .extract("leadership", &CompletionRequest::new("text"))
            .await
            .unwrap();

        assert!(matches!(parsed, Parsed::Malformed(ref raw) if raw.starts_with("Sorry")));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_required_key_is_malformed() {
        let provider = ScriptedProvider::new(vec![Ok(r#"[{"name":"Jane Doe"}]"#.into())]);
        let parsed: Parsed<Vec<ExtractedExecutive>> = extractor(provider)
            .extract("leadership", &CompletionRequest::new("text"))
            .await
            .unwrap();
        assert!(parsed.valid().is_none());
    }

    #[tokio::test]
    async fn transient_failures_are_retried_then_parsed() {
        let provider = ScriptedProvider::new(vec![
            Err(FirmscopeError::Timeout("30s".into())),
            Err(FirmscopeError::MalformedResponse("no choices".into())),
            Ok("[]".into()),
        ]);
        let parsed: Parsed<Vec<ExtractedExecutive>> = extractor(provider.clone())
            .extract("leadership", &CompletionRequest::new("text"))
            .await
            .unwrap();
        assert_eq!(parsed, Parsed::Valid(vec![]));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn all_attempts_timing_out_is_extraction_failed() {
        let provider = ScriptedProvider::new(vec![
            Err(FirmscopeError::Timeout("attempt 1".into())),
            Err(FirmscopeError::Timeout("attempt 2".into())),
            Err(FirmscopeError::Timeout("attempt 3".into())),
        ]);
        let err = extractor(provider.clone())
            .extract::<Vec<ExtractedExecutive>>("leadership", &CompletionRequest::new("text"))
            .await
            .unwrap_err();

        assert!(matches!(err, FirmscopeError::ExtractionFailed { attempts: 3, .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn custom_parser_sees_stripped_text() {
        let provider = ScriptedProvider::new(vec![Ok("```json\n{\"a\": 1}\n```".into())]);
        let parsed = extractor(provider)
            .extract_with("custom", &CompletionRequest::new("x"), |cleaned| {
                if cleaned.starts_with('{') {
                    Ok(cleaned.len())
                } else {
                    Err("not an object".into())
                }
            })
            .await
            .unwrap();
        assert_eq!(parsed, Parsed::Valid(8));
    }

    struct HangingProvider;

    #[async_trait]
    impl CompletionProvider for HangingProvider {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_provider_is_bounded_per_attempt() {
        let extractor = StructuredExtractor::new(
            Arc::new(HangingProvider),
            RetryPolicy::fixed(2, Duration::from_secs(2)),
            Duration::from_secs(30),
        );
        let started = tokio::time::Instant::now();
        let err = extractor
            .extract::<serde_json::Value>("hang", &CompletionRequest::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(err, FirmscopeError::ExtractionFailed { attempts: 2, .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(62));
    }
}
