//! Language model access for Firmscope.
//!
//! - [`CompletionProvider`] / [`OpenAiClient`]: one chat completion per call
//! - [`RetryPolicy`]: bounded retries with fixed back-off
//! - [`StructuredExtractor`]: completion → fence stripping → [`Parsed`] value

mod client;
mod retry;
mod structured;
mod types;

pub use client::{CompletionProvider, OpenAiClient};
pub use retry::{RetryPolicy, is_retriable};
pub use structured::{Parsed, StructuredExtractor, strip_code_fences};
pub use types::{ChatRequest, CompletionRequest, Message, ResponseFormat, Usage};
