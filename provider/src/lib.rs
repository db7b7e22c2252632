//! The LLM provider adapter: request construction, SSE streaming decode, and retry policy.
//! Transport-agnostic over which concrete provider endpoint is called; `kestrel-agent-core`
//! supplies the endpoint and credential.

pub mod client;
pub mod error;
pub mod request;
pub mod retry;
pub mod stream;

pub use client::ProviderClient;
pub use error::ProviderError;
pub use request::{build_request, ProviderRequest, RequestOptions, Role, ThinkingConfig, WireMessage};
pub use retry::{parse_retry_hint, sanitize_hint, RetryConfig, RetryContext, RetryDecision};
pub use stream::{RawEvent, StreamDecoder, StreamEvent};
