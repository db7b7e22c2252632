//! HTTP transport tying request construction, SSE decode, and retry
//! together.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::request::ProviderRequest;
use crate::retry::{parse_retry_hint, sanitize_hint, RetryConfig, RetryContext, RetryDecision};
use crate::stream::{RawEvent, StreamDecoder, StreamEvent};

pub struct ProviderClient {
    http: reqwest::Client,
}

impl Default for ProviderClient {
    fn default() -> Self {
        ProviderClient { http: reqwest::Client::new() }
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Streams one completion, retrying pre-byte failures per `retry_config`
    /// and forwarding decoded events to `sink` as they arrive. Returns once
    /// the stream reaches `Done`/`Error`, is cancelled, or retries are
    /// exhausted.
    pub async fn stream_completion(
        &self,
        endpoint: &str,
        api_key: &str,
        request: &ProviderRequest,
        retry_config: RetryConfig,
        cancel: CancellationToken,
        sink: mpsc::UnboundedSender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let mut ctx = RetryContext::new(retry_config);
        loop {
            match self.attempt_once(endpoint, api_key, request, cancel.clone(), &sink).await {
                Ok(()) => return Ok(()),
                Err(err @ ProviderError::Http { .. }) | Err(err @ ProviderError::Network(_)) => match ctx.decide(&err) {
                    RetryDecision::Retry { delay } => {
                        tracing::warn!(attempt = ctx.attempt(), ?delay, "retrying provider request");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => continue,
                            () = cancel.cancelled() => {
                                let _ = sink.send(StreamEvent::Error { reason: "aborted".to_string(), message: "cancelled during retry backoff".to_string() });
                                return Err(ProviderError::Aborted);
                            }
                        }
                    }
                    RetryDecision::GiveUp => {
                        let exhausted = ctx.exhausted_error();
                        let _ = sink.send(StreamEvent::Error { reason: "error".to_string(), message: exhausted.to_string() });
                        return Err(exhausted);
                    }
                },
                Err(other) => return Err(other),
            }
        }
    }

    async fn attempt_once(&self, endpoint: &str, api_key: &str, request: &ProviderRequest, cancel: CancellationToken, sink: &mpsc::UnboundedSender<StreamEvent>) -> Result<(), ProviderError> {
        let response = tokio::select! {
            result = self.http.post(endpoint).bearer_auth(api_key).json(request).send() => {
                result.map_err(|e| ProviderError::Network(e.to_string()))?
            }
            () = cancel.cancelled() => return Err(ProviderError::Aborted),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let retry_after = sanitize_hint(parse_retry_hint(&body));
            return Err(ProviderError::Http { status, body, retry_after });
        }

        let mut decoder = StreamDecoder::new();
        let mut events = response.bytes_stream().eventsource();

        loop {
            tokio::select! {
                next = events.next() => {
                    match next {
                        None => return Ok(()),
                        Some(Ok(sse_event)) => {
                            if sse_event.data.is_empty() {
                                continue;
                            }
                            let raw: RawEvent = match serde_json::from_str(&sse_event.data) {
                                Ok(raw) => raw,
                                Err(e) => {
                                    let message = e.to_string();
                                    let _ = sink.send(StreamEvent::Error { reason: "error".to_string(), message: message.clone() });
                                    return Err(ProviderError::Stream(message));
                                }
                            };
                            for decoded in decoder.feed(raw) {
                                if sink.send(decoded).is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        Some(Err(e)) => {
                            let message = e.to_string();
                            let _ = sink.send(StreamEvent::Error { reason: "error".to_string(), message: message.clone() });
                            return Err(ProviderError::Stream(message));
                        }
                    }
                }
                () = cancel.cancelled() => {
                    let _ = sink.send(StreamEvent::Error { reason: "aborted".to_string(), message: "request aborted".to_string() });
                    return Err(ProviderError::Aborted);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestOptions, WireMessage, Role};

    fn empty_request() -> ProviderRequest {
        ProviderRequest { system_prompt: String::new(), wire_messages: Vec::<WireMessage>::new(), tools: Vec::new(), thinking: None, stream: true, store: false }
    }

    #[tokio::test]
    async fn aborts_before_any_byte_when_cancelled_up_front() {
        let client = ProviderClient::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = client.stream_completion("http://127.0.0.1:1/v1/messages", "key", &empty_request(), RetryConfig::default(), cancel, tx).await;
        assert!(matches!(result, Err(ProviderError::Aborted)));
        let _ = RequestOptions::default();
        let _ = Role::User;
    }
}
