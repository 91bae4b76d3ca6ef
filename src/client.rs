use std::collections::VecDeque;
use std::env;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use futures::future;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_BYTES,
    STREAM_DURATION, STREAM_ERRORS, STREAM_FRAGMENTS, STREAM_TTFB,
};
use crate::sse::process_sse;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest, Fragment, StreamEvent};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// A stream of decoded completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// A stream of answer fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// Client for an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct OpenAi {
    authorization: HeaderValue,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl OpenAi {
    /// Create a new client.
    ///
    /// The API key can be provided directly or read from the OPENAI_API_KEY environment
    /// variable.  A missing or blank key is a [`Error::MissingCredential`].
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                Error::missing_credential(format!(
                    "API key not provided and {API_KEY_ENV} environment variable not set"
                ))
            })?,
        };
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::missing_credential("API key is empty"));
        }
        let mut authorization = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| {
                Error::validation(
                    "API key contains characters not allowed in a header",
                    Some("api_key".to_string()),
                )
            })?;
        authorization.set_sensitive(true);

        let base_url = parse_base_url(base_url.as_deref().unwrap_or(DEFAULT_API_URL))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        // The body of a streamed answer may legitimately outlive `timeout`.
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            authorization,
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that observes every request and streamed chunk.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The deadline for connecting and receiving response headers.
    ///
    /// A response that has started streaming is not cut off by it.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(header::AUTHORIZATION, self.authorization.clone());
        headers
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
        let error_message = detail
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| error_body.clone());
        let error_param = detail.as_ref().and_then(|e| e.param.clone());

        match status_code {
            400 => Error::bad_request(error_message, error_param),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }

    /// Send a chat completion request and get a streaming response.
    ///
    /// Fails before yielding anything if the request cannot be sent or the API rejects it.  On
    /// success the returned stream yields each decoded chunk and ends at the `[DONE]` sentinel.
    /// The stream cannot be restarted; a retry is a fresh call.
    pub async fn stream(&self, mut request: ChatCompletionRequest) -> Result<ChunkStream> {
        request.stream = true;
        let url = self.base_url.join("chat/completions")?;

        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }
        CLIENT_REQUESTS.click();
        let started = Instant::now();

        let send = self
            .client
            .post(url)
            .headers(self.default_headers())
            .json(&request)
            .send();
        let response = match tokio::time::timeout(self.timeout, send).await {
            Ok(result) => result.map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.map_send_error(e)
            })?,
            Err(_) => {
                CLIENT_REQUEST_ERRORS.click();
                return Err(Error::timeout(
                    format!("No response headers within {:?}", self.timeout),
                    Some(self.timeout.as_secs_f64()),
                ));
            }
        };
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            tracing::warn!(error = %err, "chat completion request rejected");
            return Err(err);
        }

        let byte_stream = response.bytes_stream().inspect(|chunk| {
            if let Ok(bytes) = chunk {
                STREAM_BYTES.count(bytes.len() as u64);
            }
        });

        let logger = self.logger.clone();
        let chunks = process_sse(byte_stream).filter_map(move |event| {
            let item = match event {
                Ok(StreamEvent::Chunk(chunk)) => {
                    if let Some(logger) = &logger {
                        logger.log_stream_chunk(&chunk);
                    }
                    Some(Ok(chunk))
                }
                Ok(StreamEvent::Done) => None,
                Err(err) => {
                    STREAM_ERRORS.click();
                    Some(Err(err))
                }
            };
            future::ready(item)
        });

        Ok(Box::pin(chunks))
    }

    /// Send a chat completion request and stream back only the answer.
    ///
    /// Chunks without text (the leading role chunk, usage-only chunks) are skipped.  A chunk that
    /// carries a finish reason additionally yields [`Fragment::Finished`].
    pub async fn stream_text(&self, request: ChatCompletionRequest) -> Result<FragmentStream> {
        let started = Instant::now();
        let chunks = self.stream(request).await?;
        let state = TextStreamState {
            chunks,
            text: String::new(),
            pending: VecDeque::new(),
            logger: self.logger.clone(),
            started,
            saw_text: false,
        };

        let fragments = stream::unfold(Some(state), |state| async move {
            let mut state = state?;
            loop {
                if let Some(fragment) = state.pending.pop_front() {
                    return Some((Ok(fragment), Some(state)));
                }
                match state.chunks.next().await {
                    Some(Ok(chunk)) => state.absorb(&chunk),
                    Some(Err(err)) => return Some((Err(err), None)),
                    None => {
                        state.finish();
                        return None;
                    }
                }
            }
        });

        Ok(Box::pin(fragments))
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }
}

impl fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAi")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

struct TextStreamState {
    chunks: ChunkStream,
    text: String,
    pending: VecDeque<Fragment>,
    logger: Option<Arc<dyn ClientLogger>>,
    started: Instant,
    saw_text: bool,
}

impl TextStreamState {
    fn absorb(&mut self, chunk: &ChatCompletionChunk) {
        if let Some(text) = chunk.text() {
            if !self.saw_text {
                self.saw_text = true;
                STREAM_TTFB.add(self.started.elapsed().as_secs_f64());
            }
            STREAM_FRAGMENTS.click();
            self.text.push_str(text);
            self.pending.push_back(Fragment::Text(text.to_string()));
        }
        if let Some(reason) = chunk.finish_reason() {
            self.pending.push_back(Fragment::Finished(reason));
        }
    }

    fn finish(&self) {
        STREAM_DURATION.add(self.started.elapsed().as_secs_f64());
        if let Some(logger) = &self.logger {
            logger.log_stream_text(&self.text);
        }
    }
}

/// Parse a base URL, making sure relative joins land beneath its path.
fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = OpenAi::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_API_URL);
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(
            client.default_headers()[header::AUTHORIZATION],
            "Bearer test-key"
        );

        let client = OpenAi::with_options(
            Some("test-key".to_string()),
            Some("https://proxy.example.com/openai".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://proxy.example.com/openai/");
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn blank_key_is_missing_credential() {
        let err = OpenAi::new(Some("   ".to_string())).unwrap_err();
        assert!(err.is_missing_credential());
    }

    #[test]
    fn invalid_base_url() {
        let err = OpenAi::with_options(Some("k".to_string()), Some("not a url".to_string()), None)
            .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn debug_does_not_leak_key() {
        let client = OpenAi::new(Some("sk-secret".to_string())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn completions_url_is_relative_to_base() {
        let base = parse_base_url("http://127.0.0.1:9999/v1").unwrap();
        assert_eq!(
            base.join("chat/completions").unwrap().as_str(),
            "http://127.0.0.1:9999/v1/chat/completions"
        );
    }
}
