use std::fmt;
use std::future::Future;
use tracing::debug;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        TransportError::new(value.to_string())
    }
}

/// Issues a GET and hands back whatever the server answered.
pub trait SearchTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport. No timeout is configured: a server that never
/// answers leaves the request pending.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SearchTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(%url, status, bytes = body.len(), "search response received");
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays canned results in order and records requested URLs.
    #[derive(Debug, Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub fn replying(status: u16, body: &str) -> Self {
            let transport = Self::default();
            transport.push(Ok(RawResponse::new(status, body)));
            transport
        }

        pub fn failing(message: &str) -> Self {
            let transport = Self::default();
            transport.push(Err(TransportError::new(message)));
            transport
        }

        pub fn push(&self, reply: Result<RawResponse, TransportError>) {
            self.replies.lock().push_back(reply);
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl SearchTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
            self.requests.lock().push(url.to_string());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("no scripted reply")))
        }
    }
}
