use std::time::Duration;

use thiserror::Error;

use crate::duration::format_time_delta;
use crate::types::OrderId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("unable to make {method} request to {url}: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response status: {status}\nresponse body:\n{body}")]
    Api { status: String, body: String },

    #[error("response status: {status}\nunable to read response body")]
    ApiBodyUnreadable { status: String },

    /// Body was not JSON, or a field was missing or had the wrong type.
    #[error("unable to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Order error: {0}")]
    Order(String),

    #[error("order {order_id} not fulfilled after {} ({checks} checks)", elapsed(.waited))]
    Timeout {
        order_id: OrderId,
        checks: u32,
        waited: Duration,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap this error with a message describing what the caller was doing.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any `Context` layers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

fn elapsed(waited: &Duration) -> String {
    format_time_delta(*waited)
}
