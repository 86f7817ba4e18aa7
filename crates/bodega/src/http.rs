use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use vmlease_core::{Error, Result};

/// Authenticated JSON client for the Bodega API.
#[derive(Clone)]
pub struct HttpClient {
    auth: String,
    client: Client,
}

impl HttpClient {
    /// Build a client that sends `auth` as the `Authorization` header.
    ///
    /// Certificate verification is disabled: the lab host serves a
    /// certificate that does not validate.
    pub fn new(auth: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| Error::Config(format!("unable to build HTTP client: {e}")))?;
        Ok(Self {
            auth: auth.into(),
            client,
        })
    }

    #[instrument(skip(self, url), fields(url = %url), name = "bodega_get")]
    pub async fn get<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let request = self
            .client
            .get(url.clone())
            .header(reqwest::header::AUTHORIZATION, &self.auth);
        self.execute("GET", url, request).await
    }

    #[instrument(skip(self, url, body), fields(url = %url), name = "bodega_post")]
    pub async fn post<B, T>(&self, url: &Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // `.json()` sets Content-Type: application/json
        let request = self
            .client
            .post(url.clone())
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .json(body);
        self.execute("POST", url, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &'static str,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await.map_err(|source| Error::Request {
            method,
            url: url.to_string(),
            source,
        })?;

        let response = check_status(response).await?;
        let body = response.text().await.map_err(|source| Error::Request {
            method,
            url: url.to_string(),
            source,
        })?;
        debug!(bytes = body.len(), "received response");

        decode(url, &body)
    }
}

/// Map a non-2xx response to an error carrying its status line and body.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(status_error(status.to_string(), response.text().await))
}

fn status_error<E>(status: String, body: std::result::Result<String, E>) -> Error {
    match body {
        Ok(body) => Error::Api { status, body },
        Err(_) => Error::ApiBodyUnreadable { status },
    }
}

/// Decode a response body. Malformed JSON, missing fields and
/// wrongly-typed fields all end up as `Error::Decode`.
pub(crate) fn decode<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
