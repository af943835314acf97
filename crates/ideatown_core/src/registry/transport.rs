//! Minimal HTTP transport seam used by the registry client.

use reqwest::blocking::Client;
use reqwest::Method;
use std::time::Duration;

/// Verbs the registry protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Outgoing request; registry calls never carry a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes one request. `Err` means no HTTP response was obtained.
pub trait HttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

/// `reqwest` blocking transport.
///
/// No request timeout is set; a stalled registry call stalls its caller.
pub struct BlockingHttpTransport {
    client: Client,
}

impl BlockingHttpTransport {
    pub fn new() -> Result<Self, String> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| format!("failed to create HTTP client: {err}"))?;
        Ok(Self { client })
    }
}

impl HttpTransport for BlockingHttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|err| err.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|err| err.to_string())?;
        Ok(HttpResponse { status, body })
    }
}
