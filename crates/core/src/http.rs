//! Request and response values exchanged between the page, the cache and the network.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// A resource request issued by the page.
///
/// Identity for caching purposes is the upper-cased method plus the URL
/// without its fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: Url,
}

impl Request {
    pub fn new(method: &str, url: Url) -> Self {
        let mut url = url;
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url }
    }

    /// A GET request for `url`.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// Whether a response carries content or stands for a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Basic,
    Error,
}

/// An immutable response: status, headers and body bytes.
///
/// `Clone` yields an independent handle; reading one copy never consumes the
/// other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub kind: ResponseKind,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { kind: ResponseKind::Basic, status, headers, body: body.into() }
    }

    /// The response a page sees when a fetch fails outright.
    pub fn network_error() -> Self {
        Self { kind: ResponseKind::Error, status: 0, headers: Vec::new(), body: Bytes::new() }
    }

    pub fn is_network_error(&self) -> bool {
        self.kind == ResponseKind::Error
    }

    /// Status in the 200-299 range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether a cache may hold this response.
    ///
    /// Failed fetches and partial content never go into a store.
    pub fn is_storable(&self) -> bool {
        !self.is_network_error() && self.status != 206
    }
}
