//! HTTP transport types described as plain data.
//!
//! # Design
//! `RequestBuilder` resolves its configuration into an `HttpRequest` before
//! anything touches the network. The target URL, header set and body are
//! therefore fixed values that can be inspected in tests, and the
//! `Transport` only has to put them on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved outbound request.
///
/// For `Get` the encoded parameters are already appended to `url` and `body`
/// is `None`. For `Post` `url` is the bare base URL and the encoded
/// parameters travel as `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub use_caches: bool,
    pub allow_request_body: bool,
    pub allow_response_body: bool,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response described as plain data: status plus the body text as it was
/// reassembled from received lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_renders_upper_case() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/".to_string(),
            headers: vec![("User-Agent".to_string(), "Mozilla/5.0".to_string())],
            body: None,
            use_caches: false,
            allow_request_body: true,
            allow_response_body: true,
        };
        assert_eq!(req.header("user-agent"), Some("Mozilla/5.0"));
        assert_eq!(req.header("content-type"), None);
    }
}
