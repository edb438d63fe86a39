//! The blocking I/O seam between a resolved `HttpRequest` and the network.
//!
//! # Design
//! `RequestBuilder` only ever talks to a `Transport`. The default
//! `UreqTransport` performs the round trip with `ureq`; tests substitute
//! in-memory transports to exercise dispatch without sockets.

use std::io::{BufRead, BufReader};

use crate::error::RequestError;
use crate::http::{HttpMethod, HttpRequest};

/// A response whose status has been read but whose body is still on the
/// wire. Dropping it releases the connection.
pub struct Exchange {
    pub status: u16,
    pub body: Box<dyn BufRead>,
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange").field("status", &self.status).finish_non_exhaustive()
    }
}

/// Performs one blocking round trip per call.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<Exchange, RequestError>;
}

/// `Transport` backed by a `ureq` agent.
///
/// 4xx and 5xx responses are returned as data, not as errors, so their
/// status and body reach the caller.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<Exchange, RequestError> {
        let response = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(request.url.as_str()), request).call()?,
            HttpMethod::Post => {
                let body = request.body.as_deref().unwrap_or_default();
                with_headers(self.agent.post(request.url.as_str()), request).send(body.as_bytes())?
            }
        };

        let status = response.status().as_u16();
        let reader = response.into_body().into_reader();
        Ok(Exchange {
            status,
            body: Box::new(BufReader::new(reader)),
        })
    }
}

/// Copy the request headers onto a `ureq` builder. `Content-Length` is left
/// to `ureq`, which derives it from the body actually sent.
fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
