//! Fluent, callback-driven HTTP request builder.
//!
//! # Overview
//! `RequestBuilder` collects a URL, method, form parameters, a few headers
//! and transport flags through chained setters, then `dispatch` performs one
//! blocking round trip either on the caller's thread, on a freshly spawned
//! thread, or on a bounded `WorkerPool`. The result arrives as an `Outcome`
//! both through the optional completion callback and through the returned
//! `Dispatch` handle.
//!
//! # Design
//! - Configuration resolves into a plain-data `HttpRequest` before any I/O,
//!   so URL construction and headers are testable without a network.
//! - The network sits behind the `Transport` trait; `UreqTransport` is the
//!   default.
//! - Failures never escape `dispatch`. They are carried in the `Outcome`
//!   so callers can tell "no response" apart from "empty response".

pub mod encode;
pub mod error;
pub mod http;
pub mod outcome;
pub mod pool;
pub mod request;
pub mod transport;

pub use error::RequestError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use outcome::Outcome;
pub use pool::WorkerPool;
pub use request::{
    Callback, Dispatch, DispatchMode, RequestBuilder, DEFAULT_CONTENT_LANGUAGE, DEFAULT_CONTENT_TYPE,
    DEFAULT_USER_AGENT,
};
pub use transport::{Exchange, Transport, UreqTransport};
