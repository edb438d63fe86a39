//! Fluent request configuration and dispatch.
//!
//! # Design
//! `RequestBuilder` accumulates configuration through by-value setters and
//! resolves it into an `HttpRequest` at dispatch time. Each call to
//! `dispatch` produces a fresh `Outcome`; nothing about one dispatch is
//! shared with the next except the "last completed outcome" slot, which is
//! mutex-guarded and only ever replaced whole.
//!
//! Dispatch never fails from the caller's point of view. Transport errors
//! are recorded in the `Outcome`, logged at `warn`, and handed to the
//! completion callback like any other result.
//!
//! Where the round trip runs is chosen by `DispatchMode`:
//! - `Blocking` runs on the caller's thread and returns once the callback
//!   has fired.
//! - `Spawn` starts one new thread per dispatch.
//! - `Pool` queues the dispatch on a shared, fixed-size `WorkerPool`.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, debug_span, warn, Span};
use url::Url;
use uuid::Uuid;

use crate::encode::{encode_parameters, join_lines};
use crate::error::RequestError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::outcome::Outcome;
use crate::pool::WorkerPool;
use crate::transport::{Transport, UreqTransport};

pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const DEFAULT_CONTENT_LANGUAGE: &str = "en-UK";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Completion callback. Invoked exactly once per dispatch, on the thread
/// that performed the round trip.
pub type Callback = Arc<dyn Fn(&Outcome) + Send + Sync>;

/// Where a dispatch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Blocking,
    Spawn,
    Pool,
}

/// Fluent builder for a single-shot HTTP request.
///
/// ```no_run
/// use fluent_request::{HttpMethod, RequestBuilder};
///
/// let dispatch = RequestBuilder::new()
///     .url("http://example.test/echo")
///     .parameter("name", "Bob")
///     .parameter("mood", "Happy")
///     .method(HttpMethod::Get)
///     .asynchronous(true)
///     .on_complete(|outcome| println!("Response: {}", outcome.body()))
///     .dispatch();
///
/// let outcome = dispatch.wait();
/// assert_eq!(outcome.status(), 200);
/// ```
pub struct RequestBuilder {
    url: String,
    method: HttpMethod,
    parameters: Vec<(String, String)>,
    content_type: String,
    content_language: String,
    user_agent: String,
    use_caches: bool,
    allow_request_body: bool,
    allow_response_body: bool,
    asynchronous: bool,
    on_complete: Option<Callback>,
    transport: Arc<dyn Transport>,
    pool: Option<Arc<WorkerPool>>,
    last: Arc<Mutex<Option<Outcome>>>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("parameters", &self.parameters)
            .field("content_type", &self.content_type)
            .field("content_language", &self.content_language)
            .field("user_agent", &self.user_agent)
            .field("use_caches", &self.use_caches)
            .field("allow_request_body", &self.allow_request_body)
            .field("allow_response_body", &self.allow_response_body)
            .field("mode", &self.mode())
            .field("on_complete", &self.on_complete.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::Get,
            parameters: Vec::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content_language: DEFAULT_CONTENT_LANGUAGE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            use_caches: false,
            allow_request_body: true,
            allow_response_body: true,
            asynchronous: false,
            on_complete: None,
            transport: Arc::new(UreqTransport::new()),
            pool: None,
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Append a parameter. The value is form-encoded when the request is
    /// built; the key is sent as given. Duplicate keys are kept.
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn content_language(mut self, content_language: impl Into<String>) -> Self {
        self.content_language = content_language.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Run dispatches on a new thread instead of the caller's. Ignored when
    /// a worker pool is set.
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Allow intermediaries to answer from cache. When off (the default)
    /// every request carries `Cache-Control: no-cache` and `Pragma: no-cache`.
    pub fn use_caches(mut self, use_caches: bool) -> Self {
        self.use_caches = use_caches;
        self
    }

    pub fn allow_request_body(mut self, allow: bool) -> Self {
        self.allow_request_body = allow;
        self
    }

    pub fn allow_response_body(mut self, allow: bool) -> Self {
        self.allow_response_body = allow;
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Outcome) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Run dispatches on `pool` instead of spawning a thread per request.
    pub fn worker_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn mode(&self) -> DispatchMode {
        if self.pool.is_some() {
            DispatchMode::Pool
        } else if self.asynchronous {
            DispatchMode::Spawn
        } else {
            DispatchMode::Blocking
        }
    }

    /// Resolve the current configuration into the request that `dispatch`
    /// would send.
    pub fn build_request(&self) -> HttpRequest {
        let params = encode_parameters(&self.parameters);
        let mut headers = vec![
            ("Content-Type".to_string(), self.content_type.clone()),
            ("Content-Language".to_string(), self.content_language.clone()),
            ("Content-Length".to_string(), params.len().to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ];
        if !self.use_caches {
            headers.push(("Cache-Control".to_string(), "no-cache".to_string()));
            headers.push(("Pragma".to_string(), "no-cache".to_string()));
        }

        let (url, body) = match self.method {
            HttpMethod::Get => (format!("{}?{}", self.url, params), None),
            HttpMethod::Post => (self.url.clone(), Some(params)),
        };

        HttpRequest {
            method: self.method,
            url,
            headers,
            body,
            use_caches: self.use_caches,
            allow_request_body: self.allow_request_body,
            allow_response_body: self.allow_response_body,
        }
    }

    /// Execute the configured request.
    ///
    /// The builder is left untouched and may be dispatched again; every
    /// dispatch yields its own `Outcome`. In `Blocking` mode the returned
    /// handle is already complete and the callback has already run.
    pub fn dispatch(&self) -> Dispatch {
        let request = self.build_request();
        let span = debug_span!(
            "dispatch",
            id = %Uuid::new_v4(),
            method = %request.method,
            url = %request.url
        );
        let job = DispatchJob {
            request,
            transport: Arc::clone(&self.transport),
            on_complete: self.on_complete.clone(),
            last: Arc::clone(&self.last),
            span,
        };

        match self.mode() {
            DispatchMode::Blocking => Dispatch::ready(job.run()),
            DispatchMode::Spawn => {
                let (tx, rx) = bounded(1);
                let spawned = thread::Builder::new()
                    .name("fluent-request-dispatch".to_string())
                    .spawn(move || {
                        let _ = tx.send(job.run());
                    });
                match spawned {
                    Ok(_) => Dispatch::pending(rx),
                    Err(err) => Dispatch::ready(self.fail_locally(RequestError::Transport(format!(
                        "failed to spawn dispatch thread: {err}"
                    )))),
                }
            }
            DispatchMode::Pool => {
                let Some(pool) = self.pool.as_ref() else {
                    return Dispatch::ready(self.fail_locally(RequestError::WorkerPoolClosed));
                };
                let (tx, rx) = bounded(1);
                match pool.execute(move || {
                    let _ = tx.send(job.run());
                }) {
                    Ok(()) => Dispatch::pending(rx),
                    Err(err) => Dispatch::ready(self.fail_locally(err)),
                }
            }
        }
    }

    /// Outcome of the most recently completed dispatch, if any.
    ///
    /// With overlapping asynchronous dispatches this is whichever finished
    /// last, not whichever started last.
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last.lock().clone()
    }

    /// Body of the most recently completed dispatch, empty if none.
    pub fn response(&self) -> String {
        self.last
            .lock()
            .as_ref()
            .map(|outcome| outcome.body().to_string())
            .unwrap_or_default()
    }

    /// Status of the most recently completed dispatch, 0 if none.
    pub fn status_code(&self) -> u16 {
        self.last.lock().as_ref().map_or(0, Outcome::status)
    }

    /// Complete a dispatch that could not be scheduled, on the caller's
    /// thread.
    fn fail_locally(&self, error: RequestError) -> Outcome {
        let outcome = Outcome::failure(String::new(), 0, error);
        finish(&outcome, self.on_complete.as_ref(), &self.last);
        outcome
    }
}

/// Everything one dispatch needs, detached from the builder so it can move
/// to another thread.
struct DispatchJob {
    request: HttpRequest,
    transport: Arc<dyn Transport>,
    on_complete: Option<Callback>,
    last: Arc<Mutex<Option<Outcome>>>,
    span: Span,
}

impl DispatchJob {
    fn run(self) -> Outcome {
        let _entered = self.span.enter();
        let outcome = perform(&self.request, self.transport.as_ref());
        match outcome.error() {
            None => debug!(status = outcome.status(), bytes = outcome.body().len(), "request completed"),
            Some(err) => warn!(status = outcome.status(), error = %err, "request failed"),
        }
        finish(&outcome, self.on_complete.as_ref(), &self.last);
        outcome
    }
}

/// One blocking round trip. Never panics on transport failure; the failure
/// is folded into the returned `Outcome`.
fn perform(request: &HttpRequest, transport: &dyn Transport) -> Outcome {
    if let Err(err) = Url::parse(&request.url) {
        return Outcome::failure(
            String::new(),
            0,
            RequestError::InvalidUrl {
                url: request.url.clone(),
                reason: err.to_string(),
            },
        );
    }
    if request.method == HttpMethod::Post && !request.allow_request_body {
        return Outcome::failure(String::new(), 0, RequestError::BodyNotAllowed);
    }

    let exchange = match transport.send(request) {
        Ok(exchange) => exchange,
        Err(RequestError::InvalidUrl { reason, .. }) => {
            let err = RequestError::InvalidUrl {
                url: request.url.clone(),
                reason,
            };
            return Outcome::failure(String::new(), 0, err);
        }
        Err(err) => return Outcome::failure(String::new(), 0, err),
    };

    let status = exchange.status;
    if !request.allow_response_body {
        return Outcome::success(HttpResponse {
            status,
            body: String::new(),
        });
    }

    match join_lines(exchange.body) {
        (body, None) => Outcome::success(HttpResponse { status, body }),
        (body, Some(err)) => Outcome::failure(body, status, RequestError::Read(err.to_string())),
    }
}

/// Record `outcome` as the latest and hand it to the callback.
fn finish(outcome: &Outcome, on_complete: Option<&Callback>, last: &Mutex<Option<Outcome>>) {
    *last.lock() = Some(outcome.clone());
    if let Some(callback) = on_complete {
        if catch_unwind(AssertUnwindSafe(|| callback(outcome))).is_err() {
            warn!("completion callback panicked");
        }
    }
}

/// Handle to a dispatched request.
#[derive(Debug)]
pub struct Dispatch {
    state: DispatchState,
}

#[derive(Debug)]
enum DispatchState {
    Ready(Outcome),
    Pending(Receiver<Outcome>),
}

impl Dispatch {
    fn ready(outcome: Outcome) -> Self {
        Self {
            state: DispatchState::Ready(outcome),
        }
    }

    fn pending(receiver: Receiver<Outcome>) -> Self {
        Self {
            state: DispatchState::Pending(receiver),
        }
    }

    /// Block until the dispatch has completed and return its outcome. The
    /// callback, if any, has run by the time this returns.
    pub fn wait(self) -> Outcome {
        match self.state {
            DispatchState::Ready(outcome) => outcome,
            DispatchState::Pending(receiver) => receiver.recv().unwrap_or_else(|_| abandoned()),
        }
    }

    /// The outcome if the dispatch has completed, without blocking.
    pub fn try_outcome(&mut self) -> Option<&Outcome> {
        if let DispatchState::Pending(receiver) = &self.state {
            let outcome = match receiver.try_recv() {
                Ok(outcome) => outcome,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => abandoned(),
            };
            self.state = DispatchState::Ready(outcome);
        }
        match &self.state {
            DispatchState::Ready(outcome) => Some(outcome),
            DispatchState::Pending(_) => None,
        }
    }

    pub fn is_finished(&mut self) -> bool {
        self.try_outcome().is_some()
    }
}

/// Outcome for a dispatch whose thread went away without reporting back,
/// which only happens if a `Transport` implementation panics.
fn abandoned() -> Outcome {
    Outcome::failure(
        String::new(),
        0,
        RequestError::Transport("dispatch thread terminated before completing".to_string()),
    )
}
