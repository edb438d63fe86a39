//! Echo server used to observe what the request builder puts on the wire.

use std::time::Duration;

use axum::{
    extract::{Path, Query, RawQuery},
    http::{HeaderMap, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Everything the server saw of one request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub params: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub content_language: Option<String>,
    pub content_length: Option<String>,
    pub user_agent: Option<String>,
    pub cache_control: Option<String>,
    pub pragma: Option<String>,
    pub body: String,
}

#[derive(Deserialize)]
pub struct LinesQuery {
    pub count: usize,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", get(echo).post(echo))
        .route("/lines", get(lines))
        .route("/status/{code}", get(status))
        .route("/delay/{ms}", get(delay))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, RawQuery(query): RawQuery, headers: HeaderMap, body: String) -> Json<Echo> {
    let params = if method == Method::POST {
        decode_pairs(&body)
    } else {
        decode_pairs(query.as_deref().unwrap_or_default())
    };
    tracing::debug!(%method, ?query, params = params.len(), "echo");

    Json(Echo {
        method: method.to_string(),
        query,
        params,
        content_type: header(&headers, "content-type"),
        content_language: header(&headers, "content-language"),
        content_length: header(&headers, "content-length"),
        user_agent: header(&headers, "user-agent"),
        cache_control: header(&headers, "cache-control"),
        pragma: header(&headers, "pragma"),
        body,
    })
}

/// Respond with `count` numbered lines, each terminated by `\n`.
async fn lines(Query(query): Query<LinesQuery>) -> String {
    (1..=query.count).map(|n| format!("line {n}\n")).collect()
}

async fn status(Path(code): Path<u16>) -> (StatusCode, String) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, format!("status {code}"))
}

async fn delay(Path(ms): Path<u64>) -> String {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    format!("waited {ms}ms")
}

fn decode_pairs(input: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
