//! Check request resolution and body reassembly against the JSON vectors in
//! `test-vectors/`.
//!
//! Request vectors pin down the target URL, body and `Content-Length` for
//! a base URL, method and ordered parameter list. Body vectors pin down how
//! raw response bytes are rejoined into `Outcome::body`.

use std::io::BufReader;
use std::sync::Arc;

use fluent_request::encode::join_lines;
use fluent_request::{Exchange, HttpMethod, HttpRequest, RequestBuilder, RequestError, Transport};

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

/// Answers every request with a fixed raw body.
struct RawBody(&'static str);

impl Transport for RawBody {
    fn send(&self, _request: &HttpRequest) -> Result<Exchange, RequestError> {
        Ok(Exchange {
            status: 200,
            body: Box::new(BufReader::new(self.0.as_bytes())),
        })
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut builder = RequestBuilder::new()
            .url(case["base_url"].as_str().unwrap())
            .method(parse_method(case["method"].as_str().unwrap()));
        for pair in case["parameters"].as_array().unwrap() {
            builder = builder.parameter(pair[0].as_str().unwrap(), pair[1].as_str().unwrap());
        }

        let req = builder.build_request();
        let expected = &case["expected"];
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.body.as_deref(), expected["body"].as_str(), "{name}: body");
        assert_eq!(
            req.header("Content-Length"),
            Some(expected["content_length"].to_string().as_str()),
            "{name}: content length"
        );
    }
}

#[test]
fn encoded_values_never_contain_raw_reserved_characters() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let req = RequestBuilder::new()
            .url("http://example.test/")
            .method(HttpMethod::Post);
        let req = case["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .fold(req, |req, pair| req.parameter(pair[0].as_str().unwrap(), pair[1].as_str().unwrap()))
            .build_request();

        let body = req.body.unwrap_or_default();
        for pair in body.split('&').filter(|pair| !pair.is_empty()) {
            let (_, value) = pair.split_once('=').unwrap();
            assert!(
                !value.contains(' ') && !value.contains('&') && !value.contains('='),
                "{name}: {value}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[test]
fn body_test_vectors() {
    let raw = include_str!("../../test-vectors/bodies.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let (body, err) = join_lines(case["raw"].as_str().unwrap().as_bytes());
        assert!(err.is_none(), "{name}: unexpected error");
        assert_eq!(body, case["expected"].as_str().unwrap(), "{name}");
    }
}

#[test]
fn dispatch_applies_body_reassembly() {
    let outcome = RequestBuilder::new()
        .url("http://example.test/")
        .transport(Arc::new(RawBody("Hello\r\nWorld\r\n")))
        .dispatch()
        .wait();
    assert_eq!(outcome.body(), "Hello\nWorld");
}
