//! HttpTransport against a mockito server.

use std::io::Write;
use std::time::Duration;

use http_batch_rs::codec::CONTENT_ID_PREFIX;
use http_batch_rs::{BatchClient, HttpTransport, HttpTransportConfig, LogicalRequest, Transport};
use mockito::{Matcher, Server};
use tokio_test::{assert_err, assert_ok};

use crate::integration::fixtures::init_tracing;

fn multipart_reply(boundary: &str, parts: &[(u16, &str, &str)]) -> String {
    let mut body = String::from("preamble to ignore\r\n");
    for (i, (status, reason, text)) in parts.iter().enumerate() {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Type: application/http\r\nContent-ID: <response-{CONTENT_ID_PREFIX}+{i}>\r\n\r\nHTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\r\n{text}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

#[tokio::test]
async fn test_combined_call_round_trip() {
    init_tracing();
    let mut server = Server::new_async().await;
    let base = server.url();

    let batch_mock = server
        .mock("POST", "/api/$batch")
        .match_header(
            "content-type",
            Matcher::Regex(r"^multipart/mixed; boundary=batch_[0-9a-f]{32}$".into()),
        )
        .match_header("authorization", "Bearer s3cret")
        .match_header("x-client", "http-batch-tests")
        .match_query(Matcher::UrlEncoded("tenant".into(), "acme".into()))
        .match_body(Matcher::Regex(r"GET /users/2 HTTP/1\.1\r\n".into()))
        .with_status(200)
        .with_header("content-type", "multipart/batch; boundary=srv")
        .with_body(multipart_reply(
            "srv",
            &[(200, "OK", r#"{"id":1}"#), (200, "OK", r#")]}',
{"id":2}"#)],
        ))
        .expect(1)
        .create_async()
        .await;

    let client = BatchClient::builder()
        .http(
            HttpTransportConfig::for_origin(&base)
                .with_bearer_token("s3cret")
                .with_default_header("X-Client", "http-batch-tests")
                .with_default_query("tenant", "acme"),
        )
        .max_size(2)
        .max_time_span(Duration::from_millis(500))
        .strict_content_ids(true)
        .build()
        .unwrap();

    let (one, two) = tokio::join!(
        client.send(LogicalRequest::get(&format!("{}/users/1", base)).unwrap()),
        client.send(LogicalRequest::get(&format!("{}/users/2", base)).unwrap()),
    );
    let one: serde_json::Value = assert_ok!(assert_ok!(one).json());
    let two: serde_json::Value = assert_ok!(assert_ok!(two).json());
    assert_eq!(one["id"], 1);
    assert_eq!(two["id"], 2);

    batch_mock.assert_async().await;
}

#[tokio::test]
async fn test_lone_request_goes_out_unwrapped() {
    init_tracing();
    let mut server = Server::new_async().await;
    let base = server.url();

    let batch_mock = server
        .mock("POST", "/api/$batch")
        .expect(0)
        .create_async()
        .await;
    let direct_mock = server
        .mock("PUT", "/notes/3")
        .match_header("content-type", "application/json")
        .match_body(Matcher::JsonString(r#"{"text":"hi"}"#.into()))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let client = BatchClient::builder()
        .http(HttpTransportConfig::for_origin(&base))
        .max_time_span(Duration::from_millis(10))
        .build()
        .unwrap();

    let request = LogicalRequest::put(&format!("{}/notes/3", base))
        .unwrap()
        .with_json(serde_json::json!({ "text": "hi" }));
    let response = assert_ok!(client.send(request).await);
    assert_eq!(response.status, 201);
    assert_eq!(response.text(), r#"{"ok":true}"#);

    direct_mock.assert_async().await;
    batch_mock.assert_async().await;
}

#[tokio::test]
async fn test_outer_failure_reaches_every_caller() {
    init_tracing();
    let mut server = Server::new_async().await;
    let base = server.url();

    let _batch_mock = server
        .mock("POST", "/api/$batch")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let client = BatchClient::builder()
        .http(HttpTransportConfig::for_origin(&base))
        .max_size(3)
        .build()
        .unwrap();

    let send = |path: &str| client.send(LogicalRequest::get(&format!("{}{}", base, path)).unwrap());
    let (a, b, c) = tokio::join!(send("/a"), send("/b"), send("/c"));
    for result in [a, b, c] {
        let err = assert_err!(result);
        assert!(err.is_transport());
        assert_eq!(err.status(), Some(503));
    }
    assert_eq!(client.stats().shared_failures, 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    init_tracing();
    let client = BatchClient::builder()
        .http(HttpTransportConfig::new("http://127.0.0.1:9/api/$batch").with_timeout(Duration::from_secs(2)))
        .max_size(2)
        .build()
        .unwrap();

    let (a, b) = tokio::join!(
        client.send(LogicalRequest::get("http://127.0.0.1:9/x").unwrap()),
        client.send(LogicalRequest::get("http://127.0.0.1:9/y").unwrap()),
    );
    assert!(assert_err!(a).is_transport());
    assert!(assert_err!(b).is_transport());
}

#[tokio::test]
async fn test_explicit_timeout_wins_over_environment() {
    init_tracing();
    // Only `ClientConfig::apply_env` reads this; building a transport must not.
    std::env::set_var("HTTP_BATCH_TIMEOUT_SECS", "60");
    let mut server = Server::new_async().await;
    let base = server.url();
    let _slow = server
        .mock("GET", "/slow")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(1_500));
            w.write_all(b"late")
        })
        .create_async()
        .await;

    let transport = assert_ok!(HttpTransport::new(
        HttpTransportConfig::for_origin(&base).with_timeout(Duration::from_millis(300))
    ));
    assert_eq!(transport.config().timeout(), Duration::from_millis(300));

    let started = std::time::Instant::now();
    let request = LogicalRequest::get(&format!("{}/slow", base)).unwrap();
    let err = assert_err!(transport.execute_single(&request).await);
    assert!(err.is_transport());
    assert!(started.elapsed() < Duration::from_millis(1_200), "took {:?}", started.elapsed());
    std::env::remove_var("HTTP_BATCH_TIMEOUT_SECS");
}

#[test]
fn test_bad_batch_url_fails_build() {
    let err = BatchClient::builder()
        .http(HttpTransportConfig::new("not a url"))
        .build()
        .err()
        .expect("build should fail");
    assert!(matches!(err, http_batch_rs::Error::Configuration { .. }));
}
