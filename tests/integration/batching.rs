//! End-to-end batching behavior against the echo transport.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use http_batch_rs::batch::StatusInterpreter;
use http_batch_rs::codec::{decode, encode_batch};
use http_batch_rs::transport::TransportError;
use http_batch_rs::{BatchClient, Error, LogicalRequest, Transport};
use reqwest::Method;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok, assert_pending};

use crate::integration::fixtures::{init_tracing, Call, EchoTransport};

fn client(transport: &Arc<EchoTransport>, max_size: usize, span_ms: u64) -> BatchClient {
    init_tracing();
    BatchClient::builder()
        .shared_transport(transport.clone())
        .max_size(max_size)
        .max_time_span(Duration::from_millis(span_ms))
        .debug(true)
        .build()
        .expect("client builds")
}

fn get(path: &str) -> LogicalRequest {
    LogicalRequest::get(&format!("https://api.example.com{}", path)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_size_trigger_closes_before_timer() {
    let transport = Arc::new(EchoTransport::default());
    let client = client(&transport, 3, 100);
    let started = Instant::now();

    let a = client.submit(get("/a"));
    tokio::time::advance(Duration::from_millis(4)).await;
    let b = client.submit(get("/b"));
    tokio::time::advance(Duration::from_millis(5)).await;
    let c = client.submit(get("/c"));
    assert_eq!(client.pending(), 0);

    let texts: Vec<String> = join_all([a, b, c])
        .await
        .into_iter()
        .map(|r| assert_ok!(r).text())
        .collect();
    assert_eq!(texts, vec!["GET /a", "GET /b", "GET /c"]);
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(transport.calls(), vec![Call::Combined(3)]);

    let stats = client.stats();
    assert_eq!(stats.windows_dispatched, 1);
    assert_eq!(stats.batched_dispatches, 1);
    assert_eq!(stats.requests_batched, 3);
}

#[tokio::test(start_paused = true)]
async fn test_timer_closes_lone_request_on_single_path() {
    let transport = Arc::new(EchoTransport::default());
    let client = client(&transport, 3, 100);
    let started = Instant::now();

    let mut pending = tokio_test::task::spawn(client.submit(get("/lonely")));
    assert_pending!(pending.poll());
    assert_eq!(client.pending(), 1);

    assert_err!(tokio::time::timeout(Duration::from_millis(50), &mut pending).await);
    assert!(transport.calls().is_empty());

    let response = assert_ok!(pending.await);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "closed after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(150), "closed after {:?}", elapsed);
    assert_eq!(response.text(), "GET /lonely");
    assert_eq!(
        transport.calls(),
        vec![Call::Single("https://api.example.com/lonely".into())]
    );
    assert_eq!(client.stats().single_dispatches, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_counts_from_window_open() {
    let transport = Arc::new(EchoTransport::default());
    let client = client(&transport, 3, 100);
    let started = Instant::now();

    let pending = client.submit(get("/late"));
    // The clock moves on before the timer task is first polled.
    tokio::time::advance(Duration::from_millis(60)).await;

    let response = assert_ok!(pending.await);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "closed after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(130), "closed after {:?}", elapsed);
    assert_eq!(response.text(), "GET /late");
}

#[tokio::test(start_paused = true)]
async fn test_zero_span_closes_on_next_tick() {
    let transport = Arc::new(EchoTransport::default());
    let client = client(&transport, 0, 0);

    // Submitted within one tick, so they share the window.
    let pending: Vec<_> = (0..4).map(|i| client.submit(get(&format!("/n/{}", i)))).collect();
    for (i, result) in join_all(pending).await.into_iter().enumerate() {
        assert_eq!(assert_ok!(result).text(), format!("GET /n/{}", i));
    }
    assert_eq!(transport.calls(), vec![Call::Combined(4)]);
}

#[tokio::test(start_paused = true)]
async fn test_responses_follow_submission_order() {
    let transport = Arc::new(EchoTransport::default());
    let client = client(&transport, 5, 1_000);

    let requests = (0..5).map(|i| {
        LogicalRequest::post(&format!("https://api.example.com/items/{}", i))
            .unwrap()
            .with_json(serde_json::json!({ "n": i }))
    });
    let results = join_all(requests.map(|r| client.send(r))).await;

    for (i, result) in results.into_iter().enumerate() {
        let text = assert_ok!(result).text();
        assert_eq!(text, format!("POST /items/{}\n{{\"n\":{}}}", i, i));
    }
    assert_eq!(transport.calls(), vec![Call::Combined(5)]);
}

#[tokio::test]
async fn test_single_call_and_one_part_batch_agree() {
    init_tracing();
    let transport = EchoTransport::default();
    let shapes = vec![
        LogicalRequest::get("https://api.example.com/same?x=1&y=two")
            .and_then(|r| r.with_header("X-Trace", "abc"))
            .unwrap(),
        LogicalRequest::post("https://api.example.com/items")
            .unwrap()
            .with_json(serde_json::json!({ "name": "ada", "tags": ["a", "b"] })),
        LogicalRequest::put("https://api.example.com:8443/notes/1")
            .and_then(|r| r.with_header("If-Match", "\"v1\""))
            .unwrap()
            .with_body("line one\r\nline two"),
        LogicalRequest::patch("https://api.example.com/items/7")
            .and_then(|r| r.with_header("Content-Type", "application/merge-patch+json"))
            .unwrap()
            .with_body(r#"{"name":null}"#),
        LogicalRequest::delete("https://api.example.com/items/7").unwrap(),
        LogicalRequest::get("https://api.example.com/status/404").unwrap(),
    ];

    for request in &shapes {
        let single = assert_ok!(transport.execute_single(request).await);

        let batch = encode_batch([request]);
        let reply = assert_ok!(transport.execute_combined(&batch).await);
        let mut parts = assert_ok!(decode(&reply, 1));
        let batched = parts.remove(0).response;

        let label = format!("{} {}", request.method(), request.url());
        assert_eq!(batched.status, single.status, "{}", label);
        assert_eq!(batched.status_text, single.status_text, "{}", label);
        assert_eq!(batched.headers, single.headers, "{}", label);
        assert_eq!(batched.body, single.body, "{}", label);
    }
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_is_shared_by_the_window() {
    let failure = Error::from(TransportError::Other("connection reset".into()));
    let transport = Arc::new(EchoTransport::failing(failure));
    let client = client(&transport, 3, 100);

    let results = join_all((0..3).map(|i| client.send(get(&format!("/f/{}", i))))).await;
    let messages: Vec<String> = results
        .into_iter()
        .map(|r| {
            let err = assert_err!(r);
            assert!(err.is_transport());
            err.to_string()
        })
        .collect();
    assert!(messages.iter().all(|m| m == &messages[0]));
    assert!(messages[0].contains("connection reset"));

    let stats = client.stats();
    assert_eq!(stats.shared_failures, 1);
    assert_eq!(stats.failed, 3);
}

#[tokio::test(start_paused = true)]
async fn test_short_reply_fails_every_entry() {
    let transport = Arc::new(EchoTransport::short_replies());
    let client = client(&transport, 2, 100);

    let (a, b) = tokio::join!(client.send(get("/a")), client.send(get("/b")));
    for result in [a, b] {
        assert!(matches!(
            result,
            Err(Error::PartCountMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }
}

#[tokio::test(start_paused = true)]
async fn test_part_status_is_classified_per_entry() {
    init_tracing();
    let transport = Arc::new(EchoTransport::default());
    let client = BatchClient::builder()
        .shared_transport(transport.clone())
        .max_size(3)
        .interpreter(StatusInterpreter)
        .build()
        .unwrap();

    let (ok, missing, also_ok) = tokio::join!(
        client.send(get("/ok")),
        client.send(get("/status/404")),
        client.send(get("/fine")),
    );
    assert_eq!(assert_ok!(ok).text(), "GET /ok");
    assert_eq!(assert_ok!(also_ok).text(), "GET /fine");
    match assert_err!(missing) {
        Error::Remote { status, body, .. } => {
            assert_eq!(status, 404);
            assert_eq!(body.as_deref(), Some(&b"GET /status/404"[..]));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_predicate_and_batched_bodies_bypass_the_window() {
    init_tracing();
    let transport = Arc::new(EchoTransport::default());
    let client = BatchClient::builder()
        .shared_transport(transport.clone())
        .max_size(2)
        .max_time_span(Duration::from_millis(100))
        .predicate(|r: &LogicalRequest| *r.method() != Method::DELETE)
        .build()
        .unwrap();

    let delete = LogicalRequest::delete("https://api.example.com/d").unwrap();
    let nested = LogicalRequest::post("https://api.example.com/api/$batch")
        .unwrap()
        .with_header("Content-Type", "multipart/mixed; boundary=inner")
        .unwrap()
        .with_body("--inner--\r\n");
    assert!(!client.should_batch(&delete));
    assert!(!client.should_batch(&nested));
    assert!(client.should_batch(&get("/g")));

    let (d, n, g1, g2) = tokio::join!(
        client.send(delete),
        client.send(nested),
        client.send(get("/g1")),
        client.send(get("/g2")),
    );
    assert_eq!(assert_ok!(d).text(), "DELETE /d");
    assert!(assert_ok!(n).text().starts_with("POST /api/$batch"));
    assert_eq!(assert_ok!(g1).text(), "GET /g1");
    assert_eq!(assert_ok!(g2).text(), "GET /g2");

    let calls = transport.calls();
    assert_eq!(calls.iter().filter(|c| matches!(c, Call::Single(_))).count(), 2);
    assert!(calls.contains(&Call::Combined(2)));
    assert_eq!(client.stats().bypassed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_flush_closes_window_early() {
    let transport = Arc::new(EchoTransport::default());
    let client = client(&transport, 10, 10_000);
    let started = Instant::now();

    let a = client.submit(get("/a"));
    let b = client.submit(get("/b"));
    assert_eq!(client.pending(), 2);
    client.flush();
    assert_eq!(client.pending(), 0);

    let (a, b) = tokio::join!(a, b);
    assert_ok!(a);
    assert_ok!(b);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(transport.calls(), vec![Call::Combined(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_caller_does_not_disturb_the_rest() {
    let transport = Arc::new(EchoTransport::default());
    let client = client(&transport, 3, 100);

    let a = client.submit(get("/a"));
    drop(client.submit(get("/gone")));
    let c = client.submit(get("/c"));

    let (a, c) = tokio::join!(a, c);
    assert_eq!(assert_ok!(a).text(), "GET /a");
    assert_eq!(assert_ok!(c).text(), "GET /c");
}

#[tokio::test(start_paused = true)]
async fn test_windows_follow_each_other() {
    let transport = Arc::new(EchoTransport::default());
    let client = client(&transport, 2, 100);

    let first = join_all((0..2).map(|i| client.send(get(&format!("/w1/{}", i))))).await;
    let second = join_all((0..3).map(|i| client.send(get(&format!("/w2/{}", i))))).await;
    assert!(first.iter().chain(second.iter()).all(|r| r.is_ok()));

    assert_eq!(
        transport.calls(),
        vec![
            Call::Combined(2),
            Call::Combined(2),
            Call::Single("https://api.example.com/w2/2".into()),
        ]
    );
    let stats = client.stats();
    assert_eq!(stats.windows_dispatched, 3);
    assert!((stats.average_batch_size() - 2.0).abs() < f64::EPSILON);
}
