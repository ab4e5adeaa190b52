//! reqwest backend against a local TCP stub.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sop_core::ChatMessage;
use sop_transport::{
    ChatBackend, ChatPayload, ClientConfig, HttpBackend, PayloadShape, RetryPolicy, TransportClient,
    TransportError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Raw request as the stub saw it.
#[derive(Debug, Clone)]
struct Captured {
    head: String,
    body: String,
}

async fn read_request(stream: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let length = head
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Captured {
        head,
        body: String::from_utf8_lossy(&buf[head_end..]).to_string(),
    }
}

/// Serve `replies` (status, body) one per connection, recording requests.
async fn stub(replies: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    tokio::spawn(async move {
        for (status, body) in replies {
            let (mut stream, _) = listener.accept().await.unwrap();
            let captured = read_request(&mut stream).await;
            log.lock().unwrap().push(captured);

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    (format!("http://{addr}/v1"), seen)
}

/// Answer one request with `body` sent in `chunks` pieces, `gap` apart.
async fn trickle_stub(body: String, chunks: usize, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request(&mut stream).await;

        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).await.unwrap();
        let piece = body.len().div_ceil(chunks);
        for part in body.as_bytes().chunks(piece) {
            tokio::time::sleep(gap).await;
            stream.write_all(part).await.unwrap();
            stream.flush().await.unwrap();
        }
        stream.shutdown().await.ok();
    });

    format!("http://{addr}/v1")
}

/// Accept one request and never answer it.
async fn silent_stub(hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request(&mut stream).await;
        tokio::time::sleep(hold).await;
    });

    format!("http://{addr}/v1")
}

fn chat_body(text: &str) -> String {
    serde_json::json!({"choices": [{"message": {"content": text}}]}).to_string()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        backoff_factor: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn test_retries_503_then_succeeds() {
    let (base, seen) = stub(vec![
        (503, "{\"error\":\"busy\"}".to_string()),
        (200, chat_body("hello")),
    ])
    .await;

    let mut config = ClientConfig::for_base(&base).with_api_key(Some("sk-test".into()));
    config.http_retry = fast_retry();
    let backend = HttpBackend::new(&config);

    let payload = ChatPayload::new("m", &[ChatMessage::user("hi")], 50, PayloadShape::Plain);
    let reply = backend
        .send(&config.endpoints[0], &payload, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(reply.status, 200);
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);

    let head = seen[1].head.to_ascii_lowercase();
    assert!(head.starts_with("post /v1/chat/completions"));
    assert!(head.contains("authorization: bearer sk-test"));
    assert!(head.contains("accept: application/json"));

    let body: serde_json::Value = serde_json::from_str(&seen[1].body).unwrap();
    assert_eq!(body["model"], "m");
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["content"], "hi");
}

#[tokio::test]
async fn test_non_retryable_status_is_returned_as_reply() {
    let (base, seen) = stub(vec![(404, "{\"error\":\"no route\"}".to_string())]).await;

    let mut config = ClientConfig::for_base(&base);
    config.http_retry = fast_retry();
    let backend = HttpBackend::new(&config);

    let payload = ChatPayload::new("m", &[ChatMessage::user("hi")], 50, PayloadShape::Plain);
    let reply = backend
        .send(&config.endpoints[1], &payload, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(reply.status, 404);
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].head.to_ascii_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn test_refused_connection_is_connect_error() {
    // Bind then drop to get a port with nothing listening.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let mut config = ClientConfig::for_base(&format!("http://{addr}/v1"));
    config.http_retry = RetryPolicy::none();
    let backend = HttpBackend::new(&config);

    let payload = ChatPayload::new("m", &[ChatMessage::user("hi")], 50, PayloadShape::Plain);
    let err = backend
        .send(&config.endpoints[0], &payload, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
}

#[tokio::test]
async fn test_client_over_http_accepts_typed_tier() {
    // First tier gets an empty 200, second tier answers.
    let (base, seen) = stub(vec![(200, chat_body("")), (200, chat_body("typed answer"))]).await;

    let config = ClientConfig::for_base(&base).without_backoff();
    let client = TransportClient::http(config);
    let text = client
        .call(&[ChatMessage::user("hi")], 50, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(text, "typed answer");
    let seen = seen.lock().unwrap().clone();
    let body: serde_json::Value = serde_json::from_str(&seen[1].body).unwrap();
    assert_eq!(body["messages"][0]["content"][0]["type"], "text");
}

#[tokio::test]
async fn test_slow_steady_reply_outlasts_read_timeout() {
    // Six pieces 150ms apart: the whole reply takes longer than
    // connect + read timeout, but no single read waits that long.
    let body = chat_body("slow but steady");
    let base = trickle_stub(body.clone(), 6, Duration::from_millis(150)).await;

    let mut config = ClientConfig::for_base(&base);
    config.connect_timeout = Duration::from_millis(100);
    config.http_retry = RetryPolicy::none();
    let backend = HttpBackend::new(&config);

    let payload = ChatPayload::new("m", &[ChatMessage::user("hi")], 50, PayloadShape::Plain);
    let reply = backend
        .send(&config.endpoints[0], &payload, Duration::from_millis(400))
        .await
        .unwrap();

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, body);
}

#[tokio::test]
async fn test_silent_server_is_timeout() {
    let base = silent_stub(Duration::from_secs(2)).await;

    let mut config = ClientConfig::for_base(&base);
    config.http_retry = RetryPolicy::none();
    let backend = HttpBackend::new(&config);

    let payload = ChatPayload::new("m", &[ChatMessage::user("hi")], 50, PayloadShape::Plain);
    let started = std::time::Instant::now();
    let err = backend
        .send(&config.endpoints[0], &payload, Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout(_)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
}
