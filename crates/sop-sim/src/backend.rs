//! Simulated chat backends.
//!
//! [`ScriptedBackend`] replays a fixed list of results and records every
//! request it sees. [`FaultyBackend`] wraps any backend and replaces some
//! requests with seeded transport faults.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use sop_transport::{ChatBackend, ChatPayload, HttpReply, TransportError};

use crate::fault::{FaultConfig, FaultInjector, FaultStats, TransportFault};
use crate::random::SimRng;

/// 200 reply in the chat-completions shape.
#[must_use]
pub fn chat_reply(text: &str) -> HttpReply {
    let body = serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    });
    HttpReply {
        status: 200,
        body: body.to_string(),
    }
}

/// 200 reply in the legacy completions shape.
#[must_use]
pub fn legacy_reply(text: &str) -> HttpReply {
    let body = serde_json::json!({ "choices": [{ "text": text }] });
    HttpReply {
        status: 200,
        body: body.to_string(),
    }
}

/// 200 reply whose content is empty.
#[must_use]
pub fn empty_reply() -> HttpReply {
    chat_reply("")
}

/// Error status reply with a short body.
#[must_use]
pub fn status_reply(status: u16) -> HttpReply {
    HttpReply {
        status,
        body: format!("{{\"error\":\"simulated {status}\"}}"),
    }
}

/// One request observed by a simulated backend.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub url: String,
    pub payload: ChatPayload,
    pub read_timeout: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Replays scripted results in order.
///
/// Once the script runs out every further request fails with a
/// connection error, which is what an unreachable server looks like.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    requests: Mutex<Vec<SentRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<HttpReply, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Backend where every request is refused.
    #[must_use]
    pub fn always_failing() -> Self {
        Self::default()
    }

    /// Shorthand for a script of successful chat replies.
    pub fn replies<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(texts.into_iter().map(|t| Ok(chat_reply(t.as_ref()))).collect())
    }

    /// Append one result to the end of the script.
    pub fn push(&self, result: Result<HttpReply, TransportError>) {
        lock(&self.script).push_back(result);
    }

    /// Every request seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<SentRequest> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn requests_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Scripted results not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

impl ChatBackend for ScriptedBackend {
    async fn send(
        &self,
        url: &str,
        payload: &ChatPayload,
        read_timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        lock(&self.requests).push(SentRequest {
            url: url.to_string(),
            payload: payload.clone(),
            read_timeout,
        });
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect(format!("{url}: script exhausted"))))
    }
}

/// Injects seeded faults in front of another backend.
///
/// A faulted request never reaches the inner backend.
pub struct FaultyBackend<B> {
    inner: B,
    injector: Mutex<FaultInjector>,
}

impl<B: ChatBackend> FaultyBackend<B> {
    pub fn new(inner: B, seed: u64, config: FaultConfig) -> Self {
        Self {
            inner,
            injector: Mutex::new(FaultInjector::new(SimRng::new(seed), config)),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    #[must_use]
    pub fn stats(&self) -> FaultStats {
        lock(&self.injector).stats()
    }
}

fn fault_result(url: &str, fault: TransportFault) -> Result<HttpReply, TransportError> {
    match fault {
        TransportFault::Connect => Err(TransportError::Connect(format!("{url}: simulated refusal"))),
        TransportFault::Status(status) => Ok(status_reply(status)),
        TransportFault::EmptyContent => Ok(empty_reply()),
        TransportFault::Malformed => Ok(HttpReply {
            status: 200,
            body: "<html>Bad Gateway</html>".to_string(),
        }),
    }
}

impl<B: ChatBackend> ChatBackend for FaultyBackend<B> {
    async fn send(
        &self,
        url: &str,
        payload: &ChatPayload,
        read_timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let fault = lock(&self.injector).next_fault();
        if let Some(fault) = fault {
            tracing::trace!(url, ?fault, "injecting transport fault");
            return fault_result(url, fault);
        }
        self.inner.send(url, payload, read_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sop_core::ChatMessage;
    use sop_transport::{accept_reply, PayloadShape};

    fn payload() -> ChatPayload {
        ChatPayload::new("m", &[ChatMessage::user("hi")], 10, PayloadShape::Plain)
    }

    #[tokio::test]
    async fn test_scripted_replays_in_order_then_refuses() {
        let backend = ScriptedBackend::replies(["one", "two"]);
        let url = "http://sim/chat/completions";
        let t = Duration::from_secs(1);

        let first = backend.send(url, &payload(), t).await.unwrap();
        assert_eq!(accept_reply(url, &first).unwrap(), "one");
        let second = backend.send(url, &payload(), t).await.unwrap();
        assert_eq!(accept_reply(url, &second).unwrap(), "two");
        assert!(matches!(
            backend.send(url, &payload(), t).await,
            Err(TransportError::Connect(_))
        ));
        assert_eq!(backend.requests_count(), 3);
        assert_eq!(backend.requests()[0].read_timeout, t);
    }

    #[test]
    fn test_reply_helpers_shapes() {
        let url = "http://sim";
        assert_eq!(accept_reply(url, &legacy_reply("old")).unwrap(), "old");
        assert!(matches!(
            accept_reply(url, &empty_reply()),
            Err(TransportError::EmptyContent(_))
        ));
        assert!(matches!(
            accept_reply(url, &status_reply(503)),
            Err(TransportError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_faulty_total_outage_never_reaches_inner() {
        let backend = FaultyBackend::new(
            ScriptedBackend::replies(["never"]),
            7,
            FaultConfig::total_outage(),
        );
        for _ in 0..5 {
            let result = backend.send("http://sim", &payload(), Duration::from_secs(1)).await;
            assert!(matches!(result, Err(TransportError::Connect(_))));
        }
        assert_eq!(backend.inner().requests_count(), 0);
        assert_eq!(backend.stats().faults_count, 5);
    }

    #[tokio::test]
    async fn test_faulty_without_faults_is_transparent() {
        let backend = FaultyBackend::new(ScriptedBackend::replies(["ok"]), 7, FaultConfig::none());
        let reply = backend
            .send("http://sim", &payload(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, chat_reply("ok"));
        assert_eq!(backend.inner().requests_count(), 1);
    }

    #[test]
    fn test_malformed_fault_is_not_json() {
        let reply = fault_result("http://sim", TransportFault::Malformed).unwrap();
        assert!(matches!(
            accept_reply("http://sim", &reply),
            Err(TransportError::InvalidBody(_))
        ));
    }
}
