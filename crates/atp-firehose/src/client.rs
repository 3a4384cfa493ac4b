// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::frames::{self, RepoEvent};
use crate::transport::{WebSocketTransport, WsMessage};
use atp_error::{Error, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// The subscription NSID appended to the relay URL.
pub const SUBSCRIBE_REPOS_NSID: &str = "com.atproto.sync.subscribeRepos";

/// Default relay endpoint.
pub const DEFAULT_RELAY_URL: &str = "wss://bsky.network";

/// Buffered events before the producer back-pressures.
const CHANNEL_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// EventStream
// ---------------------------------------------------------------------------

/// The consumer half of a firehose subscription.
///
/// Events arrive in transport order. The stream ends after a clean server
/// close, a [`disconnect`](FirehoseClient::disconnect), or a terminal
/// error item.
pub struct EventStream {
    rx: mpsc::Receiver<Result<RepoEvent>>,
}

impl EventStream {
    /// The next item; `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Result<RepoEvent>> {
        self.rx.recv().await
    }

    /// Drain every remaining event, discarding the terminal error if any.
    pub async fn collect_until_closed(mut self) -> Vec<RepoEvent> {
        let mut events = Vec::new();
        while let Some(item) = self.rx.recv().await {
            match item {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events
    }
}

// ---------------------------------------------------------------------------
// FirehoseClient
// ---------------------------------------------------------------------------

/// Subscribes to a relay's repository event stream.
pub struct FirehoseClient {
    relay_url: String,
    transport: Arc<dyn WebSocketTransport>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl FirehoseClient {
    /// A client for the given relay over the given transport.
    pub fn new(relay_url: impl Into<String>, transport: Arc<dyn WebSocketTransport>) -> Self {
        Self {
            relay_url: relay_url.into(),
            transport,
            shutdown: Mutex::new(None),
        }
    }

    /// The subscription URL, with the cursor appended when resuming.
    pub fn subscription_url(&self, cursor: Option<i64>) -> String {
        let base = self.relay_url.trim_end_matches('/');
        match cursor {
            Some(cursor) => format!("{base}/xrpc/{SUBSCRIBE_REPOS_NSID}?cursor={cursor}"),
            None => format!("{base}/xrpc/{SUBSCRIBE_REPOS_NSID}"),
        }
    }

    /// Open the subscription and spawn the producer task.
    ///
    /// Undecodable frames are dropped silently; transport errors terminate
    /// the stream with that error. Dropping the returned stream closes the
    /// connection.
    pub async fn subscribe_repos(&self, cursor: Option<i64>) -> Result<EventStream> {
        let url = self.subscription_url(cursor);
        debug!(%url, "subscribing to firehose");
        let mut connection = self.transport.connect(&url).await?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        *self.shutdown.lock().expect("shutdown lock poisoned") = Some(stop_tx);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        let _ = connection.close().await;
                        break;
                    }
                    received = connection.receive() => match received {
                        Ok(Some(WsMessage::Binary(bytes))) => {
                            match frames::decode_frame(&bytes) {
                                Ok(event) => {
                                    if tx.send(Ok(event)).await.is_err() {
                                        // Consumer gone; close and stop.
                                        let _ = connection.close().await;
                                        break;
                                    }
                                }
                                Err(Error::FrameDecoding(reason)) => {
                                    trace!(%reason, "dropping undecodable frame");
                                }
                                Err(error) => {
                                    warn!(%error, "terminating stream");
                                    let _ = tx.send(Err(error)).await;
                                    break;
                                }
                            }
                        }
                        Ok(Some(WsMessage::Text(_))) => {}
                        Ok(None) => {
                            debug!("firehose closed by server");
                            break;
                        }
                        Err(error) => {
                            warn!(%error, "firehose transport error");
                            let _ = tx.send(Err(error)).await;
                            break;
                        }
                    }
                }
            }
        });

        Ok(EventStream { rx })
    }

    /// Ask the producer to close the connection with a normal-closure code.
    pub fn disconnect(&self) {
        if let Some(stop) = self
            .shutdown
            .lock()
            .expect("shutdown lock poisoned")
            .take()
        {
            let _ = stop.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::RepoOpAction;
    use crate::mock::ScriptedTransport;
    use serde::Serialize;

    fn frame<H: Serialize, B: Serialize>(header: &H, body: &B) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(header, &mut out).unwrap();
        ciborium::ser::into_writer(body, &mut out).unwrap();
        out
    }

    fn commit_frame(seq: i64) -> Vec<u8> {
        frame(
            &serde_json::json!({"op": 1, "t": "#commit"}),
            &serde_json::json!({
                "seq": seq,
                "repo": "did:plc:x",
                "time": "2024-01-01T00:00:00.000Z",
                "ops": [{"action": "create", "path": "app.bsky.feed.post/abc"}]
            }),
        )
    }

    #[tokio::test]
    async fn subscription_url_includes_cursor() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = FirehoseClient::new("wss://relay.test", transport.clone());
        assert_eq!(
            client.subscription_url(None),
            "wss://relay.test/xrpc/com.atproto.sync.subscribeRepos"
        );
        assert_eq!(
            client.subscription_url(Some(99)),
            "wss://relay.test/xrpc/com.atproto.sync.subscribeRepos?cursor=99"
        );

        client.subscribe_repos(Some(7)).await.unwrap();
        assert_eq!(
            transport.connected_urls(),
            vec!["wss://relay.test/xrpc/com.atproto.sync.subscribeRepos?cursor=7".to_string()]
        );
    }

    #[tokio::test]
    async fn yields_events_in_transport_order() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_binary(commit_frame(1));
        transport.push_binary(commit_frame(2));
        transport.push_binary(commit_frame(3));
        let client = FirehoseClient::new("wss://relay.test", transport);

        let stream = client.subscribe_repos(None).await.unwrap();
        let events = stream.collect_until_closed().await;
        let seqs: Vec<i64> = events
            .iter()
            .map(|event| match event {
                RepoEvent::Commit(commit) => commit.seq,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn decodes_commit_payload() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_binary(commit_frame(42));
        let client = FirehoseClient::new("wss://relay.test", transport);

        let mut stream = client.subscribe_repos(None).await.unwrap();
        match stream.recv().await.unwrap().unwrap() {
            RepoEvent::Commit(commit) => {
                assert_eq!(commit.seq, 42);
                assert_eq!(commit.ops[0].action, RepoOpAction::Create);
                assert_eq!(commit.ops[0].collection(), Some("app.bsky.feed.post"));
                assert_eq!(commit.ops[0].rkey(), Some("abc"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_frames_are_dropped_silently() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_binary(vec![0xff, 0x00, 0x13]);
        transport.push_binary(commit_frame(5));
        let client = FirehoseClient::new("wss://relay.test", transport);

        let events = client
            .subscribe_repos(None)
            .await
            .unwrap()
            .collect_until_closed()
            .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn text_messages_are_ignored() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_text("hello");
        transport.push_binary(commit_frame(6));
        let client = FirehoseClient::new("wss://relay.test", transport);

        let events = client
            .subscribe_repos(None)
            .await
            .unwrap()
            .collect_until_closed()
            .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn transport_error_terminates_stream() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_binary(commit_frame(1));
        transport.push(Err(Error::network(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ))));
        transport.push_binary(commit_frame(2));
        let client = FirehoseClient::new("wss://relay.test", transport);

        let mut stream = client.subscribe_repos(None).await.unwrap();
        assert!(stream.recv().await.unwrap().is_ok());
        assert!(matches!(stream.recv().await.unwrap(), Err(Error::Network(_))));
        // Terminated: nothing after the error.
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn disconnect_closes_connection() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.hang_when_exhausted();
        let client = FirehoseClient::new("wss://relay.test", transport.clone());
        let mut stream = client.subscribe_repos(None).await.unwrap();

        client.disconnect();
        assert!(stream.recv().await.is_none());
        assert!(transport.closed());
    }
}
