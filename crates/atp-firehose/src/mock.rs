// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::transport::{WebSocketConnection, WebSocketTransport, WsMessage};
use async_trait::async_trait;
use atp_error::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

/// A [`WebSocketTransport`] that replays a scripted message sequence.
///
/// Each `connect` drains the shared script; the connection reports
/// `closed()` once [`WebSocketConnection::close`] has been called.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Option<WsMessage>>>>,
    connected_urls: Mutex<Vec<String>>,
    closed: Arc<AtomicBool>,
    hang_when_exhausted: AtomicBool,
}

impl ScriptedTransport {
    /// A transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binary frame to the script.
    pub fn push_binary(&self, bytes: Vec<u8>) {
        self.push(Ok(Some(WsMessage::Binary(bytes))));
    }

    /// Append a text frame to the script.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(Some(WsMessage::Text(text.into()))));
    }

    /// Append an outcome (error, or `Ok(None)` for a clean close).
    pub fn push(&self, outcome: Result<Option<WsMessage>>) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(outcome);
    }

    /// URLs passed to `connect`, in order.
    pub fn connected_urls(&self) -> Vec<String> {
        self.connected_urls
            .lock()
            .expect("url lock poisoned")
            .clone()
    }

    /// True once any connection was closed.
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Keep exhausted connections pending instead of reporting a clean
    /// close, so shutdown paths can be exercised deterministically.
    pub fn hang_when_exhausted(&self) {
        self.hang_when_exhausted.store(true, Ordering::SeqCst);
    }
}

struct ScriptedConnection {
    script: VecDeque<Result<Option<WsMessage>>>,
    closed: Arc<AtomicBool>,
    hang_when_exhausted: bool,
}

#[async_trait]
impl WebSocketTransport for ScriptedTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>> {
        self.connected_urls
            .lock()
            .expect("url lock poisoned")
            .push(url.to_string());
        let script = std::mem::take(&mut *self.script.lock().expect("script lock poisoned"));
        Ok(Box::new(ScriptedConnection {
            script,
            closed: self.closed.clone(),
            hang_when_exhausted: self.hang_when_exhausted.load(Ordering::SeqCst),
        }))
    }
}

#[async_trait]
impl WebSocketConnection for ScriptedConnection {
    async fn receive(&mut self) -> Result<Option<WsMessage>> {
        match self.script.pop_front() {
            Some(outcome) => outcome,
            None if self.hang_when_exhausted => futures::future::pending().await,
            // Script exhausted: behave like a clean close.
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
