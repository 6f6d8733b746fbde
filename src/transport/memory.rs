//! Scripted in-process transport for exercising sessions without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_stream::stream;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{OutputChunk, OutputStream, Runnable, SessionToken, SnapshotId, Transport, TransportError};

type Feed = mpsc::UnboundedReceiver<Result<OutputChunk, TransportError>>;

#[derive(Default)]
pub struct MemoryTransport {
    register_replies: Mutex<VecDeque<Result<String, String>>>,
    feeds: Mutex<HashMap<SessionToken, Feed>>,
    fail_subscribe: Mutex<bool>,
    fail_input: Mutex<bool>,
    pub registered: Mutex<Vec<Runnable>>,
    pub inputs: Mutex<Vec<(SessionToken, String)>>,
    pub snapshots: Mutex<HashMap<SnapshotId, Runnable>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer of the next `register` call.
    pub fn reply_token(&self, token: &str) {
        self.register_replies.lock().unwrap().push_back(Ok(token.to_string()));
    }

    pub fn reply_register_error(&self, message: &str) {
        self.register_replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    /// Prepare the output stream for `token`; push chunks through the returned sender
    /// and drop it to end the stream.
    pub fn feed(&self, token: &str) -> mpsc::UnboundedSender<Result<OutputChunk, TransportError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().unwrap().insert(SessionToken::new(token), rx);
        tx
    }

    /// Prepare a stream that yields `chunks` and then ends.
    pub fn script(&self, token: &str, chunks: &[&str]) {
        let tx = self.feed(token);
        for c in chunks {
            let _ = tx.send(Ok(OutputChunk(c.to_string())));
        }
    }

    pub fn fail_subscribe(&self, fail: bool) {
        *self.fail_subscribe.lock().unwrap() = fail;
    }

    pub fn fail_input(&self, fail: bool) {
        *self.fail_input.lock().unwrap() = fail;
    }

    pub fn sent_lines(&self) -> Vec<String> {
        self.inputs.lock().unwrap().iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn register(&self, runnable: &Runnable) -> Result<SessionToken, TransportError> {
        self.record("register");
        self.registered.lock().unwrap().push(runnable.clone());
        match self.register_replies.lock().unwrap().pop_front() {
            Some(Ok(token)) => Ok(SessionToken::new(token)),
            Some(Err(message)) => Err(TransportError::Status { status: 422, body: message }),
            None => Err(TransportError::Closed("no scripted registration".into())),
        }
    }

    async fn subscribe(&self, token: &SessionToken) -> Result<OutputStream, TransportError> {
        self.record("subscribe");
        if *self.fail_subscribe.lock().unwrap() {
            return Err(TransportError::Status { status: 422, body: "unknown token".into() });
        }
        let mut rx = self
            .feeds
            .lock()
            .unwrap()
            .remove(token)
            .ok_or_else(|| TransportError::Closed(format!("no stream for {}", token)))?;
        Ok(Box::pin(stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        }))
    }

    async fn send_input(&self, token: &SessionToken, line: &str) -> Result<(), TransportError> {
        self.record("send_input");
        if *self.fail_input.lock().unwrap() {
            return Err(TransportError::Closed("stdin refused".into()));
        }
        self.inputs.lock().unwrap().push((token.clone(), line.to_string()));
        Ok(())
    }

    async fn save(&self, runnable: &Runnable, existing: Option<&SnapshotId>) -> Result<SnapshotId, TransportError> {
        self.record("save");
        let mut snapshots = self.snapshots.lock().unwrap();
        let id = existing
            .cloned()
            .unwrap_or_else(|| SnapshotId::new(format!("snap{}", snapshots.len() + 1)));
        snapshots.insert(id.clone(), runnable.clone());
        Ok(id)
    }

    async fn fetch_snapshot(&self, id: &SnapshotId) -> Result<Runnable, TransportError> {
        self.record("fetch_snapshot");
        self.snapshots
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| TransportError::Status { status: 422, body: "The source code doesn't exist".into() })
    }

    async fn languages(&self) -> Result<String, TransportError> {
        self.record("languages");
        Ok("Supported Languages\n  go        - 1.7\n".into())
    }
}
