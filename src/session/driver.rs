//! Async glue that walks a session through one run against a [`Transport`].

use std::sync::Arc;

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::warn;

use super::{ExecutionSession, Handled, OutputSink, PendingInput, SessionError, StreamEvent};
use crate::transport::{Runnable, SessionToken, Transport};

/// Forwards stdin lines in submission order on a background task, so the
/// caller never waits on the network. Delivery failures are reported through
/// `on_error` and never end the run.
#[derive(Debug, Clone)]
pub struct InputForwarder {
    tx: mpsc::UnboundedSender<PendingInput>,
}

impl InputForwarder {
    pub fn spawn<F>(transport: Arc<dyn Transport>, on_error: F) -> Self
    where
        F: Fn(String) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingInput>();
        tokio::spawn(async move {
            while let Some(pending) = rx.recv().await {
                if let Err(e) = transport.send_input(&pending.token, &pending.line).await {
                    warn!(token = %pending.token, error = %e, "stdin line not delivered");
                    on_error(format!("input not delivered: {}", e));
                }
            }
        });
        Self { tx }
    }

    pub fn forward(&self, pending: PendingInput) {
        if self.tx.send(pending).is_err() {
            warn!("stdin forwarder has stopped");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub token: SessionToken,
    pub chunks: usize,
    pub lines_sent: usize,
}

/// Run `runnable` to completion: register, stream output into `sink`, and
/// forward every line yielded by `input` as stdin while the run lasts.
///
/// Only registration failures and a concurrent start are errors; the run
/// itself always ends through the completion transition.
pub async fn run<I>(
    session: &mut ExecutionSession,
    transport: Arc<dyn Transport>,
    runnable: Runnable,
    sink: &mut dyn OutputSink,
    input: I,
) -> Result<RunSummary, SessionError>
where
    I: Stream<Item = String> + Unpin,
{
    session.begin(&runnable)?;

    let token = match transport.register(&runnable).await {
        Ok(token) => token,
        Err(e) => {
            session.registration_failed();
            return Err(SessionError::Register(e));
        }
    };
    session.registered(token.clone(), sink)?;

    let mut summary = RunSummary { token: token.clone(), chunks: 0, lines_sent: 0 };

    let mut output = match transport.subscribe(&token).await {
        Ok(stream) => stream,
        Err(e) => {
            session.handle(&token, StreamEvent::Failed(e.to_string()), sink);
            return Ok(summary);
        }
    };

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<String>();
    let forwarder = InputForwarder::spawn(Arc::clone(&transport), move |msg| {
        let _ = notice_tx.send(msg);
    });

    let mut input = input;
    let mut input_open = true;
    loop {
        tokio::select! {
            item = output.next() => {
                let event = match item {
                    Some(Ok(chunk)) => StreamEvent::Chunk(chunk),
                    Some(Err(e)) => StreamEvent::Failed(e.to_string()),
                    None => StreamEvent::End,
                };
                match session.handle(&token, event, sink) {
                    Handled::Appended => summary.chunks += 1,
                    Handled::Completed | Handled::Stale => break,
                }
            }
            line = input.next(), if input_open => match line {
                Some(line) => {
                    session.type_str(&line);
                    forwarder.forward(session.submit_line()?);
                    summary.lines_sent += 1;
                }
                None => input_open = false,
            },
            Some(msg) = notice_rx.recv() => sink.notice(&msg),
        }
    }

    while let Ok(msg) = notice_rx.try_recv() {
        sink.notice(&msg);
    }
    Ok(summary)
}
