//! `kode run`: execute a local file remotely, streaming its output to stdout.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_stream::stream;
use futures_core::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Config;
use crate::languages;
use crate::printer::StdoutSink;
use crate::session::{self, ExecutionSession};
use crate::transport::{HttpTransport, Transport};

/// Lines of our own stdin, forwarded to the program while it runs.
///
/// Read on a plain thread: a blocking read cannot be cancelled, and a tokio
/// blocking task would hold up runtime shutdown until the next newline.
fn stdin_lines() -> impl Stream<Item = String> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    stream! {
        while let Some(line) = rx.recv().await {
            yield line;
        }
    }
}

pub async fn run(cfg: &Config, file: &Path, version: Option<String>) -> Result<()> {
    let Some(profile) = languages::from_path(file) else {
        bail!(
            "unsupported file type: {} (supported: {})",
            file.display(),
            supported_list()
        );
    };
    let source = std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(cfg)?);
    let mut session = ExecutionSession::for_profile(profile);
    if version.is_some() {
        session.select(profile.language, version);
    }
    let runnable = session.runnable(source);
    let mut sink = StdoutSink::default();

    let input = Box::pin(stdin_lines());

    let summary = session::run(&mut session, transport, runnable, &mut sink, input).await?;
    debug!(token = %summary.token, chunks = summary.chunks, lines = summary.lines_sent, "run finished");
    Ok(())
}

pub(crate) fn supported_list() -> String {
    languages::supported()
        .iter()
        .map(|p| format!(".{}", p.id))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_list_names_extensions() {
        let list = supported_list();
        assert!(list.starts_with(".go"));
        assert!(list.contains(".rb"));
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_before_network() {
        let cfg = Config::load_from(Path::new("/nonexistent/.koderc"));
        let err = run(&cfg, Path::new("notes.txt"), None).await.unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }
}
