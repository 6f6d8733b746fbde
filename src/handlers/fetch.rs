//! `kode fetch`: download a snapshot's source.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::printer::TextPrinter;
use crate::transport::{HttpTransport, SnapshotId, Transport};

pub async fn run(cfg: &Config, id: &str, output: Option<&Path>) -> Result<()> {
    let transport = HttpTransport::from_config(cfg)?;
    let snapshot = transport.fetch_snapshot(&SnapshotId::new(id)).await?;

    match output {
        Some(path) => {
            std::fs::write(path, &snapshot.source).with_context(|| format!("failed to write {}", path.display()))?;
            let label = match &snapshot.version {
                Some(v) => format!("{} {}", snapshot.language, v),
                None => snapshot.language.clone(),
            };
            TextPrinter { color: Some("cyan") }.eprint(&format!("{} -> {}", label, path.display()));
        }
        None => print!("{}", snapshot.source),
    }
    Ok(())
}
