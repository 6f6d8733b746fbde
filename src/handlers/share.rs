//! `kode share`: store a file as a snapshot and print its URL.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::languages;
use crate::printer::TextPrinter;
use crate::transport::{HttpTransport, Runnable, SnapshotId, Transport};

pub async fn run(cfg: &Config, file: &Path, version: Option<String>, id: Option<String>) -> Result<()> {
    let Some(profile) = languages::from_path(file) else {
        bail!("unsupported file type: {}", file.display());
    };
    let source = std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let version = version.or_else(|| profile.default_version.map(str::to_string));
    let runnable = Runnable::new(profile.language, version, source);

    let transport = HttpTransport::from_config(cfg)?;
    let existing = id.map(SnapshotId::new);
    let saved = transport.save(&runnable, existing.as_ref()).await?;

    TextPrinter { color: Some("green") }.print(&transport.share_url(&saved));
    Ok(())
}
