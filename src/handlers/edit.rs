//! `kode edit`: the interactive editor.

use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use std::io;

use crate::config::Config;
use crate::languages;
use crate::transport::SnapshotId;
use crate::tui::run_tui_editor;

fn require_terminal(stdout_is_terminal: bool) -> Result<()> {
    if stdout_is_terminal {
        return Ok(());
    }
    eprintln!("Warning: the editor needs a terminal. Use `kode run <file>` for non-interactive runs.");
    Err(anyhow!("the editor requires a proper terminal environment"))
}

pub async fn run(cfg: &Config, lang: Option<&str>, snapshot: Option<&str>) -> Result<()> {
    require_terminal(io::stdout().is_terminal())?;

    let wanted = lang.map(str::to_string).unwrap_or_else(|| cfg.default_lang());
    let profile = languages::resolve(&wanted)
        .ok_or_else(|| anyhow!("unsupported language: {} (supported: {})", wanted, super::run::supported_list()))?;

    run_tui_editor(cfg, profile, snapshot.map(SnapshotId::new)).await
}
