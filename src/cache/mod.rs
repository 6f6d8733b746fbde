//! Per-language source cache persisted on disk.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::Config;

/// Last-edited source text, one file per language identifier.
#[derive(Debug, Clone)]
pub struct SourceCache {
    storage_path: PathBuf,
}

impl SourceCache {
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.source_cache_path())
    }

    pub fn new(storage_path: PathBuf) -> Self {
        if let Err(e) = fs::create_dir_all(&storage_path) {
            warn!(path = %storage_path.display(), error = %e, "cannot create source cache directory");
        }
        Self { storage_path }
    }

    // Identifiers are hashed so arbitrary keys map to distinct, valid file names.
    fn file_path(&self, language: &str) -> PathBuf {
        let digest = md5::compute(language.as_bytes());
        self.storage_path.join(format!("{:x}", digest))
    }

    /// Overwrite the entry for `language`. The data is on disk when this returns.
    pub fn store(&self, language: &str, text: &str) -> Result<()> {
        let p = self.file_path(language);
        let tmp = p.with_extension("tmp");
        fs::write(&tmp, text).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &p).with_context(|| format!("failed to replace {}", p.display()))?;
        debug!(language, bytes = text.len(), "stored source");
        Ok(())
    }

    /// Last stored text for `language`, `None` when nothing was stored yet.
    pub fn fetch(&self, language: &str) -> Option<String> {
        let p = self.file_path(language);
        match fs::read_to_string(&p) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(language, error = %e, "unreadable source cache entry");
                None
            }
        }
    }
}
