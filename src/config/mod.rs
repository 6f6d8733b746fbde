use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

pub const DEBUG_ENDPOINT: &str = "http://127.0.0.1:8080/";

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        // Read .koderc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path: config_path.to_path_buf() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    /// Site root with a trailing slash. The API lives under `api/`.
    pub fn endpoint(&self) -> String {
        let raw = self.get("KODE_ENDPOINT").unwrap_or_else(|| DEBUG_ENDPOINT.to_string());
        format!("{}/", raw.trim().trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("REQUEST_TIMEOUT").unwrap_or(60))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("CONNECT_TIMEOUT").unwrap_or(60))
    }

    pub fn source_cache_path(&self) -> PathBuf {
        self.get("SOURCE_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("sources"))
    }

    pub fn default_lang(&self) -> String {
        self.get("DEFAULT_LANG").unwrap_or_else(|| "go".into())
    }

    pub fn log_filter(&self) -> String {
        self.get("KODE_LOG").unwrap_or_else(|| "warn".into())
    }

    pub fn log_path(&self) -> PathBuf {
        data_dir().join("kode.log")
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "REQUEST_TIMEOUT",
        "CONNECT_TIMEOUT",
        "SOURCE_CACHE_PATH",
        "DEFAULT_LANG",
    ];

    KEYS.contains(&k) || k.starts_with("KODE_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("kode").join(".koderc")
}

fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.data_dir().to_path_buf())
        .unwrap_or_else(env::temp_dir)
        .join("kode")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert(
        "SOURCE_CACHE_PATH".into(),
        data_dir().join("sources").to_string_lossy().into_owned(),
    );

    // Numbers
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("CONNECT_TIMEOUT".into(), "60".into());

    // Strings
    m.insert("KODE_ENDPOINT".into(), DEBUG_ENDPOINT.into());
    m.insert("DEFAULT_LANG".into(), "go".into());
    m.insert("KODE_LOG".into(), "warn".into());

    m
}
