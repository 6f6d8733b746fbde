//! Language profiles: file extension to backend language, editor mode and version hint.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageProfile {
    /// Extension without the leading dot; also the source-cache key.
    pub id: &'static str,
    /// Language name understood by the backend (`lang` form field).
    pub language: &'static str,
    /// Editor mode name used for highlighting and the UI label.
    pub display_mode: &'static str,
    /// Version sent when the user does not pick one. `None` lets the backend choose.
    pub default_version: Option<&'static str>,
}

const PROFILES: &[LanguageProfile] = &[
    LanguageProfile { id: "go", language: "go", display_mode: "golang", default_version: None },
    LanguageProfile { id: "rb", language: "ruby", display_mode: "ruby", default_version: Some("2.3.0") },
    LanguageProfile { id: "py", language: "python", display_mode: "python", default_version: None },
    LanguageProfile { id: "swift", language: "swift", display_mode: "swift", default_version: None },
    LanguageProfile { id: "ex", language: "elixir", display_mode: "elixir", default_version: None },
    LanguageProfile { id: "iex", language: "elixir", display_mode: "elixir", default_version: None },
    LanguageProfile { id: "c", language: "c", display_mode: "c_cpp", default_version: None },
    LanguageProfile { id: "cc", language: "c", display_mode: "c_cpp", default_version: None },
    LanguageProfile { id: "cs", language: "dotnet", display_mode: "csharp", default_version: None },
    LanguageProfile { id: "fs", language: "fsharp", display_mode: "fsharp", default_version: None },
];

fn normalize(identifier: &str) -> String {
    identifier.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Look up a profile. `None` marks an identifier outside the supported set.
pub fn resolve(identifier: &str) -> Option<&'static LanguageProfile> {
    let key = normalize(identifier);
    PROFILES.iter().find(|p| p.id == key)
}

/// Resolve by the extension of `path`.
pub fn from_path(path: &Path) -> Option<&'static LanguageProfile> {
    path.extension().and_then(|ext| ext.to_str()).and_then(resolve)
}

/// First profile whose backend language is `language` (snapshots store the language, not the extension).
pub fn by_language(language: &str) -> Option<&'static LanguageProfile> {
    let key = language.trim().to_ascii_lowercase();
    PROFILES.iter().find(|p| p.language == key)
}

pub fn supported() -> &'static [LanguageProfile] {
    PROFILES
}

/// Neighbour of `current` in the supported list, wrapping at both ends.
pub fn cycle(current: &str, forward: bool) -> &'static LanguageProfile {
    let len = PROFILES.len();
    let key = normalize(current);
    let idx = PROFILES.iter().position(|p| p.id == key);
    let next = match (idx, forward) {
        (None, _) => 0,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    };
    &PROFILES[next]
}
