use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ScryError;

const ILLEGAL_CHARS: &[char] = &[':', '?', '"', '*', '<', '>', '|', '/', '\\'];
const STRIPPED_CHARS: &[char] = &['\'', ','];

static REPEATED_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Turns a card or face name into something every common filesystem accepts.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|ch| !ILLEGAL_CHARS.contains(ch) && !STRIPPED_CHARS.contains(ch))
        .collect();
    REPEATED_SPACES
        .replace_all(&cleaned, " ")
        .trim()
        .to_string()
}

/// Safe to race: concurrent callers creating the same directory all succeed.
pub fn ensure_dir(path: &Path) -> Result<(), ScryError> {
    fs::create_dir_all(path)
        .map_err(|err| ScryError::Filesystem(format!("create {}: {err}", path.display())))
}
