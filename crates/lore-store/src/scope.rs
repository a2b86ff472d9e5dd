//! Import scope identity and on-disk layout.
//!
//! A scope is the repository an import describes, normalized to `org_repo`
//! so the same repository reached by SSH, HTTPS or `org/repo` shorthand
//! shares one de-duplication key space.
//!
//! Layout:
//! ```text
//! ~/.lore/
//! ├── config.toml
//! └── lore.db
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DB_FILE_NAME: &str = "lore.db";

/// Default base directory for all lore storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".lore")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Get the path portion of a `scheme://...` URL (everything after `://host/`).
fn extract_url_path(url: &str) -> Option<&str> {
    let after_scheme = url.find("://").map(|i| &url[i + 3..])?;
    let after_host = after_scheme.find('/').map(|i| &after_scheme[i + 1..])?;
    if after_host.is_empty() {
        None
    } else {
        Some(after_host)
    }
}

/// Repository path (`org/repo`, possibly nested) from any accepted form:
/// - `git@github.com:org/repo.git`
/// - `https://github.com/org/repo`
/// - `ssh://git@github.com/org/repo.git`
/// - `org/repo`
fn repo_path(repo: &str) -> Option<&str> {
    let repo = repo.trim();
    if repo.contains("://") {
        return extract_url_path(repo);
    }
    match repo.find(':') {
        Some(colon) => Some(&repo[colon + 1..]),
        None => Some(repo),
    }
}

/// Normalize a repository reference into a scope identifier.
///
/// Uses the last two path segments (GitLab subgroups `a/b/c/repo` → `c_repo`)
/// and strips a `.git` suffix. Returns `None` when nothing usable remains.
pub fn resolve_scope(repo: &str) -> Option<String> {
    let path = repo_path(repo)?.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let identity = match segments.as_slice() {
        [] => return None,
        [only] => only.to_string(),
        [.., org, name] => format!("{org}_{name}"),
    };

    let sanitized = sanitize_name(&identity);
    if sanitized.chars().all(|c| c == '_') {
        None
    } else {
        Some(sanitized)
    }
}

/// Sanitize a scope for use as a stable identifier.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Open (creating as needed) the store under `base_dir`, or the default base.
pub fn open_store(base_dir: Option<&Path>) -> Result<Store> {
    let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
    fs::create_dir_all(&base).map_err(|e| {
        StoreError::InvalidData(format!("failed to create {}: {e}", base.display()))
    })?;
    let path = base.join(DB_FILE_NAME);
    tracing::debug!("opening store at {}", path.display());
    Store::open(&path)
}
