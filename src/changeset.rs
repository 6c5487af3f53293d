//! Candidate file discovery for a publishing run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::constants::{EXCLUDED_FILES, MARKDOWN_EXTENSION};

/// How the candidate file set is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Files added or modified between two revisions.
    Diff { base: String, head: String },
    /// Every markdown file in the repository (first run or full resync).
    Full,
    /// A newline-separated list of paths precomputed by the host.
    List { path: PathBuf },
}

/// Resolve the ordered set of markdown files to process.
///
/// Paths are returned relative to `repo_dir`, deduplicated and sorted
/// lexicographically. A diff that cannot be computed (shallow history,
/// missing git, bad revision) falls back to a full scan instead of
/// failing the run.
///
/// # Errors
///
/// Returns an error if the repository tree or the list file cannot be read.
pub async fn resolve(repo_dir: &Path, mode: &RunMode) -> Result<Vec<PathBuf>> {
    let paths = match mode {
        RunMode::Diff { base, head } => match diff_files(repo_dir, base, head).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Could not compute revision diff, falling back to full scan: {e:#}");
                scan_tree(repo_dir).await?
            }
        },
        RunMode::Full => scan_tree(repo_dir).await?,
        RunMode::List { path } => list_files(repo_dir, path).await?,
    };

    let candidates: BTreeSet<PathBuf> = paths.into_iter().filter(|p| is_candidate(p)).collect();
    Ok(candidates.into_iter().collect())
}

/// Whether a path counts as a post candidate: markdown extension and not on
/// the repository documentation exclusion list.
fn is_candidate(path: &Path) -> bool {
    if path
        .extension()
        .map_or(true, |ext| !ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
    {
        return false;
    }
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(true, |name| !EXCLUDED_FILES.contains(&name))
}

/// Files added or modified between `base` and `head`.
async fn diff_files(repo_dir: &Path, base: &str, head: &str) -> Result<Vec<PathBuf>> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_dir)
        .args(["diff", "--name-only", "--diff-filter=AM", base, head])
        .output()
        .await
        .context("failed to run git")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git diff {base} {head} failed: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let paths = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();

    debug!(base, head, "Resolved changed files from git diff");
    Ok(paths)
}

/// Walk the repository tree for markdown files, skipping dot-directories.
async fn scan_tree(repo_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![repo_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("failed to read directory: {}", dir.display()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("failed to read directory: {}", dir.display()))?
        {
            let path = entry.path();
            let hidden = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.'));

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if !hidden {
                    pending.push(path);
                }
            } else if file_type.is_file() && !hidden {
                if let Ok(relative) = path.strip_prefix(repo_dir) {
                    found.push(relative.to_path_buf());
                }
            }
        }
    }

    Ok(found)
}

/// Read a host-precomputed changed-file list, dropping entries that no
/// longer exist on disk.
async fn list_files(repo_dir: &Path, list_path: &Path) -> Result<Vec<PathBuf>> {
    let raw = tokio::fs::read_to_string(list_path)
        .await
        .with_context(|| format!("failed to read changed-file list: {}", list_path.display()))?;

    let mut paths = Vec::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let path = PathBuf::from(line);
        if tokio::fs::try_exists(repo_dir.join(&path)).await.unwrap_or(false) {
            paths.push(path);
        } else {
            warn!(path = %line, "Listed file not found in repository, dropping");
        }
    }
    Ok(paths)
}
