//! Per-file reconciliation: parse, validate, and converge each candidate
//! file onto its remote post, with bounded-concurrency publishing.
//!
//! One file's failure never aborts the others; every file ends as exactly
//! one [`OutcomeRecord`]. The only run-wide condition is an authentication
//! failure, which short-circuits files that have not started yet.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::frontmatter;
use crate::hashnode::{ApiError, HashnodeClient};
use crate::metadata::{self, PostMetadata, Validated};

/// Final disposition of one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Published,
    Updated,
    Skipped,
    ValidationFailed,
    RemoteFailed,
}

impl OutcomeKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Published => "Published",
            Self::Updated => "Updated",
            Self::Skipped => "Skipped",
            Self::ValidationFailed => "Validation failed",
            Self::RemoteFailed => "Remote failed",
        }
    }

    /// Failures make the whole run exit non-zero.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::ValidationFailed | Self::RemoteFailed)
    }
}

/// Per-file result of a run. Created once, never mutated.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub path: PathBuf,
    pub kind: OutcomeKind,
    pub url: Option<String>,
    pub detail: Option<String>,
}

impl OutcomeRecord {
    fn success(path: PathBuf, kind: OutcomeKind, url: String) -> Self {
        Self {
            path,
            kind,
            url: Some(url),
            detail: None,
        }
    }

    fn skipped(path: PathBuf, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind: OutcomeKind::Skipped,
            url: None,
            detail: Some(detail.into()),
        }
    }

    fn failed(path: PathBuf, kind: OutcomeKind, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            url: None,
            detail: Some(detail.into()),
        }
    }
}

/// A file that survived the prepare pass, ready for remote calls.
enum Prepared {
    Terminal(OutcomeRecord),
    Publish { metadata: Box<PostMetadata>, body: String },
}

/// Drives the per-file pipeline for one run.
pub struct Reconciler {
    client: Arc<HashnodeClient>,
    concurrency: usize,
}

impl Reconciler {
    #[must_use]
    pub fn new(client: Arc<HashnodeClient>, config: &Config) -> Self {
        Self {
            client,
            concurrency: config.worker_concurrency.max(1),
        }
    }

    /// Process every candidate file and return one outcome per file, in the
    /// original path order regardless of completion order.
    pub async fn run(&self, repo_dir: &Path, files: &[PathBuf]) -> Vec<OutcomeRecord> {
        let prepared = prepare(repo_dir, files).await;

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let auth_failed = Arc::new(AtomicBool::new(false));

        let mut outcomes: Vec<Option<OutcomeRecord>> = vec![None; prepared.len()];
        let mut handles = Vec::new();

        for (index, job) in prepared.into_iter().enumerate() {
            match job {
                Prepared::Terminal(record) => outcomes[index] = Some(record),
                Prepared::Publish { metadata, body } => {
                    let permit = Arc::clone(&semaphore)
                        .acquire_owned()
                        .await
                        .expect("Semaphore closed unexpectedly");
                    let client = Arc::clone(&self.client);
                    let auth_failed = Arc::clone(&auth_failed);
                    let path = files[index].clone();

                    handles.push(tokio::spawn(async move {
                        let _permit = permit;
                        (index, publish_file(&client, &auth_failed, path, &metadata, &body).await)
                    }));
                }
            }
        }

        for handle in handles {
            match handle.await {
                Ok((index, record)) => outcomes[index] = Some(record),
                Err(e) => error!("Publish task panicked: {e}"),
            }
        }

        // A panicked task still owes its file an outcome.
        outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| {
                    OutcomeRecord::failed(
                        files[index].clone(),
                        OutcomeKind::RemoteFailed,
                        "internal error: publish task did not complete",
                    )
                })
            })
            .collect()
    }
}

/// Sequential prepare pass in path order: read, parse, validate, and detect
/// duplicate (domain, slug) pairs within the run.
async fn prepare(repo_dir: &Path, files: &[PathBuf]) -> Vec<Prepared> {
    let mut seen_slugs: HashMap<(String, String), PathBuf> = HashMap::new();
    let mut prepared = Vec::with_capacity(files.len());
    for path in files {
        prepared.push(prepare_file(repo_dir, path, &mut seen_slugs).await);
    }
    prepared
}

async fn prepare_file(
    repo_dir: &Path,
    path: &Path,
    seen_slugs: &mut HashMap<(String, String), PathBuf>,
) -> Prepared {
    let raw = match tokio::fs::read_to_string(repo_dir.join(path)).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Candidate file no longer exists");
            return Prepared::Terminal(OutcomeRecord::skipped(
                path.to_path_buf(),
                "file no longer exists",
            ));
        }
        Err(e) => {
            return Prepared::Terminal(OutcomeRecord::failed(
                path.to_path_buf(),
                OutcomeKind::ValidationFailed,
                format!("could not read file: {e}"),
            ));
        }
    };

    let doc = match frontmatter::parse(&raw) {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            return Prepared::Terminal(OutcomeRecord::skipped(
                path.to_path_buf(),
                "no frontmatter block, not a post",
            ));
        }
        Err(e) => {
            return Prepared::Terminal(OutcomeRecord::failed(
                path.to_path_buf(),
                OutcomeKind::ValidationFailed,
                e.to_string(),
            ));
        }
    };

    let metadata = match metadata::validate(&doc) {
        Ok(Validated::Post(metadata)) => metadata,
        Ok(Validated::Ignored) => {
            return Prepared::Terminal(OutcomeRecord::skipped(
                path.to_path_buf(),
                "ignorePost is set",
            ));
        }
        Err(failure) => {
            return Prepared::Terminal(OutcomeRecord::failed(
                path.to_path_buf(),
                OutcomeKind::ValidationFailed,
                failure.to_string(),
            ));
        }
    };

    let key = (metadata.domain.clone(), metadata.slug.clone());
    if let Some(first) = seen_slugs.get(&key) {
        return Prepared::Terminal(OutcomeRecord::failed(
            path.to_path_buf(),
            OutcomeKind::ValidationFailed,
            format!(
                "duplicate slug `{}` for domain `{}`, already used by {} in this run",
                metadata.slug,
                metadata.domain,
                first.display()
            ),
        ));
    }
    seen_slugs.insert(key, path.to_path_buf());

    Prepared::Publish {
        metadata,
        body: doc.body,
    }
}

/// Resolve-then-publish for one file. Every error ends here as a record.
async fn publish_file(
    client: &HashnodeClient,
    auth_failed: &AtomicBool,
    path: PathBuf,
    metadata: &PostMetadata,
    body: &str,
) -> OutcomeRecord {
    if auth_failed.load(Ordering::SeqCst) {
        return OutcomeRecord::skipped(path, "skipped: authentication failed earlier in this run");
    }

    let existing = match client
        .resolve_existing(&metadata.domain, &metadata.slug)
        .await
    {
        Ok(existing) => existing,
        Err(e) => return remote_failure(auth_failed, path, &e),
    };

    match client.publish(metadata, body, existing.as_ref()).await {
        Ok(post) => {
            let kind = if existing.is_some() {
                OutcomeKind::Updated
            } else {
                OutcomeKind::Published
            };
            info!(path = %path.display(), url = %post.url, outcome = kind.label(), "Post reconciled");
            OutcomeRecord::success(path, kind, post.url)
        }
        Err(e) => remote_failure(auth_failed, path, &e),
    }
}

fn remote_failure(auth_failed: &AtomicBool, path: PathBuf, error: &ApiError) -> OutcomeRecord {
    if matches!(error, ApiError::Auth(_)) {
        auth_failed.store(true, Ordering::SeqCst);
    }
    warn!(path = %path.display(), "Remote call failed: {error}");
    OutcomeRecord::failed(path, OutcomeKind::RemoteFailed, error.to_string())
}
