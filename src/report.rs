//! Rendering of per-file outcomes into the run summary.

use std::fmt::Write;

use crate::reconciler::{OutcomeKind, OutcomeRecord};

/// Group order for the rendered summary.
const KIND_ORDER: &[OutcomeKind] = &[
    OutcomeKind::Published,
    OutcomeKind::Updated,
    OutcomeKind::Skipped,
    OutcomeKind::ValidationFailed,
    OutcomeKind::RemoteFailed,
];

/// Render outcome records as a markdown summary grouped by result kind.
///
/// Within a group, records keep their original file order. Successes carry
/// the resulting post URL, failures the error detail.
#[must_use]
pub fn render(records: &[OutcomeRecord]) -> String {
    let mut out = String::from("### Publishing Results\n\n");

    if records.is_empty() {
        out.push_str("No markdown files to process.\n");
        return out;
    }

    let counts: Vec<String> = KIND_ORDER
        .iter()
        .filter_map(|kind| {
            let count = records.iter().filter(|r| r.kind == *kind).count();
            (count > 0).then(|| format!("{} {}", count, kind.label().to_lowercase()))
        })
        .collect();
    let _ = writeln!(out, "{} file(s): {}\n", records.len(), counts.join(", "));

    for kind in KIND_ORDER {
        let group: Vec<&OutcomeRecord> = records.iter().filter(|r| r.kind == *kind).collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "#### {}\n", kind.label());
        for record in group {
            let path = record.path.display();
            match (&record.url, &record.detail) {
                (Some(url), _) => {
                    let _ = writeln!(out, "- `{path}` → {url}");
                }
                (None, Some(detail)) => {
                    let _ = writeln!(out, "- `{path}`: {detail}");
                }
                (None, None) => {
                    let _ = writeln!(out, "- `{path}`");
                }
            }
        }
        out.push('\n');
    }

    out
}

/// The run fails if any file failed validation or a remote call; partial
/// success still surfaces as an overall failure.
#[must_use]
pub fn run_failed(records: &[OutcomeRecord]) -> bool {
    records.iter().any(|record| record.kind.is_failure())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(path: &str, kind: OutcomeKind, url: Option<&str>, detail: Option<&str>) -> OutcomeRecord {
        OutcomeRecord {
            path: PathBuf::from(path),
            kind,
            url: url.map(ToString::to_string),
            detail: detail.map(ToString::to_string),
        }
    }

    #[test]
    fn test_render_groups_by_kind() {
        let records = vec![
            record("b.md", OutcomeKind::Skipped, None, Some("no frontmatter block, not a post")),
            record("a.md", OutcomeKind::Published, Some("https://blog.example/hello"), None),
            record("c.md", OutcomeKind::ValidationFailed, None, Some("missing required field `title`")),
        ];
        let rendered = render(&records);

        let published = rendered.find("#### Published").unwrap();
        let skipped = rendered.find("#### Skipped").unwrap();
        let failed = rendered.find("#### Validation failed").unwrap();
        assert!(published < skipped && skipped < failed);

        assert!(rendered.contains("- `a.md` → https://blog.example/hello"));
        assert!(rendered.contains("- `b.md`: no frontmatter block, not a post"));
        assert!(rendered.contains("- `c.md`: missing required field `title`"));
        assert!(rendered.contains("3 file(s): 1 published, 1 skipped, 1 validation failed"));
    }

    #[test]
    fn test_render_empty_run() {
        assert!(render(&[]).contains("No markdown files to process"));
    }

    #[test]
    fn test_render_omits_empty_groups() {
        let records = vec![record("a.md", OutcomeKind::Updated, Some("https://x.example/p"), None)];
        let rendered = render(&records);
        assert!(rendered.contains("#### Updated"));
        assert!(!rendered.contains("#### Published"));
        assert!(!rendered.contains("#### Remote failed"));
    }

    #[test]
    fn test_run_failed() {
        let ok = vec![
            record("a.md", OutcomeKind::Published, Some("u"), None),
            record("b.md", OutcomeKind::Skipped, None, Some("d")),
        ];
        assert!(!run_failed(&ok));

        let failed = vec![
            record("a.md", OutcomeKind::Published, Some("u"), None),
            record("b.md", OutcomeKind::RemoteFailed, None, Some("d")),
        ];
        assert!(run_failed(&failed));
    }
}
