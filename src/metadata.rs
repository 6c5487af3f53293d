//! Validation of raw frontmatter fields into a normalized post record.
//!
//! Validation is exhaustive: every missing or invalid field is reported in
//! one pass, in a fixed rule order, so a single fix-and-rerun cycle
//! resolves everything reported.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::frontmatter::Document;

/// Slugs may contain only letters, digits, and hyphens.
static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("slug pattern is valid"));

/// Hashnode accepts at most five tags per post.
pub const MAX_TAGS: usize = 5;

/// Normalized metadata for a publishable post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMetadata {
    pub title: String,
    pub slug: String,
    pub tags: Vec<String>,
    pub domain: String,
    pub subtitle: Option<String>,
    pub cover_image: Option<String>,
    pub save_as_draft: bool,
    pub hide_from_community_feed: bool,
    pub canonical_url: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub disable_comments: bool,
    pub series_slug: Option<String>,
    pub enable_table_of_contents: bool,
}

/// Outcome of validating a parsed frontmatter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// All rules passed; the post is publishable.
    Post(Box<PostMetadata>),
    /// `ignorePost: true` was set; the file is skipped without further checks.
    Ignored,
}

/// Every problem found in a frontmatter block, in rule order.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", issues.join("; "))]
pub struct ValidationFailure {
    pub issues: Vec<String>,
}

/// Validate a parsed frontmatter block against the post field contract.
///
/// # Errors
///
/// Returns a failure listing every missing or invalid field.
pub fn validate(doc: &Document) -> Result<Validated, ValidationFailure> {
    // ignorePost short-circuits before any other rule, so a file can opt
    // out without carrying the rest of the required fields.
    if doc
        .field("ignorePost")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return Ok(Validated::Ignored);
    }

    let mut issues = Vec::new();

    let title = require(doc, "title", &mut issues);
    let slug = require(doc, "slug", &mut issues);
    let raw_tags = require(doc, "tags", &mut issues);
    let domain = require(doc, "domain", &mut issues);

    let tags = raw_tags.map_or_else(Vec::new, |raw| parse_tags(raw, &mut issues));

    if let Some(slug) = slug.as_deref() {
        if !SLUG_PATTERN.is_match(slug) {
            issues.push(format!(
                "field `slug` must contain only letters, digits, and hyphens, got {slug:?}"
            ));
        }
    }

    let subtitle = optional_string(doc, "subtitle");
    let cover_image = optional_url(doc, "coverImage", &mut issues);
    let save_as_draft = optional_bool(doc, "saveAsDraft", &mut issues);
    let hide_from_community_feed = optional_bool(doc, "hideFromCommunityFeed", &mut issues);
    let canonical_url = optional_url(doc, "canonicalUrl", &mut issues);
    let seo_title = optional_string(doc, "seoTitle");
    let seo_description = optional_string(doc, "seoDescription");
    let disable_comments = optional_bool(doc, "disableComments", &mut issues);
    let series_slug = optional_string(doc, "seriesSlug");
    let enable_table_of_contents = optional_bool(doc, "enableTableOfContents", &mut issues);
    // An explicit `ignorePost: false` (or garbage) still has to be a valid boolean.
    let _ = optional_bool(doc, "ignorePost", &mut issues);

    if !issues.is_empty() {
        return Err(ValidationFailure { issues });
    }

    Ok(Validated::Post(Box::new(PostMetadata {
        title: title.expect("checked above"),
        slug: slug.expect("checked above"),
        tags,
        domain: domain.expect("checked above"),
        subtitle,
        cover_image,
        save_as_draft,
        hide_from_community_feed,
        canonical_url,
        seo_title,
        seo_description,
        disable_comments,
        series_slug,
        enable_table_of_contents,
    })))
}

fn require(doc: &Document, name: &str, issues: &mut Vec<String>) -> Option<String> {
    match doc.field(name) {
        Some(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Some(_) => {
            issues.push(format!("required field `{name}` is empty"));
            None
        }
        None => {
            issues.push(format!("missing required field `{name}`"));
            None
        }
    }
}

/// Split a comma-separated tag list into ordered, non-empty entries.
fn parse_tags(raw: String, issues: &mut Vec<String>) -> Vec<String> {
    let entries: Vec<&str> = raw.split(',').map(str::trim).collect();
    if entries.iter().any(|tag| tag.is_empty()) {
        issues.push("field `tags` contains an empty entry".to_string());
        return Vec::new();
    }
    if entries.len() > MAX_TAGS {
        issues.push(format!(
            "field `tags` has {} entries, exceeding the maximum of {MAX_TAGS}",
            entries.len()
        ));
        return Vec::new();
    }
    entries.into_iter().map(ToString::to_string).collect()
}

fn optional_string(doc: &Document, name: &str) -> Option<String> {
    doc.field(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn optional_url(doc: &Document, name: &str, issues: &mut Vec<String>) -> Option<String> {
    let value = optional_string(doc, name)?;
    match Url::parse(&value) {
        Ok(_) => Some(value),
        Err(e) => {
            issues.push(format!("field `{name}` is not a valid URL: {e}"));
            None
        }
    }
}

/// Boolean fields accept only the literals "true"/"false", case-insensitive.
/// Anything else is a validation error, not a silent default.
fn optional_bool(doc: &Document, name: &str, issues: &mut Vec<String>) -> bool {
    match doc.field(name) {
        None => false,
        Some(value) if value.eq_ignore_ascii_case("true") => true,
        Some(value) if value.eq_ignore_ascii_case("false") => false,
        Some(value) => {
            issues.push(format!(
                "field `{name}` must be \"true\" or \"false\", got {value:?}"
            ));
            false
        }
    }
}
