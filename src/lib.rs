//! Hashnode sync library.
//!
//! Reconciles markdown posts in a git repository with posts on a Hashnode
//! publication: changed files are parsed for frontmatter, validated, and
//! created or updated in place so the publication converges on the
//! repository content.

pub mod changeset;
pub mod config;
pub mod constants;
pub mod frontmatter;
pub mod hashnode;
pub mod metadata;
pub mod reconciler;
pub mod report;
