//! Shared constants used across the application.

/// Default Hashnode GraphQL endpoint.
pub const HASHNODE_API_URL: &str = "https://gql.hashnode.com";

/// File extension that marks a repository file as a post candidate.
pub const MARKDOWN_EXTENSION: &str = "md";

/// Repository documentation files that are never treated as posts.
pub const EXCLUDED_FILES: &[&str] = &["README.md", "SETUP.md"];
