//! GraphQL client for the Hashnode publishing API.
//!
//! This is the only module with externally observable effects: it looks up
//! whether a post already exists for a (domain, slug) pair and issues the
//! create or update mutation. Transient failures are retried with bounded
//! exponential backoff; everything else is classified and surfaced to the
//! caller untouched.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::metadata::PostMetadata;

/// Classified failure from a Hashnode API call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Credentials rejected. Fatal for the whole run.
    #[error("authentication rejected by Hashnode: {0}")]
    Auth(String),
    /// The domain does not match any reachable publication. Fatal per file.
    #[error("no publication found for domain {0:?}")]
    PublicationNotFound(String),
    /// Network error or 429/5xx. Eligible for retry.
    #[error("transient error talking to Hashnode: {0}")]
    Transient(String),
    /// Hashnode rejected the request or payload. Not retried.
    #[error("Hashnode rejected the request: {0}")]
    Rejected(String),
}

/// An existing remote post for a (domain, slug) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePostIdentity {
    pub id: String,
    pub url: String,
}

/// Result of a create or update mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub url: String,
}

const PUBLICATION_QUERY: &str =
    "query PublicationByHost($host: String!) { publication(host: $host) { id } }";

const ACCOUNT_PUBLICATIONS_QUERY: &str = "query AccountPublications { me { publications(first: 10) { edges { node { id url } } } } }";

const POST_QUERY: &str = "query PostBySlug($host: String!, $slug: String!) { publication(host: $host) { post(slug: $slug) { id url } } }";

const PUBLISH_MUTATION: &str = "mutation PublishPost($input: PublishPostInput!) { publishPost(input: $input) { post { id url } } }";

const UPDATE_MUTATION: &str = "mutation UpdatePost($input: UpdatePostInput!) { updatePost(input: $input) { post { id url } } }";

/// Hashnode GraphQL API client.
pub struct HashnodeClient {
    client: Client,
    api_url: String,
    token: String,
    max_attempts: u32,
    retry_base_delay: Duration,
    /// Publication ids resolved during this run, keyed by host.
    publication_ids: RwLock<HashMap<String, String>>,
}

impl HashnodeClient {
    /// Create a new client from the application configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_url: config.api_url.clone(),
            token: config.access_token.trim().to_string(),
            max_attempts: config.max_attempts.max(1),
            retry_base_delay: config.retry_base_delay,
            publication_ids: RwLock::new(HashMap::new()),
        }
    }

    /// Look up whether a post with this (domain, slug) pair already exists.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ApiError`] when the lookup fails.
    pub async fn resolve_existing(
        &self,
        domain: &str,
        slug: &str,
    ) -> Result<Option<RemotePostIdentity>, ApiError> {
        let host = host_of(domain);
        debug!(%host, slug, "Looking up existing post");

        let data = self
            .graphql_with_retry(POST_QUERY, json!({ "host": host, "slug": slug }))
            .await?;

        let identity = data
            .pointer("/publication/post")
            .filter(|post| !post.is_null())
            .and_then(|post| {
                Some(RemotePostIdentity {
                    id: post.get("id")?.as_str()?.to_string(),
                    url: post.get("url")?.as_str()?.to_string(),
                })
            });

        Ok(identity)
    }

    /// Create the post, or update it in place when `existing` is given.
    ///
    /// Re-running on unchanged content converges to a single post per
    /// (domain, slug) pair, with the latest body winning.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ApiError`] when the mutation fails.
    pub async fn publish(
        &self,
        metadata: &PostMetadata,
        body: &str,
        existing: Option<&RemotePostIdentity>,
    ) -> Result<PublishedPost, ApiError> {
        let mut input = post_input(metadata, body);
        let fields = input.as_object_mut().expect("post input is an object");

        let (mutation, result_pointer) = if let Some(post) = existing {
            debug!(slug = %metadata.slug, post_id = %post.id, "Updating existing post");
            fields.insert("id".to_string(), json!(post.id));
            (UPDATE_MUTATION, "/updatePost/post/url")
        } else {
            let publication_id = self.resolve_publication(&metadata.domain).await?;
            debug!(slug = %metadata.slug, %publication_id, "Publishing new post");
            fields.insert("publicationId".to_string(), json!(publication_id));
            (PUBLISH_MUTATION, "/publishPost/post/url")
        };

        let data = self
            .graphql_with_retry(mutation, json!({ "input": input }))
            .await?;

        let url = data
            .pointer(result_pointer)
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Rejected("response is missing the post URL".to_string()))?;

        Ok(PublishedPost {
            url: url.to_string(),
        })
    }

    /// Resolve the publication id owning `domain`, caching per host for the run.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PublicationNotFound`] when neither the direct
    /// host query nor the account's publication list matches.
    pub async fn resolve_publication(&self, domain: &str) -> Result<String, ApiError> {
        let host = host_of(domain);

        {
            let cache = self.publication_ids.read().await;
            if let Some(id) = cache.get(&host) {
                return Ok(id.clone());
            }
        }

        let data = self
            .graphql_with_retry(PUBLICATION_QUERY, json!({ "host": host }))
            .await?;

        let direct = data
            .pointer("/publication/id")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let id = match direct {
            Some(id) => id,
            None => self
                .find_publication_in_account(&host)
                .await?
                .ok_or_else(|| ApiError::PublicationNotFound(host.clone()))?,
        };

        let mut cache = self.publication_ids.write().await;
        cache.insert(host, id.clone());
        Ok(id)
    }

    /// Fall back to the account's publication list, tolerating a missing or
    /// present `.hashnode.dev` suffix on either side.
    async fn find_publication_in_account(&self, host: &str) -> Result<Option<String>, ApiError> {
        let data = self
            .graphql_with_retry(ACCOUNT_PUBLICATIONS_QUERY, json!({}))
            .await?;

        let edges = data
            .pointer("/me/publications/edges")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for edge in &edges {
            let Some(node) = edge.get("node") else {
                continue;
            };
            let Some(url) = node.get("url").and_then(Value::as_str) else {
                continue;
            };
            if hosts_match(&host_of(url), host) {
                if let Some(id) = node.get("id").and_then(Value::as_str) {
                    debug!(%host, publication_id = %id, "Matched publication from account list");
                    return Ok(Some(id.to_string()));
                }
            }
        }

        Ok(None)
    }

    /// Issue a GraphQL request, retrying transient failures with bounded
    /// exponential backoff. Retry never applies to auth or rejection errors.
    async fn graphql_with_retry(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
        let mut attempt = 1;
        loop {
            match self.graphql(query, variables.clone()).await {
                Err(ApiError::Transient(reason)) if attempt < self.max_attempts => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "Transient Hashnode error, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// One GraphQL round trip with response classification.
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", self.token.as_str())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| ApiError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Auth(format!("HTTP {status}")));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(ApiError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(ApiError::Rejected(format!("HTTP {status}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Transient(format!("invalid response body: {e}")))?;

        if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(classify_graphql_errors(errors));
            }
        }

        payload
            .get("data")
            .filter(|data| !data.is_null())
            .cloned()
            .ok_or_else(|| ApiError::Rejected("response has no data".to_string()))
    }
}

/// GraphQL-level errors arrive with HTTP 200; an UNAUTHENTICATED code is an
/// auth failure, anything else is a payload rejection.
fn classify_graphql_errors(errors: &[Value]) -> ApiError {
    let messages = errors
        .iter()
        .filter_map(|err| err.get("message").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("; ");
    let messages = if messages.is_empty() {
        "unspecified GraphQL error".to_string()
    } else {
        messages
    };

    let unauthenticated = errors.iter().any(|err| {
        err.pointer("/extensions/code").and_then(Value::as_str) == Some("UNAUTHENTICATED")
    });

    if unauthenticated {
        ApiError::Auth(messages)
    } else {
        ApiError::Rejected(messages)
    }
}

/// Extract the bare host from a domain that may carry a scheme or path.
fn host_of(domain: &str) -> String {
    domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn hosts_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
        || a.trim_end_matches(".hashnode.dev")
            .eq_ignore_ascii_case(b.trim_end_matches(".hashnode.dev"))
}

/// Mutation input shared by create and update, mapped to Hashnode's field
/// names. Optional fields are omitted entirely when unset.
fn post_input(metadata: &PostMetadata, body: &str) -> Value {
    let tags: Vec<Value> = metadata
        .tags
        .iter()
        .map(|tag| json!({ "slug": tag, "name": tag }))
        .collect();

    let mut input = json!({
        "title": metadata.title,
        "slug": metadata.slug,
        "contentMarkdown": body,
        "tags": tags,
        "publishStatus": (if metadata.save_as_draft { "DRAFT" } else { "PUBLISHED" }),
    });
    let fields = input.as_object_mut().expect("input is an object");

    if let Some(subtitle) = &metadata.subtitle {
        fields.insert("subtitle".to_string(), json!(subtitle));
    }
    if let Some(cover) = &metadata.cover_image {
        fields.insert("coverImageURL".to_string(), json!(cover));
    }
    if metadata.hide_from_community_feed {
        fields.insert("hideFromHashnodeCommunity".to_string(), json!(true));
    }
    if let Some(canonical) = &metadata.canonical_url {
        fields.insert("originalArticleURL".to_string(), json!(canonical));
    }
    if let Some(seo_title) = &metadata.seo_title {
        fields.insert("seoTitle".to_string(), json!(seo_title));
    }
    if let Some(seo_description) = &metadata.seo_description {
        fields.insert("seoDescription".to_string(), json!(seo_description));
    }
    if metadata.disable_comments {
        fields.insert("disableComments".to_string(), json!(true));
    }
    if let Some(series) = &metadata.series_slug {
        fields.insert("seriesSlug".to_string(), json!(series));
    }
    if metadata.enable_table_of_contents {
        fields.insert("enableTableOfContents".to_string(), json!(true));
    }

    input
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> PostMetadata {
        PostMetadata {
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            tags: vec!["rust".to_string(), "ci".to_string()],
            domain: "blog.example".to_string(),
            subtitle: None,
            cover_image: None,
            save_as_draft: false,
            hide_from_community_feed: false,
            canonical_url: None,
            seo_title: None,
            seo_description: None,
            disable_comments: false,
            series_slug: None,
            enable_table_of_contents: false,
        }
    }

    #[test]
    fn test_host_of_strips_scheme_and_path() {
        assert_eq!(host_of("blog.example"), "blog.example");
        assert_eq!(host_of("https://blog.example/some/path"), "blog.example");
        assert_eq!(host_of("http://blog.example"), "blog.example");
        assert_eq!(host_of("  blog.example  "), "blog.example");
    }

    #[test]
    fn test_hosts_match_suffix_tolerant() {
        assert!(hosts_match("me.hashnode.dev", "me.hashnode.dev"));
        assert!(hosts_match("me", "me.hashnode.dev"));
        assert!(hosts_match("ME.hashnode.dev", "me"));
        assert!(!hosts_match("me.hashnode.dev", "you.hashnode.dev"));
    }

    #[test]
    fn test_post_input_minimal() {
        let input = post_input(&sample_metadata(), "body text");
        assert_eq!(input["title"], "Hello");
        assert_eq!(input["slug"], "hello");
        assert_eq!(input["contentMarkdown"], "body text");
        assert_eq!(input["publishStatus"], "PUBLISHED");
        assert_eq!(input["tags"][0]["slug"], "rust");
        assert_eq!(input["tags"][1]["name"], "ci");
        assert!(input.get("subtitle").is_none());
        assert!(input.get("coverImageURL").is_none());
        assert!(input.get("disableComments").is_none());
    }

    #[test]
    fn test_post_input_optional_fields() {
        let metadata = PostMetadata {
            subtitle: Some("sub".to_string()),
            cover_image: Some("https://img.example/c.png".to_string()),
            save_as_draft: true,
            hide_from_community_feed: true,
            canonical_url: Some("https://orig.example/p".to_string()),
            disable_comments: true,
            enable_table_of_contents: true,
            ..sample_metadata()
        };
        let input = post_input(&metadata, "");
        assert_eq!(input["publishStatus"], "DRAFT");
        assert_eq!(input["subtitle"], "sub");
        assert_eq!(input["coverImageURL"], "https://img.example/c.png");
        assert_eq!(input["hideFromHashnodeCommunity"], true);
        assert_eq!(input["originalArticleURL"], "https://orig.example/p");
        assert_eq!(input["disableComments"], true);
        assert_eq!(input["enableTableOfContents"], true);
    }

    #[test]
    fn test_classify_graphql_errors() {
        let auth = vec![json!({
            "message": "invalid token",
            "extensions": { "code": "UNAUTHENTICATED" }
        })];
        assert_eq!(
            classify_graphql_errors(&auth),
            ApiError::Auth("invalid token".to_string())
        );

        let rejected = vec![json!({ "message": "slug taken" })];
        assert_eq!(
            classify_graphql_errors(&rejected),
            ApiError::Rejected("slug taken".to_string())
        );
    }
}
