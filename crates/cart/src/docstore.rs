//! Document store client.
//!
//! The document database is an external collaborator; this module defines
//! the narrow surface the cart needs from it - get one document, merge
//! fields into one document - plus a REST implementation of that surface.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::DocStoreConfig;
use crate::remote::RepositoryError;

/// A string-keyed document database.
///
/// `update` has update-merge semantics: the given top-level fields are set
/// on the document, other fields are left alone, and the document is created
/// if it does not exist.
pub trait DocumentStore {
    /// Fetch a document; `Ok(None)` when it does not exist.
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Value>, RepositoryError>> + Send;

    /// Merge `fields` into a document, creating it if absent.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

// =============================================================================
// RestDocumentStore
// =============================================================================

/// Client for a JSON document REST API.
///
/// Documents live at `{base}/{collection}/{id}`; `GET` reads one document
/// and `PATCH` upserts fields into it. Authentication is a bearer token.
#[derive(Clone)]
pub struct RestDocumentStore {
    inner: Arc<RestDocumentStoreInner>,
}

struct RestDocumentStoreInner {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl RestDocumentStore {
    /// Create a new document store client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Http` if the HTTP client cannot be built.
    pub fn new(config: &DocStoreConfig) -> Result<Self, RepositoryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(RestDocumentStoreInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token().to_owned(),
            }),
        })
    }

    /// Build `{base}/{collection}/{id}`, percent-encoding both segments so
    /// an id containing `/` or `?` cannot address a different resource.
    fn document_url(&self, collection: &str, id: &str) -> Url {
        let mut url = self.inner.base_url.clone();
        // Config validation rejects cannot-be-a-base URLs, so this branch
        // is always taken.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection).push(id);
        }
        url
    }
}

impl DocumentStore for RestDocumentStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, RepositoryError> {
        let response = self
            .inner
            .client
            .get(self.document_url(collection, id))
            .bearer_auth(&self.inner.token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(collection, id, "Document not found");
            return Ok(None);
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Document API returned non-success status"
            );
            return Err(RepositoryError::Status(status));
        }

        let document: Value = serde_json::from_str(&body)?;
        Ok(Some(document))
    }

    #[instrument(skip(self, fields))]
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), RepositoryError> {
        let response = self
            .inner
            .client
            .patch(self.document_url(collection, id))
            .bearer_auth(&self.inner.token)
            .json(&fields)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Document API rejected update"
            );
            return Err(RepositoryError::Status(status));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use url::Url;

    use super::*;

    fn config(base: &str) -> DocStoreConfig {
        DocStoreConfig {
            base_url: Url::parse(base).expect("valid url"),
            token: SecretString::from("kq7f93hv0a8s6dj2lmz4".to_owned()),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_document_url_joins_collection_and_id() {
        let store = RestDocumentStore::new(&config("https://docs.example.com/v1")).expect("client");
        assert_eq!(
            store.document_url("users", "u-1").as_str(),
            "https://docs.example.com/v1/users/u-1"
        );
    }

    #[test]
    fn test_document_url_tolerates_trailing_slash() {
        let store = RestDocumentStore::new(&config("https://docs.example.com/v1/")).expect("client");
        assert_eq!(
            store.document_url("users", "u-1").as_str(),
            "https://docs.example.com/v1/users/u-1"
        );
    }

    #[test]
    fn test_document_url_encodes_hostile_id_characters() {
        let store = RestDocumentStore::new(&config("https://docs.example.com/v1")).expect("client");
        assert_eq!(
            store.document_url("users", "u/1?admin=true").as_str(),
            "https://docs.example.com/v1/users/u%2F1%3Fadmin=true"
        );
    }
}
