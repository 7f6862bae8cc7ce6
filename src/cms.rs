//! Content management boundary.
//!
//! [`ContentManagement`] is the contract the pipeline needs from the CMS;
//! [`ManagementClient`] implements it against the management REST API.
//! Calls are never retried here: a failed read aborts the run.

use crate::model::{ContentItem, ContentType, ContentTypeElement, ElementValue, ItemVariant, Language};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_MANAGEMENT_API_URL: &str = "https://manage.kontent.ai/v2";

/// Remote CMS operations used by the pipeline.
#[async_trait]
pub trait ContentManagement: Send + Sync {
    async fn list_content_types(&self) -> Result<Vec<ContentType>>;

    /// Elements of a content type snippet, or `None` when the snippet does not exist.
    async fn get_content_type_snippet(&self, snippet_id: &str) -> Result<Option<Vec<ContentTypeElement>>>;

    async fn read_item_variant(&self, item_id: &str, language_id: &str) -> Result<ItemVariant>;

    async fn read_item(&self, item_id: &str) -> Result<ContentItem>;

    async fn list_languages(&self) -> Result<Vec<Language>>;

    async fn upsert_item_variant(
        &self,
        item_id: &str,
        language_id: &str,
        elements: Vec<ElementValue>,
    ) -> Result<ItemVariant>;
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TypesPage {
    types: Vec<ContentType>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct LanguagesPage {
    languages: Vec<Language>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct SnippetResponse {
    elements: Vec<ContentTypeElement>,
}

#[derive(Debug, Serialize)]
struct UpsertVariantRequest {
    elements: Vec<ElementValue>,
}

/// Management API client scoped to one project.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: String,
}

impl ManagementClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            project_id: project_id.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            path
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        description: &str,
    ) -> Result<reqwest::Response> {
        request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Management API ({})", description))
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response, description: &str) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("Management API error ({}) for {}: {}", status, description, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse Management API response for {}", description))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let description = format!("GET {}", path);
        debug!("Management API {}", description);
        let response = self.send(self.http.get(self.url(path)), &description).await?;
        Self::parse(response, &description).await
    }

    /// Fetch every page of a listing endpoint, following `x-continuation`.
    async fn list_all<P, T>(&self, path: &str, into_parts: fn(P) -> (Vec<T>, Pagination)) -> Result<Vec<T>>
    where
        P: DeserializeOwned,
    {
        let description = format!("GET {}", path);
        let mut all = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self.http.get(self.url(path));
            if let Some(token) = &continuation {
                request = request.header("x-continuation", token);
            }

            let response = self.send(request, &description).await?;
            let page: P = Self::parse(response, &description).await?;
            let (items, pagination) = into_parts(page);
            all.extend(items);

            continuation = pagination.continuation_token;
            if continuation.is_none() {
                break;
            }
        }

        Ok(all)
    }
}

#[async_trait]
impl ContentManagement for ManagementClient {
    async fn list_content_types(&self) -> Result<Vec<ContentType>> {
        self.list_all("types", |page: TypesPage| (page.types, page.pagination))
            .await
    }

    async fn get_content_type_snippet(&self, snippet_id: &str) -> Result<Option<Vec<ContentTypeElement>>> {
        let path = format!("snippets/{}", snippet_id);
        let description = format!("GET {}", path);
        let response = self.send(self.http.get(self.url(&path)), &description).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let snippet: SnippetResponse = Self::parse(response, &description).await?;
        Ok(Some(snippet.elements))
    }

    async fn read_item_variant(&self, item_id: &str, language_id: &str) -> Result<ItemVariant> {
        self.get(&format!("items/{}/variants/{}", item_id, language_id))
            .await
    }

    async fn read_item(&self, item_id: &str) -> Result<ContentItem> {
        self.get(&format!("items/{}", item_id)).await
    }

    async fn list_languages(&self) -> Result<Vec<Language>> {
        self.list_all("languages", |page: LanguagesPage| {
            (page.languages, page.pagination)
        })
        .await
    }

    async fn upsert_item_variant(
        &self,
        item_id: &str,
        language_id: &str,
        elements: Vec<ElementValue>,
    ) -> Result<ItemVariant> {
        let path = format!("items/{}/variants/{}", item_id, language_id);
        let description = format!("PUT {}", path);
        let request = self
            .http
            .put(self.url(&path))
            .json(&UpsertVariantRequest { elements });

        let response = self.send(request, &description).await?;
        Self::parse(response, &description).await
    }
}
