// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Generic CRUD service over one dashboard resource.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::cache::QueryCache;
use super::models::{ListResponse, MutationResponse};
use crate::client::ApiClient;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Paging, sorting and search for `list` calls. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.order = Some(order);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Query parameters in wire order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sortBy".to_string(), sort_by.clone()));
        }
        if let Some(order) = self.order {
            params.push(("order".to_string(), order.as_str().to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("search".to_string(), search.to_string()));
        }
        params
    }

    /// Stable string form, used as the cache key.
    pub fn cache_key(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_params())
            .finish()
    }
}

fn validate_id(id: &str) -> ClientResult<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ClientError::InvalidUrl(format!("invalid resource id: {id:?}")));
    }
    Ok(id)
}

/// CRUD access to the rows of one resource.
pub struct ResourceService<T> {
    api: ApiClient,
    path: String,
    cache: Option<Arc<QueryCache>>,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceService<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            path: self.path.clone(),
            cache: self.cache.clone(),
            _row: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ResourceService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceService")
            .field("path", &self.path)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl<T: DeserializeOwned> ResourceService<T> {
    pub fn new(api: ApiClient, path: impl Into<String>) -> Self {
        let path = format!("/{}", path.into().trim_matches('/'));
        Self {
            api,
            path,
            cache: None,
            _row: PhantomData,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn item_path(&self, id: &str) -> ClientResult<String> {
        Ok(format!("{}/{}", self.path, validate_id(id)?))
    }

    /// Fetch one page of rows, served from the cache when fresh.
    pub async fn list(
        &self,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> ClientResult<ListResponse<T>> {
        let key = query.cache_key();
        let raw = match self.cache.as_ref().and_then(|c| c.get(&self.path, &key)) {
            Some(hit) => {
                debug!(path = %self.path, query = %key, "List served from cache");
                hit
            }
            None => {
                let fresh: Value = self
                    .api
                    .get_json(&self.path, query.to_params(), cancel)
                    .await?;
                if let Some(cache) = &self.cache {
                    cache.put(&self.path, &key, fresh.clone());
                }
                fresh
            }
        };

        serde_json::from_value(raw).map_err(|e| ClientError::Decode {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> ClientResult<T> {
        let path = self.item_path(id)?;
        self.api.get_json(&path, Vec::new(), cancel).await
    }

    pub async fn create<B: Serialize + ?Sized>(
        &self,
        body: &B,
        cancel: &CancellationToken,
    ) -> ClientResult<MutationResponse> {
        let response = self.api.post_json(&self.path, body, cancel).await?;
        self.invalidate();
        Ok(response)
    }

    pub async fn update<B: Serialize + ?Sized>(
        &self,
        id: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> ClientResult<MutationResponse> {
        let path = self.item_path(id)?;
        let response = self.api.patch_json(&path, body, cancel).await?;
        self.invalidate();
        Ok(response)
    }

    pub async fn delete(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<MutationResponse> {
        let path = self.item_path(id)?;
        let response = self.api.delete_json(&path, cancel).await?;
        self.invalidate();
        Ok(response)
    }

    fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_resource(&self.path);
        }
    }
}

/// A resource the dashboard only exposes for reading.
pub struct ReadOnlyService<T>(ResourceService<T>);

impl<T> Clone for ReadOnlyService<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for ReadOnlyService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnlyService").field(&self.0).finish()
    }
}

impl<T: DeserializeOwned> ReadOnlyService<T> {
    pub fn new(api: ApiClient, path: impl Into<String>) -> Self {
        Self(ResourceService::new(api, path))
    }

    pub fn with_cache(self, cache: Arc<QueryCache>) -> Self {
        Self(self.0.with_cache(cache))
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub async fn list(
        &self,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> ClientResult<ListResponse<T>> {
        self.0.list(query, cancel).await
    }

    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> ClientResult<T> {
        self.0.get(id, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::auth_api::fetch_current_user;
    use crate::services::models::Project;
    use crate::session::claims::test_tokens::live_jwt;
    use crate::session::store::TokenStore;
    use crate::testing::{Harness, MockApi};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    async fn logged_in() -> Harness {
        let harness = Harness::start(MockApi::default()).await;
        harness.store.set(
            &harness.api.accepted_access(),
            &harness.api.accepted_refresh(),
        );
        harness
    }

    fn projects(harness: &Harness, cache: Option<Arc<QueryCache>>) -> ResourceService<Project> {
        let service = ResourceService::new(harness.client.clone(), "projects");
        match cache {
            Some(cache) => service.with_cache(cache),
            None => service,
        }
    }

    #[test]
    fn query_params_skip_unset_fields() {
        assert!(ListQuery::default().to_params().is_empty());

        let query = ListQuery::default()
            .page(2, 25)
            .sort("createdAt", SortOrder::Desc)
            .search("  ");
        assert_eq!(
            query.to_params(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "25".to_string()),
                ("sortBy".to_string(), "createdAt".to_string()),
                ("order".to_string(), "desc".to_string()),
            ]
        );
        assert_eq!(query.cache_key(), "page=2&limit=25&sortBy=createdAt&order=desc");
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert_eq!(" desc ".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn ids_with_path_characters_are_rejected() {
        for id in ["", "  ", "a/b", "a?x=1", "a#b"] {
            assert!(validate_id(id).is_err(), "{id:?} should be rejected");
        }
        assert_eq!(validate_id(" p-1 ").unwrap(), "p-1");
    }

    #[tokio::test]
    async fn list_sends_query_and_decodes_rows() {
        let harness = logged_in().await;
        let cancel = CancellationToken::new();

        let query = ListQuery::default()
            .page(1, 10)
            .sort("name", SortOrder::Asc)
            .search("atlas");
        let page = projects(&harness, None).list(&query, &cancel).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].name, "Atlas");
        assert_eq!(page.data[0].extra["repository"], "org/atlas");
        assert_eq!(
            harness.api.seen_queries(),
            vec!["page=1&limit=10&sortBy=name&order=asc&search=atlas".to_string()]
        );
    }

    #[tokio::test]
    async fn cached_list_skips_the_network() {
        let harness = logged_in().await;
        let cancel = CancellationToken::new();
        let cache = Arc::new(QueryCache::new(8, Duration::from_secs(60)));
        let service = projects(&harness, Some(Arc::clone(&cache)));
        let query = ListQuery::default().page(1, 10);

        service.list(&query, &cancel).await.unwrap();
        service.list(&query, &cancel).await.unwrap();
        assert_eq!(harness.api.list_calls(), 1);

        service.list(&ListQuery::default().page(2, 10), &cancel).await.unwrap();
        assert_eq!(harness.api.list_calls(), 2);
    }

    #[tokio::test]
    async fn mutations_invalidate_cached_lists() {
        let harness = logged_in().await;
        let cancel = CancellationToken::new();
        let cache = Arc::new(QueryCache::new(8, Duration::from_secs(60)));
        let service = projects(&harness, Some(Arc::clone(&cache)));
        let query = ListQuery::default();

        service.list(&query, &cancel).await.unwrap();
        let created = service
            .create(&json!({ "name": "Cosmos" }), &cancel)
            .await
            .unwrap();
        assert_eq!(created.id, "p-3");
        assert_eq!(created.message, "Project Cosmos created");
        assert!(cache.is_empty());

        service.list(&query, &cancel).await.unwrap();
        assert_eq!(harness.api.list_calls(), 2);
    }

    #[tokio::test]
    async fn cached_lists_do_not_outlive_the_session() {
        let harness = logged_in().await;
        let cancel = CancellationToken::new();
        let cache = Arc::new(QueryCache::new(8, Duration::from_secs(60)));
        harness.client.refresh_flow().attach_cache(Arc::clone(&cache));
        let service = projects(&harness, Some(Arc::clone(&cache)));
        let query = ListQuery::default();

        service.list(&query, &cancel).await.unwrap();
        assert_eq!(harness.api.list_calls(), 1);

        harness
            .store
            .set(&live_jwt("revoked"), &harness.api.accepted_refresh());
        harness.api.reject_refresh();
        let err = fetch_current_user(&harness.client, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
        assert!(harness.store.pair().is_none());
        assert!(cache.is_empty());

        let err = service.list(&query, &cancel).await.unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(harness.api.list_calls(), 2);
    }

    #[tokio::test]
    async fn get_update_and_delete_use_item_paths() {
        let harness = logged_in().await;
        let cancel = CancellationToken::new();
        let service = projects(&harness, None);

        let project = service.get("p-1", &cancel).await.unwrap();
        assert_eq!(project.id, "p-1");

        let updated = service
            .update("p-1", &json!({ "name": "Atlas II" }), &cancel)
            .await
            .unwrap();
        assert_eq!(updated.message, "Project updated");

        let deleted = service.delete("p-2", &cancel).await.unwrap();
        assert_eq!(deleted.id, "p-2");
    }

    #[tokio::test]
    async fn missing_row_surfaces_status() {
        let harness = logged_in().await;
        let err = projects(&harness, None)
            .get("missing", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn invalid_id_never_reaches_the_server() {
        let harness = logged_in().await;
        let err = projects(&harness, None)
            .delete("../users", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
        assert!(harness.api.seen_authorization().is_empty());
    }

    #[tokio::test]
    async fn read_only_service_lists() {
        let harness = logged_in().await;
        let service: ReadOnlyService<Project> =
            ReadOnlyService::new(harness.client.clone(), "/projects/");
        assert_eq!(service.path(), "/projects");
        let page = service
            .list(&ListQuery::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }
}
