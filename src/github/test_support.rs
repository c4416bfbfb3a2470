//! In-memory [`ApiClient`] for exercising fetchers and the pipeline without
//! HTTP.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::client::ApiClient;
use super::endpoint::Endpoint;
use super::error::FetchError;
use super::pagination::{Page, PageToken};

const PAGE_MARKER: &str = "#page=";

/// Serves scripted items per endpoint path, split into fixed-size pages.
///
/// Paths without a script return a single empty page. A scripted error is
/// returned for every request to that path.
#[derive(Debug)]
pub struct FakeApiClient {
    page_size: usize,
    items: HashMap<String, Vec<Value>>,
    errors: HashMap<String, FetchError>,
    requests: Mutex<Vec<String>>,
}

impl FakeApiClient {
    /// Creates a client that splits listings into pages of `page_size`
    /// (minimum one).
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            items: HashMap::new(),
            errors: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Scripts the items returned by `path`.
    #[must_use]
    pub fn with_items(mut self, path: &str, items: Vec<Value>) -> Self {
        self.items.insert(path.to_owned(), items);
        self
    }

    /// Scripts a single object response for `path`.
    #[must_use]
    pub fn with_object(self, path: &str, object: Value) -> Self {
        self.with_items(path, vec![object])
    }

    /// Makes every request to `path` fail with `error`.
    #[must_use]
    pub fn with_error(mut self, path: &str, error: FetchError) -> Self {
        self.errors.insert(path.to_owned(), error);
        self
    }

    /// Paths requested so far, one entry per page.
    ///
    /// # Panics
    ///
    /// Panics if the request log mutex is poisoned.
    #[must_use]
    #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("request log mutex should be available")
            .clone()
    }

    fn page_index(token: Option<&PageToken>) -> usize {
        token
            .and_then(|value| value.as_str().rsplit_once(PAGE_MARKER))
            .and_then(|(_, index)| index.parse().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ApiClient for FakeApiClient {
    #[expect(clippy::expect_used, reason = "test helper; poisoning is a test bug")]
    async fn get_page(
        &self,
        endpoint: &Endpoint,
        page_token: Option<&PageToken>,
    ) -> Result<Page, FetchError> {
        let path = endpoint.path();
        self.requests
            .lock()
            .expect("request log mutex should be available")
            .push(path.to_owned());

        if let Some(error) = self.errors.get(path) {
            return Err(error.clone());
        }

        let Some(items) = self.items.get(path) else {
            return Ok(Page::default());
        };

        let index = Self::page_index(page_token);
        let start = index.saturating_mul(self.page_size);
        let page_items: Vec<Value> = items
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        let has_more = start.saturating_add(self.page_size) < items.len();
        let next = has_more.then(|| PageToken::new(format!("{path}{PAGE_MARKER}{}", index + 1)));
        Ok(Page::new(page_items, next))
    }
}
