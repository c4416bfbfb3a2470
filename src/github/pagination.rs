//! Pagination primitives for GitHub list endpoints.
//!
//! GitHub paginates with a `Link` response header whose `rel="next"` entry
//! is the complete URL of the following page. That URL is carried forward
//! unchanged as an opaque [`PageToken`]; callers never construct one
//! themselves.

use serde_json::Value;

use super::client::ApiClient;
use super::endpoint::Endpoint;
use super::error::FetchError;

/// Largest page size GitHub accepts.
pub const MAX_PER_PAGE: u8 = 100;

/// Validated `per_page` query value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerPage(u8);

impl PerPage {
    /// Wraps a page size, rejecting zero and values above [`MAX_PER_PAGE`].
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value == 0 || value > MAX_PER_PAGE {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the numeric page size.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for PerPage {
    fn default() -> Self {
        Self(MAX_PER_PAGE)
    }
}

/// Opaque reference to the next page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken(String);

impl PageToken {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying URL.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// One page of raw items plus the token for the page after it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Items on this page, in the order GitHub returned them.
    pub items: Vec<Value>,
    /// Token for the next page, absent on the last page.
    pub next: Option<PageToken>,
}

impl Page {
    /// Builds a page from items and an optional next token.
    #[must_use]
    pub const fn new(items: Vec<Value>, next: Option<PageToken>) -> Self {
        Self { items, next }
    }
}

/// Extracts the `rel="next"` URL from a `Link` header value.
///
/// ```
/// use pr_backfill::github::pagination::next_page_token;
///
/// let header = r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=5>; rel="last""#;
/// let token = next_page_token(header).expect("next link");
/// assert_eq!(token.as_str(), "https://api.github.com/x?page=2");
/// ```
#[must_use]
pub fn next_page_token(link_header: &str) -> Option<PageToken> {
    link_header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let normalised = param.trim().replace(' ', "");
            normalised == "rel=\"next\"" || normalised == "rel=next"
        });
        if !is_next {
            return None;
        }
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        (!url.is_empty()).then(|| PageToken::new(url))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(PageToken),
    Exhausted,
}

/// Lazy, forward-only sequence over every page of one endpoint.
///
/// Each call to [`ResourcePages::next_page`] performs at most one API call.
/// A sequence cannot be rewound; build a new one to start over.
pub struct ResourcePages<'client> {
    client: &'client dyn ApiClient,
    endpoint: Endpoint,
    cursor: Cursor,
}

impl<'client> ResourcePages<'client> {
    /// Starts a sequence at the first page of `endpoint`.
    #[must_use]
    pub fn new(client: &'client dyn ApiClient, endpoint: Endpoint) -> Self {
        Self {
            client,
            endpoint,
            cursor: Cursor::Start,
        }
    }

    /// Endpoint this sequence walks.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns true once the last page has been returned.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Fetches the next page, returning `None` once the sequence is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns the client's [`FetchError`]. The cursor is left where it was,
    /// so the caller may decide whether to retry or stop.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>, FetchError> {
        let token = match &self.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
        };

        let page = self.client.get_page(&self.endpoint, token).await?;
        self.cursor = page.next.map_or(Cursor::Exhausted, Cursor::Next);
        Ok(Some(page.items))
    }

    /// Drains the remaining pages into one vector.
    ///
    /// # Errors
    ///
    /// Returns the first [`FetchError`] encountered; items from earlier pages
    /// are discarded.
    pub async fn collect_all(mut self) -> Result<Vec<Value>, FetchError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}

impl std::fmt::Debug for ResourcePages<'_> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ResourcePages")
            .field("endpoint", &self.endpoint)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}
