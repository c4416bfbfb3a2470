//! Authenticated GitHub REST client that hands back raw pages.
//!
//! [`ApiClient`] is the seam every fetcher goes through. The Octocrab-backed
//! implementation absorbs rate-limit waits, retries server and transport
//! failures with exponential backoff, and surfaces everything else as a
//! [`FetchError`].

mod response;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use http::Uri;
use http::header::{ACCEPT, HeaderName};
use octocrab::Octocrab;
use octocrab::service::middleware::retry::RetryConfig;
use tracing::{debug, info, warn};

use crate::error::BackfillError;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

use super::endpoint::Endpoint;
use super::error::FetchError;
use super::locator::{PersonalAccessToken, RepositoryLocator};
use super::pagination::{Page, PageToken};
use super::rate_limit::RateLimitGate;
use response::{Attempt, interpret_response, map_transport_error};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// Source of raw GitHub pages.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetches one page of `endpoint`. `page_token` is `None` for the first
    /// page and the previous page's `next` token afterwards.
    ///
    /// Rate-limit waits happen inside this call and are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for authentication failures, other 4xx
    /// responses, server or network failures that outlast the retry budget,
    /// undecodable bodies, and rate limits that outlast the wait cap.
    async fn get_page(
        &self,
        endpoint: &Endpoint,
        page_token: Option<&PageToken>,
    ) -> Result<Page, FetchError>;
}

/// Retry budget for server errors, transport errors and rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt for 5xx and transport failures.
    pub max_server_retries: usize,
    /// First backoff delay.
    pub min_delay: Duration,
    /// Longest backoff delay.
    pub max_delay: Duration,
    /// Consecutive rate-limit waits allowed for one page.
    pub max_rate_limit_waits: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_server_retries: 3,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_rate_limit_waits: 10,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_server_retries)
            .with_jitter()
    }
}

/// [`ApiClient`] backed by Octocrab.
pub struct OctocrabApiClient {
    client: Octocrab,
    api_base: String,
    gate: Arc<RateLimitGate>,
    policy: RetryPolicy,
    telemetry: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for OctocrabApiClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("OctocrabApiClient")
            .field("api_base", &self.api_base)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl OctocrabApiClient {
    /// Builds a client for the locator's API base.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::InvalidApiBase`] when the base cannot be used
    /// as a URI and [`BackfillError::Client`] when Octocrab fails to build.
    pub fn new(
        token: &PersonalAccessToken,
        locator: &RepositoryLocator,
    ) -> Result<Self, BackfillError> {
        let api_base = locator.api_base().as_str().trim_end_matches('/').to_owned();
        let client = build_octocrab_client(token, &api_base)?;
        Ok(Self {
            client,
            api_base,
            gate: Arc::new(RateLimitGate::new()),
            policy: RetryPolicy::default(),
            telemetry: Arc::new(NoopTelemetrySink),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shares an existing rate-limit gate with this client.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<RateLimitGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Routes rate-limit wait events to `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// The gate every request from this client passes through.
    #[must_use]
    pub const fn gate(&self) -> &Arc<RateLimitGate> {
        &self.gate
    }

    fn request_uri(
        &self,
        endpoint: &Endpoint,
        page_token: Option<&PageToken>,
    ) -> Result<Uri, FetchError> {
        let raw = page_token.map_or_else(
            || format!("{}{}", self.api_base, endpoint.first_page_path()),
            |token| token.as_str().to_owned(),
        );
        raw.parse::<Uri>().map_err(|error| FetchError::InvalidUri {
            endpoint: endpoint.path().to_owned(),
            message: error.to_string(),
        })
    }

    async fn send_once(&self, endpoint: &Endpoint, uri: &Uri) -> Result<Attempt, FetchError> {
        if let Some(waited) = self.gate.acquire().await {
            info!(
                endpoint = endpoint.path(),
                waited_ms = waited.as_millis(),
                "resumed after rate limit wait"
            );
            self.telemetry.record(TelemetryEvent::RateLimitWaited {
                endpoint: endpoint.path().to_owned(),
                waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            });
        }

        debug!(endpoint = endpoint.path(), %uri, "requesting page");
        let response = self
            .client
            ._get_with_headers(uri.clone(), None)
            .await
            .map_err(|error| map_transport_error(endpoint, &error))?;

        let status = response.status();
        let headers = response.headers().clone();
        self.gate.observe(&headers).await;

        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(|error| map_transport_error(endpoint, &error))?;

        interpret_response(endpoint, status, &headers, &body)
    }

    async fn send_with_retry(&self, endpoint: &Endpoint, uri: &Uri) -> Result<Attempt, FetchError> {
        (|| self.send_once(endpoint, uri))
            .retry(self.policy.backoff())
            .when(FetchError::is_transient)
            .notify(|error: &FetchError, delay: Duration| {
                warn!(
                    endpoint = error.endpoint(),
                    status = error.status(),
                    delay_ms = delay.as_millis(),
                    %error,
                    "retrying GitHub request"
                );
            })
            .await
    }
}

#[async_trait]
impl ApiClient for OctocrabApiClient {
    async fn get_page(
        &self,
        endpoint: &Endpoint,
        page_token: Option<&PageToken>,
    ) -> Result<Page, FetchError> {
        let uri = self.request_uri(endpoint, page_token)?;
        let mut waits: u32 = 0;

        loop {
            match self.send_with_retry(endpoint, &uri).await? {
                Attempt::Page(page) => return Ok(page),
                Attempt::RateLimited(wait) => {
                    if waits >= self.policy.max_rate_limit_waits {
                        return Err(FetchError::RateLimitExhausted {
                            endpoint: endpoint.path().to_owned(),
                            waits,
                        });
                    }
                    waits += 1;
                    warn!(
                        endpoint = endpoint.path(),
                        wait_secs = wait.as_secs(),
                        attempt = waits,
                        "rate limited by GitHub, waiting before retrying"
                    );
                    self.gate.block_for(wait).await;
                }
            }
        }
    }
}

/// Builds an Octocrab client for the given token and API base URL.
///
/// Octocrab's own retry layer is disabled; [`OctocrabApiClient`] retries with
/// its own policy so the budget is observable.
///
/// # Errors
///
/// Returns [`BackfillError::InvalidApiBase`] when the base URI cannot be
/// parsed or [`BackfillError::Client`] when Octocrab fails to construct a
/// client.
fn build_octocrab_client(
    token: &PersonalAccessToken,
    api_base: &str,
) -> Result<Octocrab, BackfillError> {
    let base_uri: Uri = api_base
        .parse::<Uri>()
        .map_err(|error| BackfillError::InvalidApiBase(error.to_string()))?;

    Octocrab::builder()
        .add_retry_config(RetryConfig::None)
        .add_header(ACCEPT, GITHUB_MEDIA_TYPE.to_owned())
        .add_header(
            HeaderName::from_static(API_VERSION_HEADER),
            API_VERSION.to_owned(),
        )
        .personal_token(token.as_ref())
        .base_uri(base_uri)
        .map_err(|error| BackfillError::Client {
            message: error.to_string(),
        })?
        .build()
        .map_err(|error| BackfillError::Client {
            message: error.to_string(),
        })
}
