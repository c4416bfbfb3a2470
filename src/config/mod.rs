//! Application configuration loaded from CLI, environment, and files.
//!
//! Values are merged with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.pr-backfill.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PR_BACKFILL_OWNER`, `PR_BACKFILL_TOKEN`,
//!    and so on, plus the legacy `GITHUB_TOKEN` and `DATABASE_URL`
//! 4. **Command-line arguments** – `--owner`/`-o`, `--repo`/`-r`,
//!    `--token`/`-t`, `--database-url`
//!
//! # Configuration File
//!
//! ```toml
//! owner = "octocat"
//! repo = "hello-world"
//! token = "ghp_example"
//! database_url = "history.sqlite"
//! per_page = 50
//! skip_commits = false
//! ```

use std::env;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::error::BackfillError;
use crate::github::{
    DEFAULT_API_BASE, MAX_PER_PAGE, PerPage, PersonalAccessToken, RepositoryLocator, RetryPolicy,
};
use crate::persistence::PersistenceError;
use crate::pipeline::RunContext;

/// Environment variable consulted when no token is configured.
pub const LEGACY_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Environment variable consulted when no database URL is configured.
pub const LEGACY_DATABASE_URL_VAR: &str = "DATABASE_URL";

const DEFAULT_MAX_SERVER_RETRIES: usize = 3;

/// Backfill configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use pr_backfill::BackfillConfig;
///
/// let config = BackfillConfig::load().expect("failed to load configuration");
/// let context = config.run_context().expect("owner and repo required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PR_BACKFILL",
    discovery(
        dotfile_name = ".pr-backfill.toml",
        config_file_name = "pr-backfill.toml",
        app_name = "pr-backfill"
    )
)]
pub struct BackfillConfig {
    /// Repository owner (e.g., "octocat").
    ///
    /// Can be provided via:
    /// - CLI: `--owner <OWNER>` or `-o <OWNER>`
    /// - Environment: `PR_BACKFILL_OWNER`
    /// - Config file: `owner = "..."`
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name (e.g., "hello-world").
    ///
    /// Can be provided via:
    /// - CLI: `--repo <REPO>` or `-r <REPO>`
    /// - Environment: `PR_BACKFILL_REPO`
    /// - Config file: `repo = "..."`
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PR_BACKFILL_TOKEN` or `GITHUB_TOKEN` (legacy)
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Local `SQLite` database path the history tables live in.
    ///
    /// Can be provided via:
    /// - CLI: `--database-url <PATH>`
    /// - Environment: `PR_BACKFILL_DATABASE_URL` or `DATABASE_URL`
    /// - Config file: `database_url = "..."`
    #[ortho_config()]
    pub database_url: Option<String>,

    /// GitHub REST API base, for GitHub Enterprise installations.
    ///
    /// Defaults to `https://api.github.com`.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Items requested per page, between 1 and 100.
    #[ortho_config()]
    pub per_page: u8,

    /// Skips the repository commit listing.
    ///
    /// Can be provided via:
    /// - CLI: `--skip-commits`
    /// - Config file: `skip_commits = true`
    #[ortho_config()]
    pub skip_commits: bool,

    /// Runs database migrations and exits.
    ///
    /// When set, the database at `database_url` is created if needed, pending
    /// migrations are applied, the schema version is recorded in telemetry,
    /// and no GitHub requests are made.
    #[ortho_config()]
    pub migrate_db: bool,

    /// Retries after the first attempt for server and network failures.
    #[ortho_config()]
    pub max_server_retries: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            token: None,
            database_url: None,
            api_base: None,
            per_page: MAX_PER_PAGE,
            skip_commits: false,
            migrate_db: false,
            max_server_retries: DEFAULT_MAX_SERVER_RETRIES,
        }
    }
}

impl BackfillConfig {
    /// Resolves the token from configuration or the legacy `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::MissingToken`] when no source provides a
    /// non-blank value.
    pub fn resolve_token(&self) -> Result<PersonalAccessToken, BackfillError> {
        let value = self
            .token
            .clone()
            .or_else(|| env::var(LEGACY_TOKEN_VAR).ok())
            .ok_or(BackfillError::MissingToken)?;
        PersonalAccessToken::new(value)
    }

    /// Resolves the database URL from configuration or `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::Configuration`] when neither source is set.
    pub fn resolve_database_url(&self) -> Result<String, BackfillError> {
        self.database_url
            .clone()
            .or_else(|| env::var(LEGACY_DATABASE_URL_VAR).ok())
            .ok_or_else(|| BackfillError::Configuration {
                message: PersistenceError::MissingDatabaseUrl.to_string(),
            })
    }

    /// Builds the repository locator from owner, repo and API base.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::Configuration`] when owner or repo is missing,
    /// or the locator's own validation error for malformed values.
    pub fn locator(&self) -> Result<RepositoryLocator, BackfillError> {
        let (owner, repo) = match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => (owner.as_str(), repo.as_str()),
            (None, _) => {
                return Err(BackfillError::Configuration {
                    message: "repository owner is required (use --owner or -o)".to_owned(),
                });
            }
            (_, None) => {
                return Err(BackfillError::Configuration {
                    message: "repository name is required (use --repo or -r)".to_owned(),
                });
            }
        };
        let api_base = self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
        RepositoryLocator::with_api_base(api_base, owner, repo)
    }

    /// Validated page size.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::Configuration`] when `per_page` is outside
    /// 1..=100.
    pub fn per_page(&self) -> Result<PerPage, BackfillError> {
        PerPage::new(self.per_page).ok_or_else(|| BackfillError::Configuration {
            message: format!(
                "per_page must be between 1 and {MAX_PER_PAGE}, got {}",
                self.per_page
            ),
        })
    }

    /// Retry policy with the configured server retry budget.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_server_retries: self.max_server_retries,
            ..RetryPolicy::default()
        }
    }

    /// Resolves everything the orchestrator needs for one run.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::locator`] and [`Self::per_page`] failures.
    pub fn run_context(&self) -> Result<RunContext, BackfillError> {
        Ok(RunContext::new(self.locator()?)
            .with_per_page(self.per_page()?)
            .with_commits(!self.skip_commits))
    }
}
