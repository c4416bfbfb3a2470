//! Identity wrappers for the repository being backfilled.

use url::Url;

use crate::error::BackfillError;

/// Default public GitHub REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

fn validate_segment(value: &str) -> Result<&str, BackfillError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BackfillError::InvalidRepositorySegment {
            segment: value.to_owned(),
            reason: "must not be blank",
        });
    }
    if trimmed.contains('/') || trimmed.contains('?') || trimmed.contains('#') {
        return Err(BackfillError::InvalidRepositorySegment {
            segment: value.to_owned(),
            reason: "must be a single path segment",
        });
    }
    Ok(trimmed)
}

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    /// Validates an owner (user or organisation) name.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::InvalidRepositorySegment`] when the value is
    /// blank or contains a path separator.
    pub fn new(value: &str) -> Result<Self, BackfillError> {
        validate_segment(value).map(|segment| Self(segment.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validates a repository name.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::InvalidRepositorySegment`] when the value is
    /// blank or contains a path separator.
    pub fn new(value: &str) -> Result<Self, BackfillError> {
        validate_segment(value).map(|segment| Self(segment.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Pull request number within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Wraps a pull request number, rejecting zero.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PullRequestNumber {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::MissingToken`] when the supplied string is
    /// blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, BackfillError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(BackfillError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

impl std::fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("PersonalAccessToken(***)")
    }
}

/// Repository being backfilled together with the API base it lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Creates a locator for `owner/repo` on the public GitHub API.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::InvalidRepositorySegment`] when owner or repo
    /// is blank or not a single path segment.
    pub fn from_owner_repo(owner: &str, repo: &str) -> Result<Self, BackfillError> {
        Self::with_api_base(DEFAULT_API_BASE, owner, repo)
    }

    /// Creates a locator for `owner/repo` on the given API base, such as a
    /// GitHub Enterprise `https://ghe.example.com/api/v3` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`BackfillError::InvalidApiBase`] when the base cannot be
    /// parsed and [`BackfillError::InvalidRepositorySegment`] for bad
    /// owner or repo values.
    pub fn with_api_base(api_base: &str, owner: &str, repo: &str) -> Result<Self, BackfillError> {
        let parsed_base = Url::parse(api_base.trim())
            .map_err(|error| BackfillError::InvalidApiBase(error.to_string()))?;
        if !matches!(parsed_base.scheme(), "http" | "https") {
            return Err(BackfillError::InvalidApiBase(format!(
                "unsupported scheme {scheme:?}",
                scheme = parsed_base.scheme()
            )));
        }

        Ok(Self {
            api_base: parsed_base,
            owner: RepositoryOwner::new(owner)?,
            repository: RepositoryName::new(repo)?,
        })
    }

    /// API base URL requests are sent to.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// `owner/repo`, used as the stored `repository_id`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.as_str(), self.repository.as_str())
    }

    pub(crate) fn repo_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            self.owner.as_str(),
            self.repository.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{PersonalAccessToken, PullRequestNumber, RepositoryLocator};
    use crate::error::BackfillError;

    #[rstest]
    fn from_owner_repo_uses_public_api() {
        let locator =
            RepositoryLocator::from_owner_repo("octo", "repo").expect("locator should build");
        assert_eq!(locator.api_base().as_str(), "https://api.github.com/");
        assert_eq!(locator.full_name(), "octo/repo");
        assert_eq!(locator.repo_path(), "/repos/octo/repo");
    }

    #[rstest]
    fn trims_surrounding_whitespace() {
        let locator =
            RepositoryLocator::from_owner_repo(" octo ", "repo\n").expect("locator should build");
        assert_eq!(locator.owner().as_str(), "octo");
        assert_eq!(locator.repository().as_str(), "repo");
    }

    #[rstest]
    #[case::blank_owner("", "repo")]
    #[case::blank_repo("octo", "   ")]
    #[case::nested_owner("octo/cat", "repo")]
    #[case::query_in_repo("octo", "repo?x=1")]
    fn rejects_invalid_segments(#[case] owner: &str, #[case] repo: &str) {
        let result = RepositoryLocator::from_owner_repo(owner, repo);
        assert!(
            matches!(
                result,
                Err(BackfillError::InvalidRepositorySegment { .. })
            ),
            "expected InvalidRepositorySegment, got {result:?}"
        );
    }

    #[rstest]
    #[case::not_a_url("not a url")]
    #[case::ftp("ftp://example.com")]
    fn rejects_invalid_api_base(#[case] base: &str) {
        let result = RepositoryLocator::with_api_base(base, "octo", "repo");
        assert!(
            matches!(result, Err(BackfillError::InvalidApiBase(_))),
            "expected InvalidApiBase, got {result:?}"
        );
    }

    #[rstest]
    fn token_rejects_blank_and_hides_value() {
        assert_eq!(
            PersonalAccessToken::new("  "),
            Err(BackfillError::MissingToken)
        );
        let token = PersonalAccessToken::new(" ghp_secret ").expect("token should be valid");
        assert_eq!(token.value(), "ghp_secret");
        assert!(!format!("{token:?}").contains("ghp_secret"));
    }

    #[rstest]
    fn pull_request_number_rejects_zero() {
        assert_eq!(PullRequestNumber::new(0), None);
        assert_eq!(PullRequestNumber::new(7).map(PullRequestNumber::get), Some(7));
    }
}
