//! Resolve-URL construction for repository files.
//!
//! `{base}/{repo_id}/resolve/{revision}/{path}`, with each path segment
//! percent-encoded independently so spaces, `#`, `?` and `%` in file names
//! survive the trip.

use anyhow::{anyhow, Context, Result};
use url::Url;

/// Everything needed to address files of one repository.
#[derive(Debug, Clone)]
pub struct RepoLocation {
    /// Hub or mirror base URL.
    pub base_url: String,
    /// Repository id, usually `owner/name`.
    pub repo_id: String,
    pub revision: String,
}

impl RepoLocation {
    pub fn new(
        base_url: impl Into<String>,
        repo_id: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            repo_id: repo_id.into(),
            revision: revision.into(),
        }
    }

    /// URL of one repository-relative file.
    pub fn file_url(&self, relative_path: &str) -> Result<Url> {
        resolve_url(&self.base_url, &self.repo_id, &self.revision, relative_path)
    }
}

/// Builds the resolve URL for `relative_path` in `repo_id` at `revision`.
///
/// The revision is a single segment: a `/` inside it is encoded as `%2F`.
pub fn resolve_url(base: &str, repo_id: &str, revision: &str, relative_path: &str) -> Result<Url> {
    let mut url = Url::parse(base.trim()).with_context(|| format!("invalid base URL: {}", base))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("base URL cannot carry a path: {}", base))?;
        segments.pop_if_empty();
        segments.extend(repo_id.split('/').filter(|s| !s.is_empty()));
        segments.push("resolve");
        segments.push(revision);
        segments.extend(relative_path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}
