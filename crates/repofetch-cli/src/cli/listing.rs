//! File listing sources: the hub tree API, or a local listing file.

use anyhow::{bail, Context, Result};
use repofetch_core::target::{FileListing, ListingEntry};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Recursive tree listing from the hub API.
pub struct HubListing {
    pub endpoint: String,
    pub repo_id: String,
    pub revision: String,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    size: Option<u64>,
}

impl HubListing {
    pub fn url(&self) -> String {
        format!(
            "{}/api/models/{}/tree/{}?recursive=true",
            self.endpoint.trim_end_matches('/'),
            self.repo_id.trim_matches('/'),
            self.revision
        )
    }
}

impl FileListing for HubListing {
    /// Blocking; call from `spawn_blocking` in async code.
    fn list(&self) -> Result<Vec<ListingEntry>> {
        let url = self.url();
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(&url).context("invalid listing URL")?;
        easy.follow_location(true)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(Duration::from_secs(60))?;
        if let Some(token) = &self.token {
            let mut list = curl::easy::List::new();
            list.append(&format!("Authorization: Bearer {}", token.trim()))?;
            easy.http_headers(list)?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().context("listing request failed")?;
        }

        let code = easy.response_code().context("no response code")?;
        match code {
            200 => {}
            401 | 403 => bail!("listing {} returned HTTP {} (token missing or not authorized)", url, code),
            404 => bail!("repository {} or revision {} not found", self.repo_id, self.revision),
            _ => bail!("listing {} returned HTTP {}", url, code),
        }
        parse_tree_json(&body)
    }
}

pub(crate) fn parse_tree_json(body: &[u8]) -> Result<Vec<ListingEntry>> {
    let entries: Vec<TreeEntry> =
        serde_json::from_slice(body).context("unexpected listing response")?;
    Ok(entries
        .into_iter()
        .map(|e| ListingEntry {
            is_dir: e.kind == "directory",
            size: if e.kind == "directory" { None } else { e.size },
            path: e.path,
        })
        .collect())
}

/// Listing read from a file with one `path<TAB>size` entry per line.
pub struct ListingFile {
    pub path: PathBuf,
}

impl FileListing for ListingFile {
    fn list(&self) -> Result<Vec<ListingEntry>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read listing {}", self.path.display()))?;
        parse_listing_text(&text)
            .with_context(|| format!("parse listing {}", self.path.display()))
    }
}

/// Blank lines and `#` comments are skipped; a missing size or `-` means unknown.
pub(crate) fn parse_listing_text(text: &str) -> Result<Vec<ListingEntry>> {
    let mut out = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let (path, size) = match line.split_once('\t') {
            Some((p, s)) => (p.trim(), s.trim()),
            None => (line.trim(), "-"),
        };
        let size = match size {
            "" | "-" => None,
            s => Some(
                s.parse::<u64>()
                    .with_context(|| format!("line {}: bad size {:?}", n + 1, s))?,
            ),
        };
        out.push(ListingEntry {
            path: path.to_string(),
            size,
            is_dir: path.ends_with('/'),
        });
    }
    Ok(out)
}
