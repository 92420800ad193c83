//! Target set: the remote files selected for one session.
//!
//! Pure data. A target is keyed by its repository-relative path and carries
//! the size the listing reported, which may be unknown.

use anyhow::{bail, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// One remote file selected for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// Size reported by the listing; `None` when unknown.
    pub expected_size: Option<u64>,
}

impl DownloadTarget {
    pub fn new(path: impl Into<String>, expected_size: Option<u64>) -> Self {
        Self {
            path: path.into(),
            expected_size,
        }
    }

    /// Local file for this target under `local_dir` (destination root + folder).
    pub fn local_path(&self, local_dir: &Path) -> PathBuf {
        local_dir.join(&self.path)
    }
}

/// Entry returned by a file listing source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub path: String,
    pub size: Option<u64>,
    pub is_dir: bool,
}

/// Source of (relative path, size-or-unknown) pairs for a repository.
pub trait FileListing {
    fn list(&self) -> Result<Vec<ListingEntry>>;
}

/// Drops entries that are not downloadable files: directories, paths ending
/// in `/`, and unknown-size entries whose basename has no extension and is
/// not a dotfile (these are almost always directory placeholders).
pub fn filter_listing(entries: Vec<ListingEntry>) -> Vec<ListingEntry> {
    let mut out: Vec<ListingEntry> = entries
        .into_iter()
        .filter(|e| !e.is_dir && !e.path.is_empty() && !e.path.ends_with('/'))
        .filter(|e| {
            if e.size.is_some() {
                return true;
            }
            let base = e.path.rsplit('/').next().unwrap_or("");
            base.starts_with('.') || Path::new(base).extension().is_some()
        })
        .collect();
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

/// Default local folder name for a repository: its last path segment.
pub fn default_folder(repo_id: &str) -> String {
    repo_id
        .rsplit('/')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

fn check_relative(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("empty target path");
    }
    for c in Path::new(path).components() {
        match c {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("target path escapes destination: {}", path),
        }
    }
    Ok(())
}

/// Ordered, duplicate-free set of targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    targets: Vec<DownloadTarget>,
}

impl TargetSet {
    /// Build from targets in the given order. Fails on duplicate or unsafe paths.
    pub fn new(targets: Vec<DownloadTarget>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(targets.len());
        for t in &targets {
            check_relative(&t.path)?;
            if !seen.insert(t.path.as_str()) {
                bail!("duplicate target path: {}", t.path);
            }
        }
        Ok(Self { targets })
    }

    /// Resolve `selected` paths against a listing, keeping the selection order.
    /// Paths absent from the listing are kept with an unknown size.
    pub fn select(listing: &[ListingEntry], selected: &[String]) -> Result<Self> {
        let sizes: BTreeMap<&str, Option<u64>> = listing
            .iter()
            .map(|e| (e.path.as_str(), e.size))
            .collect();
        let targets = selected
            .iter()
            .map(|p| {
                let size = sizes.get(p.as_str()).copied().flatten();
                DownloadTarget::new(p.clone(), size)
            })
            .collect();
        Self::new(targets)
    }

    /// Every file of a listing, in listing order.
    pub fn from_listing(listing: &[ListingEntry]) -> Result<Self> {
        Self::new(
            listing
                .iter()
                .map(|e| DownloadTarget::new(e.path.clone(), e.size))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DownloadTarget> {
        self.targets.iter()
    }

    pub fn as_slice(&self) -> &[DownloadTarget] {
        &self.targets
    }

    pub fn paths(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.path.clone()).collect()
    }

    pub fn size_map(&self) -> BTreeMap<String, Option<u64>> {
        self.targets
            .iter()
            .map(|t| (t.path.clone(), t.expected_size))
            .collect()
    }

    /// Sum of known sizes; unknown sizes contribute nothing.
    pub fn total_expected_bytes(&self) -> u64 {
        self.targets.iter().filter_map(|t| t.expected_size).sum()
    }
}

impl<'a> IntoIterator for &'a TargetSet {
    type Item = &'a DownloadTarget;
    type IntoIter = std::slice::Iter<'a, DownloadTarget>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, size: Option<u64>) -> ListingEntry {
        ListingEntry {
            path: path.to_string(),
            size,
            is_dir: false,
        }
    }

    #[test]
    fn filter_drops_dirs_and_extensionless_unknowns() {
        let entries = vec![
            entry("model.safetensors", Some(10)),
            ListingEntry {
                path: "onnx".to_string(),
                size: None,
                is_dir: true,
            },
            entry("weights/", None),
            entry("LICENSE", None),
            entry(".gitattributes", None),
            entry("config.json", None),
            entry("README", Some(12)),
        ];
        let kept: Vec<String> = filter_listing(entries).into_iter().map(|e| e.path).collect();
        assert_eq!(
            kept,
            vec![".gitattributes", "README", "config.json", "model.safetensors"]
        );
    }

    #[test]
    fn default_folder_is_last_segment() {
        assert_eq!(default_folder("org/model-7b"), "model-7b");
        assert_eq!(default_folder("solo"), "solo");
        assert_eq!(default_folder(""), "");
    }

    #[test]
    fn select_keeps_order_and_sizes() {
        let listing = vec![entry("a.bin", Some(10)), entry("b/c.json", Some(5))];
        let set = TargetSet::select(
            &listing,
            &["b/c.json".to_string(), "a.bin".to_string(), "x.txt".to_string()],
        )
        .unwrap();
        assert_eq!(set.paths(), vec!["b/c.json", "a.bin", "x.txt"]);
        assert_eq!(set.as_slice()[2].expected_size, None);
        assert_eq!(set.total_expected_bytes(), 15);
    }

    #[test]
    fn rejects_duplicates_and_escaping_paths() {
        assert!(TargetSet::new(vec![
            DownloadTarget::new("a", Some(1)),
            DownloadTarget::new("a", Some(1)),
        ])
        .is_err());
        assert!(TargetSet::new(vec![DownloadTarget::new("../etc/passwd", None)]).is_err());
        assert!(TargetSet::new(vec![DownloadTarget::new("/abs/path", None)]).is_err());
        assert!(TargetSet::new(vec![DownloadTarget::new("", None)]).is_err());
    }

    #[test]
    fn local_path_joins_relative() {
        let t = DownloadTarget::new("sub/dir/file.bin", None);
        assert_eq!(
            t.local_path(Path::new("/data/model")),
            PathBuf::from("/data/model/sub/dir/file.bin")
        );
    }
}
