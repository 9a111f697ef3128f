//! Page set resolution.
//!
//! The page set is the ordered list of logical paths plus the staging and
//! production base URLs. It is loaded once per run from a JSON file:
//!
//! ```json
//! {
//!   "staging": { "baseUrl": "https://staging.example.com", "urls": ["/", "/apply/"] },
//!   "prod":    { "baseUrl": "https://www.example.com",     "urls": ["/", "/apply/"] }
//! }
//! ```
//!
//! `staging.urls` is authoritative; `prod.urls` is only checked for parity.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Result type for page set operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors loading or resolving the page set. These abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read page set {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid page set JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid base URL for {label}: '{url}' (expected http:// or https://)")]
    BaseUrl { label: Environment, url: String },

    #[error("page set is empty")]
    Empty,

    #[error("page set failed validation: {0}")]
    Validation(String),
}

/// Which side of the comparison a capture belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    /// Directory name under `screenshots/<device>/`
    pub fn dir_name(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "prod",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logical, environment-agnostic page path, e.g. `/apply/` or `/search?q=x`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PagePath(String);

impl PagePath {
    /// Create a page path, adding the leading `/` when missing
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim();
        if trimmed.starts_with('/') {
            Self(trimmed.to_string())
        } else {
            Self(format!("/{}", trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Flat file stem for this path: path separators become `_`
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| match c {
                '/' | '\\' => '_',
                _ => c,
            })
            .collect()
    }
}

impl fmt::Display for PagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A labelled base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentTarget {
    pub label: Environment,
    pub base_url: String,
}

impl EnvironmentTarget {
    pub fn new(label: Environment, base_url: impl Into<String>) -> Self {
        Self {
            label,
            base_url: base_url.into(),
        }
    }

    /// Resolve a page path against this base URL
    pub fn resolve(&self, page: &PagePath) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            page.as_str().trim_start_matches('/')
        )
    }
}

/// One environment block of the page set file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    pub base_url: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// On-disk page set file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSetConfig {
    pub staging: EnvironmentConfig,
    pub prod: EnvironmentConfig,
}

/// A problem found by the validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSetIssue {
    /// Production list differs from the staging list at this position
    ParityMismatch {
        index: usize,
        staging: Option<String>,
        prod: Option<String>,
    },
    /// The same staging path appears more than once
    Duplicate(String),
    /// Two different paths map to the same artifact file name
    NameCollision {
        first: String,
        second: String,
        sanitized: String,
    },
}

impl fmt::Display for PageSetIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSetIssue::ParityMismatch {
                index,
                staging,
                prod,
            } => write!(
                f,
                "entry {}: staging has {} but prod has {}",
                index,
                staging.as_deref().unwrap_or("<missing>"),
                prod.as_deref().unwrap_or("<missing>")
            ),
            PageSetIssue::Duplicate(path) => write!(f, "duplicate path {}", path),
            PageSetIssue::NameCollision {
                first,
                second,
                sanitized,
            } => write!(
                f,
                "{} and {} both map to artifact name {}",
                first, second, sanitized
            ),
        }
    }
}

/// The resolved, immutable page set for a run
#[derive(Debug, Clone)]
pub struct PageSet {
    pub staging: EnvironmentTarget,
    pub production: EnvironmentTarget,
    pub pages: Vec<PagePath>,
    /// Artifact file stem per page, parallel to `pages`
    stems: Vec<String>,
    issues: Vec<PageSetIssue>,
}

impl PageSet {
    /// Build a page set directly (no parity information)
    pub fn new(
        staging_base: impl Into<String>,
        production_base: impl Into<String>,
        pages: impl IntoIterator<Item = impl Into<String>>,
    ) -> ConfigResult<Self> {
        let pages: Vec<PagePath> = pages.into_iter().map(|p| PagePath::new(p)).collect();
        let config = PageSetConfig {
            staging: EnvironmentConfig {
                base_url: staging_base.into(),
                urls: pages.iter().map(|p| p.as_str().to_string()).collect(),
            },
            prod: EnvironmentConfig {
                base_url: production_base.into(),
                urls: pages.iter().map(|p| p.as_str().to_string()).collect(),
            },
        };
        Self::from_config(config)
    }

    /// Load and resolve a page set file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: PageSetConfig = serde_json::from_str(text)?;
        Self::from_config(config)
    }

    pub fn from_config(config: PageSetConfig) -> ConfigResult<Self> {
        check_base_url(Environment::Staging, &config.staging.base_url)?;
        check_base_url(Environment::Production, &config.prod.base_url)?;

        if config.staging.urls.is_empty() {
            return Err(ConfigError::Empty);
        }

        let issues = validate(&config);

        // Duplicates are compared once, at their first position
        let mut seen = HashSet::new();
        let pages: Vec<PagePath> = config
            .staging
            .urls
            .iter()
            .map(PagePath::new)
            .filter(|page| seen.insert(page.clone()))
            .collect();
        let stems = artifact_stems(&pages);

        Ok(Self {
            staging: EnvironmentTarget::new(Environment::Staging, config.staging.base_url),
            production: EnvironmentTarget::new(Environment::Production, config.prod.base_url),
            pages,
            stems,
            issues,
        })
    }

    /// Problems found while loading; empty when the file is consistent
    pub fn issues(&self) -> &[PageSetIssue] {
        &self.issues
    }

    /// Fail on any validation issue (used by `--strict`)
    pub fn require_valid(&self) -> ConfigResult<()> {
        if self.issues.is_empty() {
            return Ok(());
        }
        let joined = self
            .issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Validation(joined))
    }

    /// Pages paired with their artifact file stems, in run order
    pub fn entries(&self) -> impl Iterator<Item = (&PagePath, &str)> + '_ {
        self.pages.iter().zip(self.stems.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn check_base_url(label: Environment, url: &str) -> ConfigResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::BaseUrl {
            label,
            url: url.to_string(),
        })
    }
}

/// One unique file stem per page.
///
/// The first page keeps its sanitized name; a later page whose name is
/// already taken gets a `~N` suffix.
fn artifact_stems(pages: &[PagePath]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let base = page.sanitized();
            let mut stem = base.clone();
            let mut suffix = index;
            while taken.contains(&stem) {
                stem = format!("{}~{}", base, suffix);
                suffix += 1;
            }
            taken.insert(stem.clone());
            stem
        })
        .collect()
}

/// Parity, duplicate and artifact-name checks over the raw file
fn validate(config: &PageSetConfig) -> Vec<PageSetIssue> {
    let mut issues = Vec::new();

    let staging: Vec<PagePath> = config.staging.urls.iter().map(PagePath::new).collect();
    let prod: Vec<PagePath> = config.prod.urls.iter().map(PagePath::new).collect();

    for index in 0..staging.len().max(prod.len()) {
        let s = staging.get(index);
        let p = prod.get(index);
        if s != p {
            issues.push(PageSetIssue::ParityMismatch {
                index,
                staging: s.map(|x| x.to_string()),
                prod: p.map(|x| x.to_string()),
            });
        }
    }

    let mut seen: HashMap<String, &PagePath> = HashMap::new();
    for page in &staging {
        match seen.get(&page.sanitized()) {
            Some(existing) if *existing == page => {
                issues.push(PageSetIssue::Duplicate(page.to_string()));
            }
            Some(existing) => {
                issues.push(PageSetIssue::NameCollision {
                    first: existing.to_string(),
                    second: page.to_string(),
                    sanitized: page.sanitized(),
                });
            }
            None => {
                seen.insert(page.sanitized(), page);
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "staging": { "baseUrl": "https://staging.example.com/", "urls": ["/", "/apply/", "search?q=a"] },
        "prod": { "baseUrl": "https://www.example.com", "urls": ["/", "/apply/", "/search?q=a"] }
    }"#;

    #[test]
    fn test_page_path_sanitized() {
        assert_eq!(PagePath::new("/apply/").sanitized(), "_apply_");
        assert_eq!(PagePath::new("/").sanitized(), "_");
        assert_eq!(PagePath::new("a\\b").sanitized(), "_a_b");
        assert_eq!(PagePath::new("/search?q=x").sanitized(), "_search?q=x");
    }

    #[test]
    fn test_resolve_joins_single_slash() {
        let target = EnvironmentTarget::new(Environment::Staging, "https://staging.example.com/");
        assert_eq!(
            target.resolve(&PagePath::new("/apply/")),
            "https://staging.example.com/apply/"
        );
        assert_eq!(
            target.resolve(&PagePath::new("/")),
            "https://staging.example.com/"
        );
    }

    #[test]
    fn test_from_json() {
        let set = PageSet::from_json(SAMPLE).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.pages[2].as_str(), "/search?q=a");
        assert!(set.issues().is_empty(), "{:?}", set.issues());
        assert_eq!(
            set.production.resolve(&set.pages[1]),
            "https://www.example.com/apply/"
        );
    }

    #[test]
    fn test_parity_mismatch_reported() {
        let json = r#"{
            "staging": { "baseUrl": "https://s.example.com", "urls": ["/a", "/b"] },
            "prod": { "baseUrl": "https://p.example.com", "urls": ["/a"] }
        }"#;
        let set = PageSet::from_json(json).unwrap();
        assert_eq!(
            set.issues(),
            &[PageSetIssue::ParityMismatch {
                index: 1,
                staging: Some("/b".to_string()),
                prod: None,
            }]
        );
        assert!(matches!(set.require_valid(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_duplicates_and_collisions() {
        let set = PageSet::new(
            "https://s.example.com",
            "https://p.example.com",
            ["/a/b", "/a_b", "/a/b"],
        )
        .unwrap();
        assert_eq!(set.issues().len(), 2);
        assert!(matches!(set.issues()[0], PageSetIssue::NameCollision { .. }));
        assert_eq!(set.issues()[1], PageSetIssue::Duplicate("/a/b".to_string()));

        // Duplicate dropped, colliding page gets its own stem
        let entries: Vec<(&str, &str)> = set.entries().map(|(p, s)| (p.as_str(), s)).collect();
        assert_eq!(entries, vec![("/a/b", "_a_b"), ("/a_b", "_a_b~1")]);
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        let set = PageSet::new(
            "https://s.example.com",
            "https://p.example.com",
            ["/x", "/y", "/x", "/y", "/z"],
        )
        .unwrap();
        let pages: Vec<&str> = set.pages.iter().map(|p| p.as_str()).collect();
        assert_eq!(pages, vec!["/x", "/y", "/z"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_artifact_stems_are_unique() {
        let pages: Vec<PagePath> = ["/a/b", "/a_b", "/a_b~1", "/a\\b"]
            .into_iter()
            .map(PagePath::new)
            .collect();
        let stems = artifact_stems(&pages);
        assert_eq!(stems, vec!["_a_b", "_a_b~1", "_a_b~1~2", "_a_b~3"]);
        let unique: HashSet<&String> = stems.iter().collect();
        assert_eq!(unique.len(), stems.len());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let err = PageSet::new("staging.example.com", "https://p.example.com", ["/"]).unwrap_err();
        assert!(matches!(err, ConfigError::BaseUrl { label: Environment::Staging, .. }));
    }

    #[test]
    fn test_rejects_empty() {
        let err = PageSet::new("https://s.example.com", "https://p.example.com", Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Empty));
    }
}
