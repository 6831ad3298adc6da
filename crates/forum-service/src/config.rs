//! # Forum Configuration
//!
//! Settings handed to services and use-cases at construction time.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FORUM_DATABASE_PATH=/var/lib/forum/forum.db                        │
//! │     FORUM_POSTS_PER_RANK=50                                            │
//! │                                                                         │
//! │  2. TOML Config File (path in FORUM_CONFIG)                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # forum.toml
//! database_path = "forum.db"
//! max_connections = 5
//! posts_per_rank = 50
//! default_page_limit = 20
//! max_page_limit = 100
//! default_sort_order = "DESC"
//! ```

use forum_core::{
    Pagination, Sort, SortKey, SortOrder, DEFAULT_PAGE, DEFAULT_PAGE_LIMIT,
    DEFAULT_POSTS_PER_RANK, MAX_PAGE_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_VAR: &str = "FORUM_CONFIG";

/// Forum settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of pooled connections.
    /// Default: 5
    pub max_connections: u32,

    /// Posts needed per rank step.
    /// Default: 50
    pub posts_per_rank: i64,

    /// Page size used when a listing has no pagination.
    /// Default: 20
    pub default_page_limit: i64,

    /// Page used when a listing has no pagination.
    /// Default: 1
    pub default_page: i64,

    /// Largest page size a caller may request. Also caps id-list filters.
    /// Default: 100
    pub max_page_limit: i64,

    /// Order applied with the default `created_at` sort.
    /// Default: DESC (newest first)
    pub default_sort_order: SortOrder,
}

impl Default for ForumConfig {
    fn default() -> Self {
        ForumConfig {
            database_path: PathBuf::from("forum.db"),
            max_connections: 5,
            posts_per_rank: DEFAULT_POSTS_PER_RANK,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            default_page: DEFAULT_PAGE,
            max_page_limit: MAX_PAGE_LIMIT,
            default_sort_order: SortOrder::Desc,
        }
    }
}

impl ForumConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `FORUM_CONFIG`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path.or_else(|| std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Reads a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading forum config from file");
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `FORUM_*` overrides looked up through `var`.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("FORUM_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }
        if let Some(value) = var("FORUM_MAX_CONNECTIONS") {
            self.max_connections = parse("FORUM_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = var("FORUM_POSTS_PER_RANK") {
            self.posts_per_rank = parse("FORUM_POSTS_PER_RANK", &value)?;
        }
        if let Some(value) = var("FORUM_PAGE_LIMIT") {
            self.default_page_limit = parse("FORUM_PAGE_LIMIT", &value)?;
        }
        if let Some(value) = var("FORUM_MAX_PAGE_LIMIT") {
            self.max_page_limit = parse("FORUM_MAX_PAGE_LIMIT", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".into()));
        }
        if self.posts_per_rank < 1 {
            return Err(ConfigError::InvalidValue("posts_per_rank".into()));
        }
        if self.max_page_limit < 1 {
            return Err(ConfigError::InvalidValue("max_page_limit".into()));
        }
        if self.default_page_limit < 1 || self.default_page_limit > self.max_page_limit {
            return Err(ConfigError::InvalidValue("default_page_limit".into()));
        }
        if self.default_page < 1 {
            return Err(ConfigError::InvalidValue("default_page".into()));
        }
        Ok(())
    }

    /// The caller's pagination, or the configured default page.
    pub fn pagination_or_default(&self, pagination: Option<Pagination>) -> Pagination {
        pagination.unwrap_or(Pagination::new(self.default_page_limit, self.default_page))
    }

    /// The caller's sort, or `created_at` in the configured order.
    pub fn sort_or_default<K: SortKey>(&self, sort: Option<Sort<K>>) -> Sort<K> {
        sort.unwrap_or(Sort::new(K::CREATED_AT, self.default_sort_order))
    }

    /// Largest id list a filter may carry.
    pub fn max_ids(&self) -> usize {
        usize::try_from(self.max_page_limit).unwrap_or(0)
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::UserSortBy;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ForumConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.posts_per_rank, 50);
        assert_eq!(config.default_sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ForumConfig::from_toml("posts_per_rank = 3\ndefault_sort_order = \"ASC\"").unwrap();

        assert_eq!(config.posts_per_rank, 3);
        assert_eq!(config.default_sort_order, SortOrder::Asc);
        assert_eq!(config.default_page_limit, 20);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ForumConfig::from_toml("posts_per_rank = 3").unwrap();

        config
            .apply_overrides(env(&[
                ("FORUM_POSTS_PER_RANK", "10"),
                ("FORUM_DATABASE_PATH", "/tmp/other.db"),
            ]))
            .unwrap();

        assert_eq!(config.posts_per_rank, 10);
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn test_unparsable_override_is_rejected() {
        let mut config = ForumConfig::default();

        let err = config
            .apply_overrides(env(&[("FORUM_PAGE_LIMIT", "lots")]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue(name) if name == "FORUM_PAGE_LIMIT"));
    }

    #[test]
    fn test_validate_rejects_non_positive_values() {
        let config = ForumConfig {
            posts_per_rank: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ForumConfig {
            default_page_limit: 500,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listing_defaults() {
        let config = ForumConfig::default();

        assert_eq!(config.pagination_or_default(None), Pagination::new(20, 1));
        assert_eq!(
            config.pagination_or_default(Some(Pagination::new(5, 2))),
            Pagination::new(5, 2)
        );

        let sort = config.sort_or_default::<UserSortBy>(None);
        assert_eq!(sort.by, UserSortBy::CreatedAt);
        assert_eq!(sort.order, SortOrder::Desc);
    }
}
