//! Discovery and table-sync configuration.
//!
//! Both structs follow the builder pattern: start from `new()` and adjust
//! with `with_*` setters, then call `validate()` before use.

use crate::error::{Result, SyncError};
use crate::matcher::{Matcher, MatcherKind, build_matcher};
use crate::models::TableIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Selects the source tables that feed one target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Pattern for source database names (full match)
    pub database_pattern: String,

    /// Pattern for source table names (full match)
    pub table_pattern: String,

    /// How both patterns are interpreted.
    /// Default: regex
    #[serde(default)]
    pub matcher: MatcherKind,

    /// Maximum number of concurrent table metadata reads.
    /// Default: 4
    pub max_concurrency: usize,

    /// Consider system databases (`mysql`, `information_schema`,
    /// `performance_schema`, `sys`) during discovery.
    /// Default: false
    #[serde(default)]
    pub include_system: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            database_pattern: ".*".to_string(),
            table_pattern: ".*".to_string(),
            matcher: MatcherKind::default(),
            max_concurrency: 4,
            include_system: false,
        }
    }
}

impl DiscoveryConfig {
    /// Creates a discovery config for the given patterns.
    pub fn new(database_pattern: impl Into<String>, table_pattern: impl Into<String>) -> Self {
        Self {
            database_pattern: database_pattern.into(),
            table_pattern: table_pattern.into(),
            ..Default::default()
        }
    }

    /// Sets the pattern syntax.
    pub fn with_matcher(mut self, matcher: MatcherKind) -> Self {
        self.matcher = matcher;
        self
    }

    /// Sets the maximum concurrency for metadata reads.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Sets whether to include system databases.
    pub fn with_include_system(mut self, include_system: bool) -> Self {
        self.include_system = include_system;
        self
    }

    /// Builds the database name matcher.
    ///
    /// # Errors
    /// Returns `InvalidPattern` if the pattern does not compile.
    pub fn database_matcher(&self) -> Result<Box<dyn Matcher>> {
        build_matcher(self.matcher, &self.database_pattern)
    }

    /// Builds the table name matcher.
    ///
    /// # Errors
    /// Returns `InvalidPattern` if the pattern does not compile.
    pub fn table_matcher(&self) -> Result<Box<dyn Matcher>> {
        build_matcher(self.matcher, &self.table_pattern)
    }

    /// Validates patterns and limits.
    pub fn validate(&self) -> Result<()> {
        if self.database_pattern.trim().is_empty() {
            return Err(SyncError::configuration("database pattern cannot be empty"));
        }

        if self.table_pattern.trim().is_empty() {
            return Err(SyncError::configuration("table pattern cannot be empty"));
        }

        if self.max_concurrency == 0 {
            return Err(SyncError::configuration(
                "max_concurrency must be greater than 0",
            ));
        }

        self.database_matcher()?;
        self.table_matcher()?;

        Ok(())
    }
}

/// Everything needed to reconcile sources into one target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Which source tables to merge
    pub discovery: DiscoveryConfig,

    /// Destination table
    pub target: TableIdentifier,

    /// Explicit primary key; empty means use the sources' common key
    #[serde(default)]
    pub primary_keys: Vec<String>,

    /// Explicit partition keys; never inferred
    #[serde(default)]
    pub partition_keys: Vec<String>,

    /// Opaque table options passed to the catalog
    #[serde(default)]
    pub table_options: BTreeMap<String, String>,

    /// Plan only; never write to the catalog
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncConfig {
    /// Creates a config with no explicit keys or options.
    pub fn new(discovery: DiscoveryConfig, target: TableIdentifier) -> Self {
        Self {
            discovery,
            target,
            primary_keys: Vec::new(),
            partition_keys: Vec::new(),
            table_options: BTreeMap::new(),
            dry_run: false,
        }
    }

    /// Sets the explicit primary key.
    pub fn with_primary_keys(mut self, primary_keys: Vec<String>) -> Self {
        self.primary_keys = primary_keys;
        self
    }

    /// Sets the partition keys.
    pub fn with_partition_keys(mut self, partition_keys: Vec<String>) -> Self {
        self.partition_keys = partition_keys;
        self
    }

    /// Adds one table option, replacing an earlier value for the same key.
    pub fn with_table_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.table_options.insert(key.into(), value.into());
        self
    }

    /// Enables planning without catalog writes.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validates the discovery settings, target name and key lists.
    pub fn validate(&self) -> Result<()> {
        self.discovery.validate()?;

        if self.target.database.trim().is_empty() || self.target.table.trim().is_empty() {
            return Err(SyncError::configuration(
                "target database and table names cannot be empty",
            ));
        }

        check_key_list("primary key", &self.primary_keys)?;
        check_key_list("partition key", &self.partition_keys)?;

        Ok(())
    }
}

fn check_key_list(kind: &str, keys: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if key.trim().is_empty() {
            return Err(SyncError::configuration(format!(
                "{} column names cannot be empty",
                kind
            )));
        }
        if !seen.insert(key.as_str()) {
            return Err(SyncError::configuration(format!(
                "{} column '{}' is listed more than once",
                kind, key
            )));
        }
    }
    Ok(())
}

/// Parses a `key=value` argument. The value may itself contain `=`.
///
/// # Errors
/// Returns a configuration error when `=` is missing or the key is empty.
///
/// # Example
/// ```rust
/// use cdcsync_core::config::parse_key_value;
///
/// let (key, value) = parse_key_value("bucket=4").unwrap();
/// assert_eq!((key.as_str(), value.as_str()), ("bucket", "4"));
/// ```
pub fn parse_key_value(argument: &str) -> Result<(String, String)> {
    let (key, value) = argument.split_once('=').ok_or_else(|| {
        SyncError::configuration(format!(
            "Invalid option '{}': expected key=value",
            argument
        ))
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(SyncError::configuration(format!(
            "Invalid option '{}': key cannot be empty",
            argument
        )));
    }

    Ok((key.to_string(), value.trim().to_string()))
}
