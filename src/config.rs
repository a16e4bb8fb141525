//! Runtime configuration.
//!
//! Values are resolved in three layers: built-in defaults, then an optional
//! JSON file (`config.json` in the working directory, or an explicit path),
//! then environment variables. Later layers win.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use crate::crawler::{
    CrawlerSettings, DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS_PER_QUERY, DEFAULT_PAGE_SIZE,
    DEFAULT_PER_QUERY_SIZE, DEFAULT_QUERY_DELAY_MS, DEFAULT_REQUEST_DELAY_MS, HttpTimeouts, Pacer,
};
use crate::publish::{DEFAULT_BRANCH, RepoSlug};
use crate::storage::DataDirs;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_GITHUB_REPO: &str = "andreixdbolos/proiect-vf";
pub const DEFAULT_UPLOAD_PATH: &str = "data/verification_tools.json";

pub const ENV_API_URL: &str = "VTOOLS_API_URL";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_REPO: &str = "GITHUB_REPO";
pub const ENV_DATA_DIR: &str = "DATA_DIR";

/// Optional values read from the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub page_size: Option<usize>,
    pub per_query_size: Option<usize>,
    pub max_results_per_query: Option<usize>,
    pub request_delay_ms: Option<u64>,
    pub query_delay_ms: Option<u64>,
    /// Paginate every catalog query instead of requesting one page.
    pub paginate: Option<bool>,
    pub software_only: Option<bool>,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: Option<String>,
    pub upload_path: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
}

/// Fully resolved configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub page_size: usize,
    pub per_query_size: usize,
    pub max_results_per_query: usize,
    pub request_delay_ms: u64,
    pub query_delay_ms: u64,
    pub paginate: bool,
    pub software_only: bool,
    pub github_token: Option<String>,
    pub github_repo: String,
    pub github_branch: String,
    pub upload_path: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let timeouts = HttpTimeouts::default();
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            page_size: DEFAULT_PAGE_SIZE,
            per_query_size: DEFAULT_PER_QUERY_SIZE,
            max_results_per_query: DEFAULT_MAX_RESULTS_PER_QUERY,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            query_delay_ms: DEFAULT_QUERY_DELAY_MS,
            paginate: false,
            software_only: true,
            github_token: None,
            github_repo: DEFAULT_GITHUB_REPO.to_string(),
            github_branch: DEFAULT_BRANCH.to_string(),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            connect_timeout_secs: timeouts.connect_timeout_secs,
            read_timeout_secs: timeouts.read_timeout_secs,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("data_dir", &self.data_dir)
            .field("page_size", &self.page_size)
            .field("per_query_size", &self.per_query_size)
            .field("max_results_per_query", &self.max_results_per_query)
            .field("request_delay_ms", &self.request_delay_ms)
            .field("query_delay_ms", &self.query_delay_ms)
            .field("paginate", &self.paginate)
            .field("software_only", &self.software_only)
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("github_repo", &self.github_repo)
            .field("github_branch", &self.github_branch)
            .field("upload_path", &self.upload_path)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Resolves configuration from defaults, file and process environment.
    ///
    /// An explicit `config_path` must exist; the implicit `config.json` is
    /// optional.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, or the result is invalid.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        match config_path {
            Some(path) => config.apply_file(load_file_config(path)?),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    config.apply_file(load_file_config(path)?);
                }
            }
        }

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlays every value present in `file`.
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.page_size {
            self.page_size = v;
        }
        if let Some(v) = file.per_query_size {
            self.per_query_size = v;
        }
        if let Some(v) = file.max_results_per_query {
            self.max_results_per_query = v;
        }
        if let Some(v) = file.request_delay_ms {
            self.request_delay_ms = v;
        }
        if let Some(v) = file.query_delay_ms {
            self.query_delay_ms = v;
        }
        if let Some(v) = file.paginate {
            self.paginate = v;
        }
        if let Some(v) = file.software_only {
            self.software_only = v;
        }
        if file.github_token.is_some() {
            self.github_token = file.github_token;
        }
        if let Some(v) = file.github_repo {
            self.github_repo = v;
        }
        if let Some(v) = file.github_branch {
            self.github_branch = v;
        }
        if let Some(v) = file.upload_path {
            self.upload_path = v;
        }
        if let Some(v) = file.connect_timeout_secs {
            self.connect_timeout_secs = v;
        }
        if let Some(v) = file.read_timeout_secs {
            self.read_timeout_secs = v;
        }
    }

    /// Overlays environment variables; blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var(ENV_API_URL) {
            self.api_base_url = v;
        }
        if let Some(v) = var(ENV_GITHUB_TOKEN) {
            self.github_token = Some(v);
        }
        if let Some(v) = var(ENV_GITHUB_REPO) {
            self.github_repo = v;
        }
        if let Some(v) = var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(v);
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Names the first offending field and its accepted range.
    pub fn validate(&self) -> Result<()> {
        validate_range("page_size", self.page_size, 1, 100)?;
        validate_range("per_query_size", self.per_query_size, 1, 100)?;
        if self.max_results_per_query == 0 {
            bail!("Invalid config value for `max_results_per_query`: 0. Expected at least 1");
        }
        validate_delay("request_delay_ms", self.request_delay_ms)?;
        validate_delay("query_delay_ms", self.query_delay_ms)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        url::Url::parse(&self.api_base_url).with_context(|| {
            format!("Invalid config value for `api_base_url`: {}", self.api_base_url)
        })?;
        self.repo_slug()?;
        Ok(())
    }

    /// Parsed `github_repo`.
    ///
    /// # Errors
    ///
    /// Fails unless `github_repo` has the form `owner/name`.
    pub fn repo_slug(&self) -> Result<RepoSlug> {
        self.github_repo
            .parse()
            .with_context(|| format!("Invalid config value for `github_repo`: {}", self.github_repo))
    }

    #[must_use]
    pub fn crawler_settings(&self) -> CrawlerSettings {
        CrawlerSettings {
            page_size: self.page_size,
            per_query_size: self.per_query_size,
            max_results_per_query: self.max_results_per_query,
            software_only: self.software_only,
            paginate: self.paginate,
        }
    }

    #[must_use]
    pub fn pacer(&self) -> Pacer {
        Pacer::new(
            Duration::from_millis(self.request_delay_ms),
            Duration::from_millis(self.query_delay_ms),
        )
    }

    #[must_use]
    pub fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect_timeout_secs: self.connect_timeout_secs,
            read_timeout_secs: self.read_timeout_secs,
        }
    }

    #[must_use]
    pub fn data_dirs(&self) -> DataDirs {
        DataDirs::new(&self.data_dir)
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: FileConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn validate_range(field: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

fn validate_delay(field: &str, value: u64) -> Result<()> {
    if value > 60_000 {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 0..=60000");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: u64) -> Result<()> {
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}
