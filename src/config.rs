//! Run configuration: built-in defaults, optionally overridden by a YAML file,
//! then by command line flags.

use crate::fetch::HttpOptions;
use crate::images::ImagePolicy;
use crate::parse::ParseOptions;
use crate::render::RenderOptions;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::{OffsetDateTime, macros::format_description};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Origin of the guides. Relative page URLs and cached pages resolve
    /// against it.
    pub base_url: String,
    /// Root of the on-disk layout (`html/`, `json/`, `md/`).
    pub docs_dir: PathBuf,
    pub content_selector: String,
    pub feature_selector: String,
    pub title_selector: String,
    /// Language tag for fenced code blocks.
    pub code_language: String,
    pub image_policy: ImagePolicy,
    pub download_images: bool,
    /// Start each document with an `Autocreated at` line.
    pub autocreated_stamp: bool,
    /// Write YAML frontmatter into new documents.
    pub frontmatter: bool,
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        let parse = ParseOptions::default();
        let http = HttpOptions::default();
        Self {
            base_url: "https://guides.rubyonrails.org".to_string(),
            docs_dir: PathBuf::from("docs"),
            content_selector: parse.content_selector,
            feature_selector: parse.feature_selector,
            title_selector: parse.title_selector,
            code_language: RenderOptions::default().code_language,
            image_policy: ImagePolicy::default(),
            download_images: true,
            autocreated_stamp: true,
            frontmatter: false,
            timeout_secs: http.timeout.map(|t| t.as_secs()),
            user_agent: http.user_agent,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file. Missing keys keep their defaults.
    pub fn load_from_yaml(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        let config: Config = serde_yaml::from_str(&text)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        let base = self.base_url()?;
        if base.host_str().is_none() {
            return Err(format!("base_url `{}` has no host", self.base_url));
        }
        if self.code_language.trim().is_empty() || self.code_language.contains(char::is_whitespace)
        {
            return Err(format!(
                "code_language `{}` must be a single word",
                self.code_language
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    /// The parsed base URL, always ending in `/` so that relative page paths
    /// join below it rather than replacing its last segment.
    pub fn base_url(&self) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid base_url `{}`: {e}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("base_url `{}` must be http or https", self.base_url));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn html_dir(&self) -> PathBuf {
        self.docs_dir.join("html")
    }

    pub fn json_dir(&self) -> PathBuf {
        self.docs_dir.join("json")
    }

    pub fn md_dir(&self) -> PathBuf {
        self.docs_dir.join("md")
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            content_selector: self.content_selector.clone(),
            feature_selector: self.feature_selector.clone(),
            title_selector: self.title_selector.clone(),
        }
    }

    /// Render options for a run started at `now`.
    pub fn render_options(&self, now: OffsetDateTime) -> RenderOptions {
        RenderOptions {
            code_language: self.code_language.clone(),
            image_policy: self.image_policy,
            autocreated_at: self.autocreated_stamp.then(|| format_stamp(now)),
        }
    }

    pub fn http_options(&self, scheme: &str) -> HttpOptions {
        HttpOptions {
            scheme: scheme.to_string(),
            user_agent: self.user_agent.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// `2024-05-01 10:30:00 UTC`
pub fn format_stamp(now: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    now.to_offset(time::UtcOffset::UTC)
        .format(&fmt)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
