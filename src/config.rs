use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::{ServiceError, ServiceResult};

/// Substitution keys accepted in `line_format`.
pub const LINE_FORMAT_KEYS: [&str; 5] =
    ["file", "text", "duration", "category", "category_index"];

/// Matches `{key}` placeholders in `line_format`. Shared with the transcript
/// renderer so validation and substitution agree on what a placeholder is.
pub(crate) static FORMAT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(.*?)\}").expect("valid regex"));

/// How the copy engine treats per-item failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyPolicy {
    /// First failure aborts the remaining in-flight batch.
    #[default]
    FailFast,
    /// Every item is attempted; failures are gathered and reported together.
    Collect,
}

/// Deployment configuration, read once from the environment at startup and
/// passed down explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// Base directory for the filesystem object store. Ignored when
    /// `storage_api_url` selects the remote backend.
    pub storage_root: String,
    pub storage_api_url: Option<String>,
    pub storage_api_token: String,
    /// Logical root under which all materialized export objects are written.
    pub output_prefix: String,
    /// Fixed object name of the downloadable zip.
    pub archive_key: String,
    /// Copy-engine permits; 0 means `available_parallelism * 5`.
    pub copy_concurrency: usize,
    pub copy_policy: CopyPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://clipbind.db?mode=rwc".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5840".to_string()),
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage".to_string()),
            storage_api_url: env::var("STORAGE_API_URL").ok(),
            storage_api_token: env::var("STORAGE_API_TOKEN").unwrap_or_default(),
            output_prefix: env::var("EXPORT_OUTPUT_PREFIX")
                .unwrap_or_else(|_| "export".to_string()),
            archive_key: env::var("EXPORT_ARCHIVE_KEY")
                .unwrap_or_else(|_| "dataset.zip".to_string()),
            copy_concurrency: env::var("EXPORT_COPY_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            copy_policy: match env::var("EXPORT_COPY_POLICY").as_deref() {
                Ok("collect") => CopyPolicy::Collect,
                _ => CopyPolicy::FailFast,
            },
        }
    }

    /// Effective copy-engine permit count.
    pub fn effective_copy_concurrency(&self) -> usize {
        if self.copy_concurrency > 0 {
            return self.copy_concurrency;
        }
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(6);
        cpus * 5
    }
}

fn default_true() -> bool {
    true
}

fn default_line_format() -> String {
    "{file}|{text}".to_string()
}

fn default_space_replacer() -> String {
    " ".to_string()
}

fn default_uncategorized() -> String {
    "Uncategorized".to_string()
}

/// Per-request export options.
///
/// `line_format` supports the keys `{file}`, `{text}`, `{duration}`,
/// `{category}` and `{category_index}`; anything else is rejected by
/// [`ExportOptions::validate`] before any I/O starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Drop bindings whose transcript text is blank after trimming.
    #[serde(default = "default_true")]
    pub omit_empty: bool,
    #[serde(default = "default_line_format")]
    pub line_format: String,
    #[serde(default = "default_true")]
    pub divide_by_category: bool,
    #[serde(default)]
    pub category_to_lower: bool,
    #[serde(default = "default_space_replacer")]
    pub category_space_replacer: String,
    #[serde(default = "default_true")]
    pub export_transcript: bool,
    /// Label used for bindings without a category.
    #[serde(default = "default_uncategorized")]
    pub uncategorized_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            omit_empty: true,
            line_format: default_line_format(),
            divide_by_category: true,
            category_to_lower: false,
            category_space_replacer: default_space_replacer(),
            export_transcript: true,
            uncategorized_name: default_uncategorized(),
        }
    }
}

impl ExportOptions {
    /// Reject unknown `line_format` keys. Surfaced synchronously, before the
    /// pipeline touches storage.
    pub fn validate(&self) -> ServiceResult<()> {
        for capture in FORMAT_KEY_RE.captures_iter(&self.line_format) {
            let key = &capture[1];
            if !LINE_FORMAT_KEYS.contains(&key) {
                return Err(ServiceError::Configuration(format!(
                    "unsupported key '{{{key}}}' in line_format; supported keys: {}",
                    LINE_FORMAT_KEYS
                        .iter()
                        .map(|k| format!("{{{k}}}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }
        Ok(())
    }
}
