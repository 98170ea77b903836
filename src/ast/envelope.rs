use crate::ast::{Diagnostic, Page};
use serde::{Deserialize, Serialize};

/// Top-level JSON file written to `<docs>/json/{page_id}.json`.
///
/// This wraps a parsed `Page` with metadata that makes debugging easier
/// (schema versioning, source info, diagnostics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFile {
    /// Schema version for this JSON payload.
    pub schema_version: u32,

    pub generator: GeneratorInfo,

    /// Stable identifier used for caching on disk.
    pub page_id: String,

    pub source: SourceInfo,

    /// Parser diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,

    pub page: Page,
}

/// Identifies the program that produced the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub name: String,
    pub version: String,
}

impl Default for GeneratorInfo {
    fn default() -> Self {
        Self {
            name: crate::ast::GENERATOR_NAME.to_string(),
            version: crate::ast::GENERATOR_VERSION.to_string(),
        }
    }
}

/// Information about the HTML the tree was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// URL the page was fetched from, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Path of the cached `.html` file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Length of the HTML input in bytes.
    pub byte_len: u64,
}
