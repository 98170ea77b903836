//! YAML frontmatter handling for generated Markdown.
//!
//! Goals:
//! - Preserve existing YAML frontmatter verbatim by default.
//! - Generate frontmatter when missing.
//! - Optionally regenerate frontmatter, best-effort merge of unknown keys.

use crate::ast::{GENERATOR_NAME, SCHEMA_VERSION};
use serde_yaml::Value;
use time::{OffsetDateTime, macros::format_description};

/// Top-level frontmatter we generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    pub guide2md: Guide2mdMeta,

    /// Page title, if the page has one.
    pub title: Option<String>,

    /// Extra unrecognized YAML keys preserved during regeneration.
    pub extras_yaml: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guide2mdMeta {
    pub page_id: String,
    pub source_url: String,
    pub generated_by: String,
    pub generated_date: String,
    pub schema_version: u32,
}

impl Frontmatter {
    pub fn to_yaml_string(&self) -> String {
        let mut out = String::new();
        out.push_str("---\n");
        out.push_str("guide2md:\n");
        out.push_str(&format!("  page_id: {}\n", yaml_quote(&self.guide2md.page_id)));
        out.push_str(&format!("  source_url: {}\n", self.guide2md.source_url));
        out.push_str(&format!("  generated_by: {}\n", self.guide2md.generated_by));
        out.push_str(&format!(
            "  generated_date: {}\n",
            self.guide2md.generated_date
        ));
        out.push_str(&format!(
            "  schema_version: {}\n",
            self.guide2md.schema_version
        ));

        if let Some(title) = self.title.as_ref().filter(|s| !s.trim().is_empty()) {
            out.push_str(&format!("title: {}\n", yaml_quote(title)));
        }

        if let Some(extra) = self.extras_yaml.as_ref().filter(|s| !s.trim().is_empty()) {
            out.push_str(extra);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out.push_str("---\n");
        out
    }
}

fn yaml_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// If `text` starts with YAML frontmatter (`---` ... `---`), return the frontmatter
/// block verbatim (including both `---` lines and their original newlines) and
/// the remainder of the document.
pub fn split_yaml_frontmatter(text: &str) -> Option<(String, &str)> {
    // "---" must be exactly on the first line; accept both \n and \r\n.
    if !(text.starts_with("---\n") || text.starts_with("---\r\n")) {
        return None;
    }

    let mut lines = text.split_inclusive('\n');
    let mut pos = lines.next()?.len();

    for line in lines {
        pos += line.len();
        if line.trim_end_matches(['\n', '\r']) == "---" {
            return Some((text[..pos].to_string(), &text[pos..]));
        }
    }
    None
}

/// Build frontmatter for a converted page.
pub fn build_frontmatter(
    page_id: &str,
    source_url: &str,
    title: Option<&str>,
    generated_at: OffsetDateTime,
) -> Frontmatter {
    let fmt = format_description!("[year]-[month]-[day]");
    let generated_date = generated_at
        .format(&fmt)
        .unwrap_or_else(|_| "1970-01-01".to_string());

    Frontmatter {
        guide2md: Guide2mdMeta {
            page_id: page_id.to_string(),
            source_url: source_url.to_string(),
            generated_by: GENERATOR_NAME.to_string(),
            generated_date,
            schema_version: SCHEMA_VERSION,
        },
        title: title.map(str::to_string),
        extras_yaml: None,
    }
}

/// Keep unknown top-level keys of an existing frontmatter block when the
/// block is regenerated. Keys we manage (`guide2md`, `title`) are replaced.
pub fn merge_existing_frontmatter_for_regeneration(generated: &mut Frontmatter, existing: &str) {
    let Some((block, _rest)) = split_yaml_frontmatter(existing) else {
        return;
    };
    let Some(inner) = extract_yaml_inner(&block) else {
        return;
    };
    let Ok(Value::Mapping(mut map)) = serde_yaml::from_str::<Value>(&inner) else {
        return;
    };

    for k in ["guide2md", "title"] {
        map.remove(Value::String(k.to_string()));
    }
    if map.is_empty() {
        generated.extras_yaml = None;
        return;
    }

    let serialized = serde_yaml::to_string(&Value::Mapping(map)).unwrap_or_default();
    let extras = serialized
        .strip_prefix("---\n")
        .unwrap_or(&serialized)
        .trim_end_matches("...\n")
        .to_string();
    if !extras.trim().is_empty() {
        generated.extras_yaml = Some(extras);
    }
}

fn extract_yaml_inner(frontmatter_block: &str) -> Option<String> {
    let mut lines = frontmatter_block.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let mut out = String::new();
    for line in lines {
        if line.trim_end() == "---" {
            break;
        }
        out.push_str(line);
        out.push('\n');
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> Frontmatter {
        build_frontmatter(
            "layouts_and_rendering",
            "https://guides.rubyonrails.org/layouts_and_rendering.html",
            Some("Layouts and \"Rendering\""),
            datetime!(2024-05-01 10:30 UTC),
        )
    }

    #[test]
    fn generated_block_layout() {
        assert_eq!(
            sample().to_yaml_string(),
            "---\n\
             guide2md:\n  \
               page_id: \"layouts_and_rendering\"\n  \
               source_url: https://guides.rubyonrails.org/layouts_and_rendering.html\n  \
               generated_by: guide2md\n  \
               generated_date: 2024-05-01\n  \
               schema_version: 1\n\
             title: \"Layouts and \\\"Rendering\\\"\"\n\
             ---\n"
        );
    }

    #[test]
    fn generated_block_is_valid_yaml() {
        let yaml = sample().to_yaml_string();
        let (block, rest) = split_yaml_frontmatter(&yaml).unwrap();
        assert_eq!(rest, "");
        let inner = extract_yaml_inner(&block).unwrap();
        let v: Value = serde_yaml::from_str(&inner).unwrap();
        assert_eq!(v["guide2md"]["page_id"].as_str(), Some("layouts_and_rendering"));
        assert_eq!(v["title"].as_str(), Some("Layouts and \"Rendering\""));
    }

    #[test]
    fn split_requires_delimiters_on_their_own_lines() {
        let (fm, rest) = split_yaml_frontmatter("---\r\na: 1\r\n---\r\n# Body\n").unwrap();
        assert_eq!(fm, "---\r\na: 1\r\n---\r\n");
        assert_eq!(rest, "# Body\n");

        assert!(split_yaml_frontmatter("--- a\n---\n").is_none());
        assert!(split_yaml_frontmatter("---\na: 1\n").is_none());
        assert!(split_yaml_frontmatter("# Title\n").is_none());
    }

    #[test]
    fn regeneration_keeps_unknown_keys_and_replaces_managed_ones() {
        let existing = "---\nguide2md:\n  page_id: old\ntitle: Old\nsummary: hand written\n---\nbody\n";
        let mut fm = sample();
        merge_existing_frontmatter_for_regeneration(&mut fm, existing);

        assert_eq!(fm.extras_yaml.as_deref(), Some("summary: hand written\n"));
        let yaml = fm.to_yaml_string();
        assert!(yaml.contains("page_id: \"layouts_and_rendering\""));
        assert!(!yaml.contains("old"));
        assert!(yaml.ends_with("summary: hand written\n---\n"), "{yaml}");
    }

    #[test]
    fn regeneration_ignores_broken_yaml() {
        let mut fm = sample();
        merge_existing_frontmatter_for_regeneration(&mut fm, "---\n: : [\n---\n");
        assert_eq!(fm.extras_yaml, None);
    }
}
