//! HTML -> document tree parser.
//!
//! Parsing is delegated to `scraper` (html5ever). This module only locates the
//! regions the renderer cares about and converts them into immutable
//! [`DocumentNode`] trees. It is error-tolerant: a missing region is recorded
//! as a diagnostic rather than failing the page.

mod util;

pub use util::{MAX_DEPTH, collapse_whitespace};

use crate::ast::*;
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// CSS selectors for the page regions.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Main content region; its children are the blocks to render.
    pub content_selector: String,
    /// Feature header block (introduction + summary list).
    pub feature_selector: String,
    /// Page title node.
    pub title_selector: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            content_selector: "#mainCol".to_string(),
            feature_selector: "#feature .wrapper".to_string(),
            title_selector: "#feature .wrapper h2".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid CSS selector `{selector}`: {message}")]
    Selector { selector: String, message: String },
}

/// Result of parsing a page.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub page: Page,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a page with the default selectors.
pub fn parse_html(html: &str) -> ParseOutput {
    parse_page(html, &ParseOptions::default()).expect("default selectors are valid")
}

/// Parse an HTML page into a [`Page`].
///
/// If the content region is missing, the whole `<body>` is used instead.
pub fn parse_page(html: &str, opts: &ParseOptions) -> Result<ParseOutput, ParseError> {
    let content_sel = selector(&opts.content_selector)?;
    let feature_sel = selector(&opts.feature_selector)?;
    let title_sel = selector(&opts.title_selector)?;
    let body_sel = selector("body")?;

    let document = Html::parse_document(html);
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    let content = match document.select(&content_sel).next() {
        Some(el) => convert_region(el, &mut diagnostics),
        None => {
            warn!(
                "content region `{}` not found; falling back to <body>",
                opts.content_selector
            );
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticPhase::Parse,
                    "parse.content.missing",
                    format!("content region `{}` not found", opts.content_selector),
                )
                .with_note("the whole <body> is rendered instead"),
            );
            match document.select(&body_sel).next() {
                Some(body) => convert_region(body, &mut diagnostics),
                None => DocumentNode::element(NodeRole::Container, vec![]),
            }
        }
    };

    let feature = document
        .select(&feature_sel)
        .next()
        .map(|el| convert_region(el, &mut diagnostics));

    let title = document
        .select(&title_sel)
        .next()
        .map(|el| convert_region(el, &mut diagnostics));

    if title.is_none() {
        debug!("title `{}` not found", opts.title_selector);
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            phase: Some(DiagnosticPhase::Parse),
            code: Some("parse.title.missing".to_string()),
            message: format!("title `{}` not found", opts.title_selector),
            node: None,
            notes: vec![],
        });
    }

    Ok(ParseOutput {
        page: Page {
            title,
            feature,
            content,
        },
        diagnostics,
    })
}

fn convert_region(el: ElementRef<'_>, diagnostics: &mut Vec<Diagnostic>) -> DocumentNode {
    let (node, clamped) = util::convert_element(el);
    if clamped {
        warn!("nesting deeper than {MAX_DEPTH} levels flattened in {}", node.describe());
        diagnostics.push(
            Diagnostic::warning(
                DiagnosticPhase::Parse,
                "parse.depth_clamped",
                format!("element nesting deeper than {MAX_DEPTH} levels was flattened to text"),
            )
            .with_node(node.describe()),
        );
    }
    node
}

fn selector(s: &str) -> Result<Selector, ParseError> {
    Selector::parse(s).map_err(|e| ParseError::Selector {
        selector: s.to_string(),
        message: e.to_string(),
    })
}
