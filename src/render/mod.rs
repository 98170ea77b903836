//! Document tree -> Markdown renderer.
//!
//! The renderer only knows a fixed set of block shapes (see [`BlockKind`]).
//! Every top-level child of the content region is classified once and
//! rendered by the matching renderer; anything else is skipped without looking
//! inside it. Nested content is handled by the renderer that owns it, chiefly
//! the shallow inline-run renderer in [`inline`].

mod admonition;
mod code;
mod header;
mod inline;
mod table;

pub use admonition::{AdmonitionKind, render_admonition};
pub use code::{is_code_container, render_code};
pub use header::render_header;
pub use inline::render_inline;
pub use table::{SEPARATOR_ROW, render_table};

use crate::ast::*;
use crate::images::{ImageError, ImageMaterializer, ImagePolicy};
use crate::output::{DocumentWriter, OutputTarget};
use log::{trace, warn};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Rendering options that control formatting decisions.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Language tag put on every fenced code block.
    pub code_language: String,

    /// What to do when an image cannot be downloaded or written.
    pub image_policy: ImagePolicy,

    /// If set, the page header starts with `Autocreated at <value>`.
    pub autocreated_at: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            code_language: "ruby".to_string(),
            image_policy: ImagePolicy::Skip,
            autocreated_at: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("failed to append to the output document: {0}")]
    Output(#[from] io::Error),
}

/// State threaded through one rendering pass.
pub struct RenderContext<'a> {
    base_dir: &'a Path,
    images: Option<&'a ImageMaterializer<'a>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RenderContext<'a> {
    /// A context that resolves image destinations against `base_dir` and does
    /// not download anything.
    pub fn new(base_dir: &'a Path) -> Self {
        Self {
            base_dir,
            images: None,
            diagnostics: Vec::new(),
        }
    }

    /// Download images through `images` while rendering.
    pub fn with_images(mut self, images: &'a ImageMaterializer<'a>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Record a recovered problem and log it.
    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        match &diagnostic.node {
            Some(node) => warn!("{} ({})", diagnostic.message, node),
            None => warn!("{}", diagnostic.message),
        }
        self.diagnostics.push(diagnostic);
    }
}

/// The block shapes the dispatcher knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `h3`..`h6`.
    Heading(u8),
    Paragraph,
    List,
    CodeBlock,
    Admonition(AdmonitionKind),
    Table,
}

/// Classify a top-level node. `None` means the node is skipped.
pub fn classify_block(node: &DocumentNode) -> Option<BlockKind> {
    match &node.role {
        NodeRole::Heading { level } if (3..=6).contains(level) => Some(BlockKind::Heading(*level)),
        NodeRole::Paragraph => Some(BlockKind::Paragraph),
        NodeRole::UnorderedList => Some(BlockKind::List),
        NodeRole::Container if is_code_container(node) => Some(BlockKind::CodeBlock),
        NodeRole::Container => AdmonitionKind::from_node(node).map(BlockKind::Admonition),
        NodeRole::Table => Some(BlockKind::Table),
        _ => None,
    }
}

/// Render one top-level node, or `None` if its role is not rendered.
pub fn render_block(
    node: &DocumentNode,
    ctx: &mut RenderContext<'_>,
    opts: &RenderOptions,
) -> Result<Option<String>, RenderError> {
    let Some(kind) = classify_block(node) else {
        trace!("skipping {}", node.describe());
        return Ok(None);
    };

    let fragment = match kind {
        BlockKind::Heading(level) => {
            let hashes = "#".repeat(usize::from(level) - 2);
            format!("{} {}\n\n", hashes, render_inline(node, ctx, opts)?)
        }
        BlockKind::Paragraph => format!("{}\n\n", render_inline(node, ctx, opts)?),
        BlockKind::List => render_list(node, ctx, opts)?,
        BlockKind::CodeBlock => render_code(node, opts),
        BlockKind::Admonition(kind) => render_admonition(node, kind, ctx, opts)?,
        BlockKind::Table => render_table(node, ctx),
    };
    Ok(Some(fragment))
}

fn render_list(
    node: &DocumentNode,
    ctx: &mut RenderContext<'_>,
    opts: &RenderOptions,
) -> Result<String, RenderError> {
    let mut out = String::new();
    for item in node.children_with_role(NodeRole::ListItem) {
        out.push_str("+ ");
        out.push_str(&render_inline(item, ctx, opts)?);
        out.push('\n');
    }
    out.push('\n');
    Ok(out)
}

/// Render the children of the content root, appending each fragment to the
/// target as soon as it is produced.
///
/// Returns the diagnostics recorded along the way.
pub fn render_content<W: DocumentWriter>(
    root: &DocumentNode,
    target: &mut OutputTarget<W>,
    images: Option<&ImageMaterializer<'_>>,
    opts: &RenderOptions,
) -> Result<Vec<Diagnostic>, RenderError> {
    let (base_dir, writer) = target.parts_mut();
    let mut ctx = RenderContext::new(base_dir);
    if let Some(images) = images {
        ctx = ctx.with_images(images);
    }

    for child in &root.children {
        if let Some(fragment) = render_block(child, &mut ctx, opts)? {
            writer.append(&fragment)?;
        }
    }
    Ok(ctx.into_diagnostics())
}

/// Render a whole page: the header, then the content region.
pub fn render_page<W: DocumentWriter>(
    page: &Page,
    target: &mut OutputTarget<W>,
    images: Option<&ImageMaterializer<'_>>,
    opts: &RenderOptions,
) -> Result<Vec<Diagnostic>, RenderError> {
    target.append(&render_header(page, opts))?;
    render_content(&page.content, target, images, opts)
}

/// Render a page to a string without downloading images.
pub fn render_page_to_string(page: &Page, opts: &RenderOptions) -> Result<String, RenderError> {
    let mut target = OutputTarget::new(".", String::new());
    render_page(page, &mut target, None, opts)?;
    Ok(target.into_writer())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::images::testing::{MemorySink, StaticFetcher, page_url};

    fn block(node: &DocumentNode) -> Option<String> {
        let mut ctx = RenderContext::new(Path::new("."));
        render_block(node, &mut ctx, &RenderOptions::default()).unwrap()
    }

    #[test]
    fn heading_levels_map_to_level_minus_two_hashes() {
        assert_eq!(block(&heading(3, "Overview")).as_deref(), Some("# Overview\n\n"));
        assert_eq!(block(&heading(4, "A")).as_deref(), Some("## A\n\n"));
        assert_eq!(block(&heading(5, "B")).as_deref(), Some("### B\n\n"));
        assert_eq!(block(&heading(6, "C")).as_deref(), Some("#### C\n\n"));
        assert_eq!(block(&heading(2, "skipped")), None);
        assert_eq!(block(&heading(1, "skipped")), None);
    }

    #[test]
    fn paragraph_with_link_renders_inline_text() {
        let para = p(vec![text("See "), link("the guide", "http://x/y"), text(".")]);
        assert_eq!(
            block(&para).as_deref(),
            Some("See [the guide](http://x/y).\n\n")
        );
    }

    #[test]
    fn list_emits_one_plus_line_per_item_in_order() {
        let list = el(
            NodeRole::UnorderedList,
            vec![
                text("\n"),
                el(NodeRole::ListItem, vec![text("A")]),
                text("\n"),
                el(NodeRole::ListItem, vec![text(" B "), code("b")]),
            ],
        );
        assert_eq!(block(&list).as_deref(), Some("+ A\n+ B `b`\n\n"));

        let empty = el(NodeRole::UnorderedList, vec![]);
        assert_eq!(block(&empty).as_deref(), Some("\n"));
    }

    #[test]
    fn containers_dispatch_on_class() {
        let note = div("note", vec![p(vec![text("careful")])]);
        assert_eq!(block(&note).as_deref(), Some("**Note:** careful\n\n"));

        let info = div("info", vec![p(vec![text("fyi")])]);
        assert_eq!(block(&info).as_deref(), Some("**Info:** fyi\n\n"));

        let warning = div("warning", vec![p(vec![text("danger")])]);
        assert_eq!(block(&warning).as_deref(), Some("**Warning:** danger\n\n"));

        let code_box = div("code_container", vec![text("  puts 1  ")]);
        assert_eq!(block(&code_box).as_deref(), Some("```ruby\nputs 1\n```\n\n"));

        let plain = div("wrapper", vec![p(vec![text("hidden")])]);
        assert_eq!(block(&plain), None);
    }

    #[test]
    fn unknown_roles_are_skipped_without_recursion() {
        let script = el(
            NodeRole::Element {
                tag: "script".to_string(),
            },
            vec![text("alert(1)")],
        );
        assert_eq!(block(&script), None);
        assert_eq!(block(&text("\n   ")), None);
        assert_eq!(block(&el(NodeRole::Container, vec![heading(3, "inner")])), None);
    }

    #[test]
    fn classify_block_covers_the_dispatch_table() {
        assert_eq!(classify_block(&heading(4, "x")), Some(BlockKind::Heading(4)));
        assert_eq!(
            classify_block(&div("note warning", vec![])),
            Some(BlockKind::Admonition(AdmonitionKind::Note))
        );
        assert_eq!(
            classify_block(&div("code_container note", vec![])),
            Some(BlockKind::CodeBlock)
        );
        assert_eq!(
            classify_block(&el(NodeRole::Table, vec![])),
            Some(BlockKind::Table)
        );
        assert_eq!(classify_block(&el(NodeRole::ListItem, vec![])), None);
    }

    fn sample_root() -> DocumentNode {
        el(
            NodeRole::Container,
            vec![
                heading(3, "Overview"),
                text("\n"),
                p(vec![text("Use "), code("render"), text(".")]),
                el(
                    NodeRole::Element {
                        tag: "style".to_string(),
                    },
                    vec![text("p {}")],
                ),
                div("note", vec![p(vec![text("careful")])]),
                el(
                    NodeRole::UnorderedList,
                    vec![
                        el(NodeRole::ListItem, vec![text("A")]),
                        el(NodeRole::ListItem, vec![text("B")]),
                    ],
                ),
            ],
        )
    }

    const SAMPLE_MD: &str = "# Overview\n\nUse `render`.\n\n**Note:** careful\n\n+ A\n+ B\n\n";

    #[test]
    fn render_content_appends_fragments_in_document_order() {
        let mut target = OutputTarget::new("out", String::new());
        let diags = render_content(&sample_root(), &mut target, None, &RenderOptions::default())
            .unwrap();
        assert!(diags.is_empty());
        assert_eq!(target.into_writer(), SAMPLE_MD);
    }

    #[test]
    fn rendering_twice_is_byte_identical() {
        let root = sample_root();
        let opts = RenderOptions::default();

        let mut first = OutputTarget::new("out", String::new());
        render_content(&root, &mut first, None, &opts).unwrap();
        let mut second = OutputTarget::new("out", String::new());
        render_content(&root, &mut second, None, &opts).unwrap();

        assert_eq!(first.into_writer(), second.into_writer());
    }

    #[test]
    fn image_failures_follow_the_policy() {
        let root = el(
            NodeRole::Container,
            vec![p(vec![
                text("Look: "),
                el(NodeRole::Image, vec![]).with_attr("src", "images/missing.png"),
            ])],
        );
        let fetcher = StaticFetcher::default();
        let sink = MemorySink::default();
        let images =
            ImageMaterializer::new(&fetcher, &sink, page_url("https://example.com/guide.html"));

        // skip: keep the reference, record a diagnostic.
        let mut target = OutputTarget::new("out", String::new());
        let diags =
            render_content(&root, &mut target, Some(&images), &RenderOptions::default()).unwrap();
        assert_eq!(target.into_writer(), "Look: ![](images/missing.png)\n\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some("images.fetch_failed"));
        assert_eq!(diags[0].phase, Some(DiagnosticPhase::Images));

        // abort: the error surfaces and nothing is appended for that block.
        let opts = RenderOptions {
            image_policy: ImagePolicy::Abort,
            ..RenderOptions::default()
        };
        let mut target = OutputTarget::new("out", String::new());
        let err = render_content(&root, &mut target, Some(&images), &opts).unwrap_err();
        assert!(matches!(err, RenderError::Image(ImageError::Fetch { .. })), "{err:?}");
        assert_eq!(target.into_writer(), "");
    }

    #[test]
    fn render_page_writes_header_before_content() {
        let page = Page {
            title: Some(heading(2, "Layouts")),
            feature: None,
            content: sample_root(),
        };
        let md = render_page_to_string(&page, &RenderOptions::default()).unwrap();
        assert_eq!(md, format!("# Layouts\n\n{SAMPLE_MD}"));
    }
}
