use super::inline::render_inline_run;
use super::{RenderContext, RenderError, RenderOptions};
use crate::ast::*;

/// The callout boxes a guide page can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmonitionKind {
    Note,
    Info,
    Warning,
}

impl AdmonitionKind {
    const ALL: [AdmonitionKind; 3] = [
        AdmonitionKind::Note,
        AdmonitionKind::Info,
        AdmonitionKind::Warning,
    ];

    /// The container class that marks this kind of box.
    pub fn class(self) -> &'static str {
        match self {
            AdmonitionKind::Note => "note",
            AdmonitionKind::Info => "info",
            AdmonitionKind::Warning => "warning",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AdmonitionKind::Note => "Note",
            AdmonitionKind::Info => "Info",
            AdmonitionKind::Warning => "Warning",
        }
    }

    /// First matching kind in `note`, `info`, `warning` order.
    pub fn from_node(node: &DocumentNode) -> Option<AdmonitionKind> {
        if node.role != NodeRole::Container {
            return None;
        }
        Self::ALL.into_iter().find(|k| node.has_class(k.class()))
    }
}

/// `**Label:** content`, where content is the box's paragraphs rendered as
/// one inline run.
pub fn render_admonition(
    node: &DocumentNode,
    kind: AdmonitionKind,
    ctx: &mut RenderContext<'_>,
    opts: &RenderOptions,
) -> Result<String, RenderError> {
    let paragraphs = node.outermost_with_role(&NodeRole::Paragraph);
    if paragraphs.is_empty() {
        ctx.report(
            Diagnostic::warning(
                DiagnosticPhase::Render,
                "render.admonition.missing_paragraph",
                format!("{} box has no paragraph", kind.label().to_lowercase()),
            )
            .with_node(node.describe()),
        );
    }

    let content = render_inline_run(paragraphs.into_iter().flat_map(|p| &p.children), ctx, opts)?;
    Ok(format!("**{}:** {}\n\n", kind.label(), content))
}
