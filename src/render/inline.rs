use super::code::{is_code_container, render_code};
use super::{RenderContext, RenderError, RenderOptions};
use crate::ast::*;
use crate::images::{ImageError, ImagePolicy, markdown_image};

/// Render the immediate children of `node` as one flat run of Markdown.
///
/// Only plain text, inline code and links are rendered at this level. Nested
/// paragraphs, code containers and images are the only roles that recurse;
/// every other child is dropped. The result is trimmed.
pub fn render_inline(
    node: &DocumentNode,
    ctx: &mut RenderContext<'_>,
    opts: &RenderOptions,
) -> Result<String, RenderError> {
    render_inline_run(&node.children, ctx, opts)
}

pub(crate) fn render_inline_run<'n>(
    children: impl IntoIterator<Item = &'n DocumentNode>,
    ctx: &mut RenderContext<'_>,
    opts: &RenderOptions,
) -> Result<String, RenderError> {
    let mut out = String::new();
    for child in children {
        match &child.role {
            NodeRole::Text => out.push_str(child.text.as_deref().unwrap_or_default()),
            NodeRole::InlineCode => {
                out.push('`');
                out.push_str(&child.text_content());
                out.push('`');
            }
            NodeRole::Hyperlink => {
                out.push('[');
                out.push_str(child.text_content().trim());
                out.push_str("](");
                out.push_str(child.attr("href").unwrap_or_default());
                out.push(')');
            }
            NodeRole::Paragraph => {
                out.push_str(&render_inline(child, ctx, opts)?);
                out.push_str("\n\n");
            }
            NodeRole::Container if is_code_container(child) => {
                out.push_str(&render_code(child, opts));
                out.push_str("\n\n");
            }
            NodeRole::Image => out.push_str(&render_image(child, ctx, opts)?),
            _ => {}
        }
    }
    Ok(out.trim().to_string())
}

fn render_image(
    node: &DocumentNode,
    ctx: &mut RenderContext<'_>,
    opts: &RenderOptions,
) -> Result<String, RenderError> {
    let Some(images) = ctx.images else {
        return Ok(node.attr("src").map(markdown_image).unwrap_or_default());
    };

    match images.materialize(node, ctx.base_dir) {
        Ok(md) => Ok(md),
        Err(e) if opts.image_policy == ImagePolicy::Abort => Err(e.into()),
        Err(e) => {
            ctx.report(
                Diagnostic::warning(DiagnosticPhase::Images, e.code(), format!("skipping image: {e}"))
                    .with_node(node.describe()),
            );
            Ok(match (&e, node.attr("src")) {
                (ImageError::MissingSource, _) | (_, None) => String::new(),
                (_, Some(src)) => markdown_image(src),
            })
        }
    }
}
