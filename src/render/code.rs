use super::RenderOptions;
use crate::ast::{DocumentNode, NodeRole};

pub const CODE_CONTAINER_CLASS: &str = "code_container";

pub fn is_code_container(node: &DocumentNode) -> bool {
    node.role == NodeRole::Container && node.has_class(CODE_CONTAINER_CLASS)
}

/// Fence the container's text content. Markup inside the example (syntax
/// highlighting spans, line numbers) is flattened away.
pub fn render_code(node: &DocumentNode, opts: &RenderOptions) -> String {
    format!(
        "```{}\n{}\n```\n\n",
        opts.code_language,
        node.text_content().trim()
    )
}
