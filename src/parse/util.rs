use crate::ast::{DocumentNode, NodeRole};
use scraper::{ElementRef, Node};

/// Maximum element nesting depth kept as structure.
///
/// Anything deeper is flattened into a single text leaf. Documentation pages
/// never come close. Every level costs two levels of JSON nesting, and
/// `serde_json` refuses to read documents nested deeper than 128.
pub const MAX_DEPTH: usize = 48;

/// Convert a scraper element and its subtree into a [`DocumentNode`].
///
/// Returns the node and whether any subtree had to be flattened.
pub fn convert_element(el: ElementRef<'_>) -> (DocumentNode, bool) {
    let mut clamped = false;
    let node = convert_at_depth(el, 0, &mut clamped);
    (node, clamped)
}

fn convert_at_depth(el: ElementRef<'_>, depth: usize, clamped: &mut bool) -> DocumentNode {
    let value = el.value();
    let mut out = DocumentNode::element(NodeRole::from_tag(value.name()), Vec::new());
    for (name, v) in value.attrs() {
        out.attributes.insert(name.to_string(), v.to_string());
    }

    if depth >= MAX_DEPTH {
        *clamped = true;
        let text: String = el.text().collect();
        if !text.is_empty() {
            out.children.push(DocumentNode::text(text));
        }
        return out;
    }

    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.children.push(DocumentNode::text(&**text)),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    out.children.push(convert_at_depth(child_el, depth + 1, clamped));
                }
            }
            // comments, doctypes and processing instructions carry no content.
            _ => {}
        }
    }
    out
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
