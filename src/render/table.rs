use super::RenderContext;
use crate::ast::*;
use crate::parse::collapse_whitespace;

/// Separator written under the header row. It always has two columns, even
/// when the table does not.
pub const SEPARATOR_ROW: &str = "| ------------- | -------------- |";

/// Render a table as pipe-delimited rows. Cells are flattened to plain text.
pub fn render_table(node: &DocumentNode, ctx: &mut RenderContext<'_>) -> String {
    let head = node.outermost_with_role(&NodeRole::TableHead);
    let header: Vec<String> = match head.first() {
        Some(head) => head
            .outermost_with_role(&NodeRole::TableHeaderCell)
            .into_iter()
            .map(cell_text)
            .collect(),
        None => {
            ctx.report(
                Diagnostic::warning(
                    DiagnosticPhase::Render,
                    "render.table.missing_header",
                    "table has no header row",
                )
                .with_node(node.describe()),
            );
            Vec::new()
        }
    };

    let mut out = String::new();
    out.push_str(&format_row(&header));
    out.push('\n');
    out.push_str(SEPARATOR_ROW);
    out.push('\n');

    for row in body_rows(node) {
        let cells: Vec<String> = row
            .children
            .iter()
            .filter(|c| matches!(c.role, NodeRole::TableCell | NodeRole::TableHeaderCell))
            .map(cell_text)
            .collect();
        out.push_str(&format_row(&cells));
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Rows directly under the table or inside a body section, in source order.
fn body_rows(table: &DocumentNode) -> Vec<&DocumentNode> {
    let mut rows = Vec::new();
    for child in &table.children {
        match child.role {
            NodeRole::TableRow => rows.push(child),
            NodeRole::TableBody => rows.extend(child.children_with_role(NodeRole::TableRow)),
            _ => {}
        }
    }
    rows
}

fn cell_text(cell: &DocumentNode) -> String {
    collapse_whitespace(&cell.text_content())
}

fn format_row(cells: &[String]) -> String {
    if cells.is_empty() {
        return "| |".to_string();
    }
    format!("| {} |", cells.join(" | "))
}
