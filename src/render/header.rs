use super::RenderOptions;
use crate::ast::*;
use crate::parse::collapse_whitespace;

/// Render the page header: the optional stamp, the title, the feature block's
/// introduction and its "after reading this guide" list.
///
/// Parts that the page does not have are left out.
pub fn render_header(page: &Page, opts: &RenderOptions) -> String {
    let mut out = String::new();

    if let Some(stamp) = &opts.autocreated_at {
        out.push_str(&format!("Autocreated at {stamp}\n\n"));
    }

    if let Some(title) = page.title_text() {
        out.push_str(&format!("# {}\n\n", collapse_whitespace(&title)));
    }

    let Some(feature) = &page.feature else {
        return out;
    };

    let paragraphs = feature.outermost_with_role(&NodeRole::Paragraph);
    for (i, para) in paragraphs.iter().take(2).enumerate() {
        out.push_str(&collapse_whitespace(&para.text_content()));
        out.push_str(if i == 0 { "\n" } else { "\n\n" });
    }

    let lists = feature.outermost_with_role(&NodeRole::UnorderedList);
    if let Some(list) = lists.first() {
        for item in list.outermost_with_role(&NodeRole::ListItem) {
            out.push_str("+ ");
            out.push_str(&collapse_whitespace(&item.text_content()));
            out.push('\n');
        }
        out.push_str("\n\n");
    }

    out
}
