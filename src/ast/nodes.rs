use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed guide page: the pieces the renderer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// The page title node (e.g. `div#feature .wrapper h2`), if found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<DocumentNode>,

    /// The feature header block holding the introduction and the
    /// "after reading this guide" list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<DocumentNode>,

    /// Root of the main content region (e.g. `#mainCol`).
    pub content: DocumentNode,
}

impl Page {
    /// Trimmed text of the title node, if any.
    pub fn title_text(&self) -> Option<String> {
        self.title
            .as_ref()
            .map(|t| t.text_content().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// A node of the parsed source tree.
///
/// Nodes are never mutated after parsing. Children keep source order and a
/// [`NodeRole::Text`] leaf never has children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNode {
    #[serde(flatten)]
    pub role: NodeRole,

    /// Direct text of a leaf node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Attribute name -> value (href, src, class, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentNode>,
}

/// Structural role of a node.
///
/// This is a closed set: anything the converter does not know about ends up
/// as [`NodeRole::Element`] and is skipped by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum NodeRole {
    /// Plain text leaf.
    Text,
    /// `<h1>`..`<h6>`.
    Heading { level: u8 },
    Paragraph,
    UnorderedList,
    ListItem,
    /// `<code>` / `<tt>` inside running text.
    InlineCode,
    Hyperlink,
    Image,
    Table,
    /// `<thead>`.
    TableHead,
    /// `<tbody>` / `<tfoot>`.
    TableBody,
    TableRow,
    TableHeaderCell,
    TableCell,
    /// A `<div>`; what it means depends on its `class` attribute.
    Container,
    /// Any other element, kept with its tag name for inspection.
    Element { tag: String },
}

impl NodeRole {
    /// Classify an HTML tag name.
    pub fn from_tag(tag: &str) -> NodeRole {
        let tag = tag.to_ascii_lowercase();
        match tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => NodeRole::Heading {
                level: tag.as_bytes()[1] - b'0',
            },
            "p" => NodeRole::Paragraph,
            "ul" => NodeRole::UnorderedList,
            "li" => NodeRole::ListItem,
            "code" | "tt" => NodeRole::InlineCode,
            "a" => NodeRole::Hyperlink,
            "img" => NodeRole::Image,
            "table" => NodeRole::Table,
            "thead" => NodeRole::TableHead,
            "tbody" | "tfoot" => NodeRole::TableBody,
            "tr" => NodeRole::TableRow,
            "th" => NodeRole::TableHeaderCell,
            "td" => NodeRole::TableCell,
            "div" => NodeRole::Container,
            _ => NodeRole::Element { tag },
        }
    }
}

impl DocumentNode {
    /// A plain text leaf.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            role: NodeRole::Text,
            text: Some(value.into()),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// An element node with the given children.
    pub fn element(role: NodeRole, children: Vec<DocumentNode>) -> Self {
        Self {
            role,
            text: None,
            attributes: BTreeMap::new(),
            children,
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// True if the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// All descendant text concatenated in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(t) = &self.text {
            out.push_str(t);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Direct children with the given role.
    pub fn children_with_role(&self, role: NodeRole) -> impl Iterator<Item = &DocumentNode> + '_ {
        self.children.iter().filter(move |c| c.role == role)
    }

    /// Descendants with the given role, in document order, without looking
    /// inside a match (a `p` inside a matched `p` is not returned twice).
    pub fn outermost_with_role(&self, role: &NodeRole) -> Vec<&DocumentNode> {
        let mut out = Vec::new();
        self.collect_outermost(role, &mut out);
        out
    }

    fn collect_outermost<'a>(&'a self, role: &NodeRole, out: &mut Vec<&'a DocumentNode>) {
        for child in &self.children {
            if &child.role == role {
                out.push(child);
            } else {
                child.collect_outermost(role, out);
            }
        }
    }

    /// Short human-readable description used in diagnostics, e.g. `div.note`.
    pub fn describe(&self) -> String {
        let tag = match &self.role {
            NodeRole::Text => return "#text".to_string(),
            NodeRole::Heading { level } => format!("h{level}"),
            NodeRole::Paragraph => "p".to_string(),
            NodeRole::UnorderedList => "ul".to_string(),
            NodeRole::ListItem => "li".to_string(),
            NodeRole::InlineCode => "code".to_string(),
            NodeRole::Hyperlink => "a".to_string(),
            NodeRole::Image => "img".to_string(),
            NodeRole::Table => "table".to_string(),
            NodeRole::TableHead => "thead".to_string(),
            NodeRole::TableBody => "tbody".to_string(),
            NodeRole::TableRow => "tr".to_string(),
            NodeRole::TableHeaderCell => "th".to_string(),
            NodeRole::TableCell => "td".to_string(),
            NodeRole::Container => "div".to_string(),
            NodeRole::Element { tag } => tag.clone(),
        };
        match self.attr("class").map(str::split_whitespace) {
            Some(classes) => {
                let mut s = tag;
                for c in classes {
                    s.push('.');
                    s.push_str(c);
                }
                s
            }
            None => tag,
        }
    }
}
