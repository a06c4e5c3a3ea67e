use async_trait::async_trait;
use quick_xml::escape::escape;
use serde_json::Value;
use tracing::trace;

use crate::article::{Content, Node};
use crate::feed::error::RenderError;

/// Newest content schema the local renderer understands.
pub const MAX_SCHEMA_VERSION: u32 = 3;

/// Turns a structured content tree into HTML.
#[async_trait]
pub trait ContentRenderer: Send + Sync {
    async fn render(&self, content: &Content, flavor: &str) -> Result<String, RenderError>;
}

/// In-process renderer for the common node kinds.
#[derive(Debug, Clone, Default)]
pub struct NodeRenderer;

#[async_trait]
impl ContentRenderer for NodeRenderer {
    async fn render(&self, content: &Content, _flavor: &str) -> Result<String, RenderError> {
        if let Some(version) = content.schema_version {
            if version > MAX_SCHEMA_VERSION {
                return Err(RenderError::UnsupportedSchema(version));
            }
        }
        let mut html = String::new();
        render_nodes(&content.nodes, &mut html);
        Ok(html)
    }
}

fn render_nodes(nodes: &[Node], html: &mut String) {
    for node in nodes {
        render_node(node, html);
    }
}

fn render_node(node: &Node, html: &mut String) {
    match node.kind.as_str() {
        "text" => {
            if let Some(text) = &node.content {
                html.push_str(&escape(text.as_str()));
            }
        }
        "p" | "h2" | "h3" | "h4" | "b" | "i" | "strong" | "em" | "ul" | "ol" | "li"
        | "blockquote" => {
            html.push('<');
            html.push_str(&node.kind);
            html.push('>');
            render_nodes(&node.children, html);
            html.push_str("</");
            html.push_str(&node.kind);
            html.push('>');
        }
        "a" => {
            let href = node
                .attr_str("href")
                .or_else(|| node.attr_str("link"))
                .unwrap_or_default();
            html.push_str(&format!("<a href=\"{}\">", escape(href)));
            render_nodes(&node.children, html);
            html.push_str("</a>");
        }
        "image" => {
            if let Some(src) = image_src(node.attrs.get("image")).or_else(|| node.attr_str("src")) {
                html.push_str(&format!("<figure><img src=\"{}\"/></figure>", escape(src)));
            }
        }
        "author" => {
            if let Some(name) = node.attr_str("name").filter(|name| !name.is_empty()) {
                html.push_str(&format!("<p><strong>{}</strong></p>", escape(name)));
            }
        }
        other => trace!("dropping unsupported content node '{}'", other),
    }
}

fn image_src(image: Option<&Value>) -> Option<&str> {
    image?
        .get("files")?
        .get("original")?
        .get("filepath")?
        .as_str()
}
