use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::escape::{escape, resolve_html5_entity};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::article::Article;

pub const DELETED_BY_AUTHOR_TEXT: &str = "Комментарий удален пользователем";
pub const DELETED_BY_MODERATOR_TEXT: &str = "Комментарий удален модератором";
pub const BLOCKED_TEXT: &str = "Комментарий заблокирован";
pub const ANONYMOUS_AUTHOR: &str = "Читатель";

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);").expect("valid entity pattern")
});
static TAG_OR_AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<.*?>)|&").expect("valid tag pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    #[default]
    Published,
    DeletedByAuthor,
    DeletedByModerator,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentImage {
    pub preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub author: Option<CommentAuthor>,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub status: CommentStatus,
    #[serde(default)]
    pub ban: bool,
    #[serde(default)]
    pub image: Option<CommentImage>,
}

/// Best comments for an article, most relevant first.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn best_comments(&self, article: &Article, limit: usize) -> Vec<Comment>;
}

/// Source for deployments without a comments service.
#[derive(Debug, Clone, Default)]
pub struct NoComments;

#[async_trait]
impl CommentSource for NoComments {
    async fn best_comments(&self, _article: &Article, _limit: usize) -> Vec<Comment> {
        Vec::new()
    }
}

/// Text shown for a comment: a moderation placeholder or the plain text.
///
/// Status wins over the ban flag, the ban flag wins over the text.
pub fn comment_text(comment: &Comment) -> String {
    match comment.status {
        CommentStatus::DeletedByAuthor => DELETED_BY_AUTHOR_TEXT.to_string(),
        CommentStatus::DeletedByModerator => DELETED_BY_MODERATOR_TEXT.to_string(),
        _ if comment.ban => BLOCKED_TEXT.to_string(),
        _ => sanitize_text(&comment.text),
    }
}

/// Decodes entities, then drops tags and bare `&`.
pub fn sanitize_text(text: &str) -> String {
    let decoded = decode_entities(text);
    let stripped = TAG_OR_AMPERSAND.replace_all(&decoded, "");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// Lenient HTML entity decoding: unknown entities are kept as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity.strip_prefix('#') {
                Some(number) => {
                    let code = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => number.parse().ok(),
                    };
                    code.and_then(char::from_u32).map(String::from)
                }
                None => resolve_html5_entity(entity).map(str::to_string),
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub fn render_comment(comment: &Comment) -> String {
    let (author_name, author_image) = match &comment.author {
        Some(author) => (author.name.as_str(), author.image.as_deref().unwrap_or_default()),
        None => (ANONYMOUS_AUTHOR, ""),
    };
    let image = comment
        .image
        .as_ref()
        .map(|image| format!("<img src=\"{}\">", escape(image.preview.as_str())))
        .unwrap_or_default();

    format!(
        "<div data-block=\"comment\" data-author=\"{}\" data-avatar-url=\"{}\" data-subtitle=\"{}\">\
         <div data-block=\"content\"><p>{}</p>{}</div></div>",
        escape(author_name),
        escape(author_image),
        comment.date_added.format("%d.%m.%Y"),
        escape(comment_text(comment).as_str()),
        image,
    )
}

/// Comments block for an article, empty when there are no comments.
pub fn render_comments_block(article_link: &str, comments: &[Comment]) -> String {
    if comments.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = comments.iter().map(render_comment).collect();
    format!(
        "<div data-block=\"comments\" data-url=\"{}#comments\">{}</div>",
        escape(article_link),
        rendered.join("\n"),
    )
}
