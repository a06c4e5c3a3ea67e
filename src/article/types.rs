use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::article::error::ArticleError;

/// Nickname carried by the shared editorial account.
pub const DEFAULT_AUTHOR_NICKNAME: &str = "editorial";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub first_name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl Author {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name,
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    pub fn is_default(&self) -> bool {
        self.nickname.as_deref() == Some(DEFAULT_AUTHOR_NICKNAME)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub filepath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaObject {
    pub files: HashMap<String, MediaFile>,
    #[serde(rename = "originalBasename")]
    pub original_basename: String,
}

/// The CMS sends either a media object or a bare (usually empty) string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoverImage {
    Media(MediaObject),
    Url(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cover {
    #[serde(default)]
    pub cover_image: Option<CoverImage>,
}

impl Cover {
    /// Path of the original-size cover file.
    pub fn original_filepath(&self) -> Result<&str, ArticleError> {
        match &self.cover_image {
            Some(CoverImage::Media(media)) => media
                .files
                .get("original")
                .map(|file| file.filepath.as_str())
                .ok_or(ArticleError::MissingCover),
            Some(CoverImage::Url(url)) if !url.is_empty() => Ok(url),
            _ => Err(ArticleError::MissingCover),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Share {
    pub description: Option<String>,
    pub og_image: Option<String>,
    pub zen_categories: Vec<String>,
    pub zen_image: Option<String>,
    pub zen_title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub id: Option<Uuid>,
    pub views: u64,
}

/// One node of the structured content tree.
///
/// Only the fields the renderer understands are typed; everything else a node
/// carries (images, links, feature configs) stays in `attrs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    pub kind: String,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub class: Vec<String>,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl Node {
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    pub ts: Option<i64>,
    pub schema_version: Option<u32>,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub config: HashMap<String, Value>,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub cover: Option<Cover>,
    pub date_modified: DateTime<Utc>,
    pub date_published: DateTime<Utc>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub flows: Vec<String>,
    #[serde(default)]
    pub id: Option<Uuid>,
    pub legacy_path: String,
    pub path: String,
    #[serde(default)]
    pub share: Share,
    pub slug: String,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub title: String,
}

impl Article {
    pub fn absolute_url(&self) -> &str {
        &self.legacy_path
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        matches!(self.config.get(flag), Some(Value::Bool(true)))
    }

    /// Flows first, then tags, without duplicates.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::with_capacity(self.flows.len() + self.tags.len());
        for topic in self.flows.iter().chain(self.tags.iter()) {
            if !topics.contains(&topic.as_str()) {
                topics.push(topic);
            }
        }
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(first: &str, last: Option<&str>, nickname: Option<&str>) -> Author {
        Author {
            first_name: first.to_string(),
            id: None,
            last_name: last.map(str::to_string),
            nickname: nickname.map(str::to_string),
        }
    }

    #[test]
    fn test_full_name_is_trimmed() {
        assert_eq!(author("Анна", Some(""), None).full_name(), "Анна");
        assert_eq!(author("Анна", None, None).full_name(), "Анна");
        assert_eq!(
            author("Анна", Some("Кондрашова"), None).full_name(),
            "Анна Кондрашова"
        );
    }

    #[test]
    fn test_default_author_detection() {
        assert!(author("Редакция", None, Some("editorial")).is_default());
        assert!(!author("Редакция", None, Some("editoral")).is_default());
        assert!(!author("Редакция", None, None).is_default());
    }

    #[test]
    fn test_cover_variants() {
        let empty: Cover = serde_json::from_str(r#"{"cover_image": ""}"#).unwrap();
        assert!(empty.original_filepath().is_err());

        let missing: Cover = serde_json::from_str(r#"{}"#).unwrap();
        assert!(missing.original_filepath().is_err());

        let media: Cover = serde_json::from_str(
            r#"{"cover_image": {"originalBasename": "c.png",
                "files": {"original": {"filepath": "https://cdn.example/c.png"}}}}"#,
        )
        .unwrap();
        assert_eq!(
            media.original_filepath().unwrap(),
            "https://cdn.example/c.png"
        );
    }

    #[test]
    fn test_node_keeps_unknown_fields() {
        let node: Node = serde_json::from_str(
            r#"{"kind": "feature", "name": "poll", "inline": false}"#,
        )
        .unwrap();
        assert_eq!(node.kind, "feature");
        assert_eq!(node.attr_str("name"), Some("poll"));
        assert!(node.children.is_empty());
    }
}
