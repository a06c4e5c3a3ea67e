use chrono::{DateTime, Utc};

use crate::article::Article;
use crate::config::FeedSettings;
use crate::feed::error::SkipReason;
use crate::feed::util::{add_domain, iri_to_uri};

/// One syndicated entry, built per request from an article.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub author_name: String,
    pub categories: Vec<String>,
    pub pubdate: Option<DateTime<Utc>>,
    pub updateddate: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub guid: Option<String>,
    pub slug: String,
}

/// Outcome of turning an article into a feed item.
#[derive(Debug)]
pub enum Population {
    Populated(FeedItem),
    Skipped(SkipReason),
}

pub fn item_title(article: &Article) -> String {
    article.title.clone()
}

pub fn item_description(article: &Article) -> Option<String> {
    article
        .excerpt
        .clone()
        .filter(|excerpt| !excerpt.is_empty())
        .or_else(|| article.share.description.clone())
}

pub fn item_author_name(article: &Article, default_name: &str) -> String {
    match &article.author {
        Some(author) if !author.is_default() => author.full_name(),
        _ => default_name.to_string(),
    }
}

/// Site-relative article URL with the optional `utm_source` marker.
pub fn item_link(article: &Article, utm_source: Option<&str>) -> String {
    match utm_source {
        Some(source) if !source.is_empty() => {
            format!("{}?utm_source={source}", article.absolute_url())
        }
        _ => article.absolute_url().to_string(),
    }
}

pub fn item_guid(article: &Article) -> Option<String> {
    article.id.map(|id| id.to_string())
}

pub fn item_categories(article: &Article) -> Vec<String> {
    article.topics().into_iter().map(str::to_string).collect()
}

/// Maps articles to feed items for one request.
pub struct ItemMapper<'a> {
    settings: &'a FeedSettings,
    secure: bool,
}

impl<'a> ItemMapper<'a> {
    pub fn new(settings: &'a FeedSettings, secure: bool) -> Self {
        Self { settings, secure }
    }

    /// Absolute link to an article, as written into the feed.
    pub fn link(&self, article: &Article) -> String {
        let link = item_link(article, self.settings.utm_source.as_deref());
        iri_to_uri(&add_domain(&self.settings.domain, &link, self.secure))
    }

    /// Every field except the rendered content.
    pub fn map(&self, article: &Article) -> FeedItem {
        FeedItem {
            title: item_title(article),
            link: self.link(article),
            description: item_description(article),
            author_name: item_author_name(article, &self.settings.default_author_name),
            categories: item_categories(article),
            pubdate: Some(article.date_published),
            updateddate: Some(article.date_modified),
            content: None,
            guid: item_guid(article),
            slug: article.slug.clone(),
        }
    }
}
