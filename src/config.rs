use smart_default::SmartDefault;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::feed::variant::FeedVariant;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

/// What happens to an item that cannot be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemFailurePolicy {
    /// Drop the item and keep writing the feed.
    #[default]
    Skip,
    /// Fail the whole request.
    Abort,
}

impl FromStr for ItemFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(other.to_string()),
        }
    }
}

/// Channel metadata and rendering knobs for one feed.
#[derive(Debug, Clone, SmartDefault)]
pub struct FeedSettings {
    pub variant: FeedVariant,

    #[default = "Т-Ж"]
    pub title: String,

    #[default = "/"]
    pub link: String,

    #[default = "Статьи о деньгах, финансах и жизни"]
    pub description: String,

    /// Host used to qualify relative links. Links stay relative when empty.
    #[default = "test.ru"]
    pub domain: String,

    #[default(Some("ru-RU".to_string()))]
    pub language: Option<String>,

    /// Self link of the feed; the request path is used when unset.
    pub feed_url: Option<String>,

    #[default(_code = "vec![\"Финансы\".to_string()]")]
    pub categories: Vec<String>,

    pub copyright: Option<String>,

    pub ttl: Option<u32>,

    /// Author shown for articles without one and for the editorial account.
    #[default = "Редакция"]
    pub default_author_name: String,

    #[default(Some("rss".to_string()))]
    pub utm_source: Option<String>,

    #[default = 30]
    pub limit: usize,

    pub offset: usize,

    pub yandex_analytics_id: String,

    pub google_analytics_id: String,

    #[default = 5]
    pub comments_limit: usize,

    #[default = 3]
    pub recommendations_limit: usize,

    pub item_failure_policy: ItemFailurePolicy,

    /// Serve previously rendered fragments from the cache when present.
    pub use_cached_fragments: bool,

    /// Qualify links with https even when the request did not arrive over TLS.
    #[default = true]
    pub secure_links: bool,
}

impl FeedSettings {
    pub fn for_variant(variant: FeedVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Overrides defaults with `FEED_*` environment variables. A `.env` file
    /// is loaded by the binary before this runs.
    pub fn from_env(variant: FeedVariant) -> Result<Self, ConfigError> {
        let mut settings = Self::for_variant(variant);

        if let Some(title) = env_string("FEED_TITLE") {
            settings.title = title;
        }
        if let Some(link) = env_string("FEED_LINK") {
            settings.link = link;
        }
        if let Some(description) = env_string("FEED_DESCRIPTION") {
            settings.description = description;
        }
        if let Some(domain) = env_string("FEED_DOMAIN") {
            settings.domain = domain;
        }
        if let Some(language) = env_string("FEED_LANGUAGE") {
            settings.language = non_empty(language);
        }
        if let Some(feed_url) = env_string("FEED_URL") {
            settings.feed_url = non_empty(feed_url);
        }
        if let Some(categories) = env_string("FEED_CATEGORIES") {
            settings.categories = categories
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(copyright) = env_string("FEED_COPYRIGHT") {
            settings.copyright = non_empty(copyright);
        }
        if let Some(ttl) = env_parse("FEED_TTL")? {
            settings.ttl = Some(ttl);
        }
        if let Some(author) = env_string("FEED_DEFAULT_AUTHOR") {
            settings.default_author_name = author;
        }
        if let Some(utm_source) = env_string("FEED_UTM_SOURCE") {
            settings.utm_source = non_empty(utm_source);
        }
        if let Some(limit) = env_parse("FEED_LIMIT")? {
            settings.limit = limit;
        }
        if let Some(offset) = env_parse("FEED_OFFSET")? {
            settings.offset = offset;
        }
        if let Some(id) = env_string("FEED_YANDEX_ANALYTICS_ID") {
            settings.yandex_analytics_id = id;
        }
        if let Some(id) = env_string("FEED_GOOGLE_ANALYTICS_ID") {
            settings.google_analytics_id = id;
        }
        if let Some(limit) = env_parse("FEED_COMMENTS_LIMIT")? {
            settings.comments_limit = limit;
        }
        if let Some(limit) = env_parse("FEED_RECOMMENDATIONS_LIMIT")? {
            settings.recommendations_limit = limit;
        }
        if let Some(policy) = env_parse("FEED_ITEM_FAILURE_POLICY")? {
            settings.item_failure_policy = policy;
        }
        if let Some(secure) = env_parse("FEED_SECURE_LINKS")? {
            settings.secure_links = secure;
        }

        debug!("feed settings: {:?}", settings);
        Ok(settings)
    }

    pub fn name(&self) -> &'static str {
        self.variant.name()
    }
}

fn env_string(key: &'static str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parse<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    env_string(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value })
        })
        .transpose()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = FeedSettings::for_variant(FeedVariant::YandexTurbo);
        assert_eq!(settings.name(), "yandexturbo");
        assert_eq!(settings.default_author_name, "Редакция");
        assert_eq!(settings.utm_source.as_deref(), Some("rss"));
        assert_eq!(settings.limit, 30);
        assert_eq!(settings.item_failure_policy, ItemFailurePolicy::Skip);
        assert!(settings.secure_links);
        assert!(!settings.use_cached_fragments);
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!("skip".parse::<ItemFailurePolicy>(), Ok(ItemFailurePolicy::Skip));
        assert_eq!(" Abort ".parse::<ItemFailurePolicy>(), Ok(ItemFailurePolicy::Abort));
        assert!("drop".parse::<ItemFailurePolicy>().is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("FEED_TITLE", "Т-Ж Дача");
        std::env::set_var("FEED_LIMIT", "5");
        std::env::set_var("FEED_CATEGORIES", "Жилье, ,Дача");
        let settings = FeedSettings::from_env(FeedVariant::Generic).unwrap();
        assert_eq!(settings.title, "Т-Ж Дача");
        assert_eq!(settings.limit, 5);
        assert_eq!(settings.categories, vec!["Жилье".to_string(), "Дача".to_string()]);

        std::env::set_var("FEED_LIMIT", "many");
        let err = FeedSettings::from_env(FeedVariant::Generic).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FEED_LIMIT", .. }));

        for key in ["FEED_TITLE", "FEED_LIMIT", "FEED_CATEGORIES"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty("rss".to_string()), Some("rss".to_string()));
    }
}
