use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::article::{error::ArticleError, types::Article};

const BUNDLED_FIXTURES: &str = include_str!("../../fixtures/articles.json");

#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub limit: usize,
    pub offset: usize,
    /// Articles whose `config` sets any of these flags to `true` are left out.
    pub exclude_flags: Vec<String>,
}

/// Ordered supply of articles for a feed.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, ArticleError>;
}

/// Read-only in-memory article list, shared between requests.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    articles: Arc<Vec<Article>>,
}

impl FixtureStore {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles: Arc::new(articles),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ArticleError> {
        let articles: Vec<Article> = serde_json::from_str(content)?;
        debug!("loaded {} fixture articles", articles.len());
        Ok(Self::new(articles))
    }

    /// Fixtures shipped with the crate.
    pub fn bundled() -> Result<Self, ArticleError> {
        Self::from_json(BUNDLED_FIXTURES)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

#[async_trait]
impl ArticleSource for FixtureStore {
    async fn articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, ArticleError> {
        let articles = self
            .articles
            .iter()
            .filter(|article| {
                !query
                    .exclude_flags
                    .iter()
                    .any(|flag| article.has_flag(flag))
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: usize, offset: usize) -> ArticleQuery {
        ArticleQuery {
            limit,
            offset,
            exclude_flags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_bundled_fixtures_keep_order() {
        let store = FixtureStore::bundled().unwrap();
        assert_eq!(store.len(), 2);

        let articles = store.articles(&query(30, 0)).await.unwrap();
        let ids: Vec<String> = articles
            .iter()
            .map(|a| a.id.unwrap().to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "8e3c73e1-095e-4da9-b05d-a6904ee82ceb",
                "f78112bd-eac6-4ee8-96ad-bac8d3d1f110"
            ]
        );
    }

    #[tokio::test]
    async fn test_limit_and_offset() {
        let store = FixtureStore::bundled().unwrap();

        let first = store.articles(&query(1, 0)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].slug, "testovaia-statia-zaglushka-dlia-novogo-potoka-srav");

        let second = store.articles(&query(10, 1)).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].slug, "dacha-here-seller-abroad");

        assert!(store.articles(&query(10, 5)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exclude_flags() {
        let mut articles: Vec<Article> =
            serde_json::from_str(BUNDLED_FIXTURES).unwrap();
        articles[0]
            .config
            .insert("hidden_from_turbo".to_string(), serde_json::Value::Bool(true));
        let store = FixtureStore::new(articles);

        let query = ArticleQuery {
            limit: 30,
            offset: 0,
            exclude_flags: vec!["hidden_from_turbo".to_string(), "ugc".to_string()],
        };
        let result = store.articles(&query).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].slug, "dacha-here-seller-abroad");
    }

    #[test]
    fn test_missing_title_is_rejected() {
        let result = FixtureStore::from_json(
            r#"[{"date_modified": "2022-10-04T15:20:53Z",
                 "date_published": "2022-10-04T15:17:43Z",
                 "legacy_path": "/a/", "path": "/a/", "slug": "a"}]"#,
        );
        assert!(matches!(result, Err(ArticleError::Fixture(_))));
    }
}
