use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::article::{Article, ArticleQuery, ArticleSource};
use crate::config::{FeedSettings, ItemFailurePolicy};
use crate::feed::{
    cache::{fragment_namespace, Fragment, FragmentCache, FragmentKey},
    content::{recommend, ContentAssembler},
    error::{FeedError, SkipReason, XmlError},
    item::{ItemMapper, Population},
    serializer::render_fragment,
    util::{add_domain, iri_to_uri},
    variant::{Channel, FeedVariant},
    xml::XmlWriter,
};

#[derive(Debug, Clone)]
pub struct FeedRequest {
    /// Path the feed was requested on, used as the self link fallback.
    pub path: String,
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct RenderedFeed {
    pub body: Bytes,
    pub content_type: &'static str,
    pub last_modified: DateTime<Utc>,
    pub items: usize,
}

pub struct FeedBuilder {
    settings: Arc<FeedSettings>,
    source: Arc<dyn ArticleSource>,
    assembler: ContentAssembler,
    cache: Arc<dyn FragmentCache>,
}

impl FeedBuilder {
    pub fn new(
        settings: Arc<FeedSettings>,
        source: Arc<dyn ArticleSource>,
        assembler: ContentAssembler,
        cache: Arc<dyn FragmentCache>,
    ) -> Self {
        Self {
            settings,
            source,
            assembler,
            cache,
        }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Renders the whole document before returning, so a failed item never
    /// leaves a truncated feed on the wire.
    pub async fn build(&self, request: &FeedRequest) -> Result<RenderedFeed, FeedError> {
        let variant = self.settings.variant;
        let query = ArticleQuery {
            limit: self.settings.limit,
            offset: self.settings.offset,
            exclude_flags: variant
                .exclude_flags()
                .iter()
                .map(|flag| flag.to_string())
                .collect(),
        };
        let articles = self.source.articles(&query).await?;
        debug!("rendering {} feed with {} articles", variant, articles.len());

        let mapper = ItemMapper::new(&self.settings, request.secure);
        let namespace = fragment_namespace(variant, request.secure);
        // Items render concurrently; results keep article order.
        let fragments = try_join_all(
            articles
                .iter()
                .map(|article| self.fragment(&mapper, &namespace, article, &articles)),
        )
        .await?;
        let included = articles
            .iter()
            .zip(&fragments)
            .filter(|(_, fragment)| fragment.is_some())
            .map(|(article, _)| article);
        let last_build_date = latest_date(included);
        let fragments: Vec<Fragment> = fragments.into_iter().flatten().collect();

        let channel = self.channel(request, last_build_date);
        let body = write_document(variant, &channel, &fragments)?;

        info!(
            "rendered {} feed: {} of {} items, {} bytes",
            variant,
            fragments.len(),
            articles.len(),
            body.len()
        );

        Ok(RenderedFeed {
            body: Bytes::from(body),
            content_type: variant.content_type(),
            last_modified: channel.last_build_date,
            items: fragments.len(),
        })
    }

    async fn fragment(
        &self,
        mapper: &ItemMapper<'_>,
        namespace: &str,
        article: &Article,
        siblings: &[Article],
    ) -> Result<Option<Fragment>, FeedError> {
        let variant = self.settings.variant;
        let key = FragmentKey::new(namespace.to_string(), article.slug.clone());

        if self.settings.use_cached_fragments {
            if let Some(fragment) = self.cache.get(&key).await {
                return Ok(Some(fragment));
            }
        }

        let item = match self.populate(mapper, article, siblings).await {
            Population::Populated(item) => item,
            Population::Skipped(reason) => {
                return self.apply_policy(FeedError::Skipped {
                    slug: article.slug.clone(),
                    reason,
                })
            }
        };

        match render_fragment(variant, &item) {
            Ok(fragment) => {
                self.cache.put(key, fragment.clone()).await;
                Ok(Some(fragment))
            }
            Err(source) => self.apply_policy(FeedError::Serialization {
                slug: article.slug.clone(),
                source,
            }),
        }
    }

    async fn populate(
        &self,
        mapper: &ItemMapper<'_>,
        article: &Article,
        siblings: &[Article],
    ) -> Population {
        let variant = self.settings.variant;
        let mut item = mapper.map(article);
        if !variant.renders_content() {
            return Population::Populated(item);
        }

        let recommended: Vec<(String, String)> =
            recommend(article, siblings, self.settings.recommendations_limit)
                .into_iter()
                .map(|other| (other.title.clone(), mapper.link(other)))
                .collect();

        match self
            .assembler
            .assemble(article, &item.link, &recommended, variant.name())
            .await
        {
            Ok(content) => {
                item.content = Some(content);
                Population::Populated(item)
            }
            Err(e) => Population::Skipped(SkipReason::NoContent(e)),
        }
    }

    fn apply_policy(&self, error: FeedError) -> Result<Option<Fragment>, FeedError> {
        match self.settings.item_failure_policy {
            ItemFailurePolicy::Skip => {
                warn!("{}: {:?}", error, error.source());
                Ok(None)
            }
            ItemFailurePolicy::Abort => Err(error),
        }
    }

    fn channel(&self, request: &FeedRequest, last_build_date: DateTime<Utc>) -> Channel {
        let settings = &self.settings;
        let feed_url = settings
            .feed_url
            .clone()
            .unwrap_or_else(|| request.path.clone());

        Channel {
            title: settings.title.clone(),
            link: iri_to_uri(&add_domain(&settings.domain, &settings.link, request.secure)),
            description: settings.description.clone(),
            feed_url: iri_to_uri(&add_domain(&settings.domain, &feed_url, request.secure)),
            language: settings.language.clone(),
            categories: settings.categories.clone(),
            copyright: settings.copyright.clone(),
            ttl: settings.ttl,
            last_build_date,
            yandex_analytics_id: settings.yandex_analytics_id.clone(),
            google_analytics_id: settings.google_analytics_id.clone(),
        }
    }
}

/// Most recent modification among the articles, or now for an empty feed.
pub fn latest_date<'a>(articles: impl IntoIterator<Item = &'a Article>) -> DateTime<Utc> {
    articles
        .into_iter()
        .map(|article| article.date_modified.max(article.date_published))
        .max()
        .unwrap_or_else(Utc::now)
}

/// Declaration, `<rss>`, `<channel>` and root elements, then the item
/// fragments in order. Open elements are closed in reverse.
pub fn write_document(
    variant: FeedVariant,
    channel: &Channel,
    fragments: &[Fragment],
) -> Result<Vec<u8>, XmlError> {
    let mut xml = XmlWriter::new(Vec::new());
    xml.declaration()?;
    xml.start("rss", &variant.rss_attributes())?;
    xml.start("channel", &variant.channel_attributes())?;
    variant.write_root_elements(&mut xml, channel)?;
    for fragment in fragments {
        xml.raw(fragment.as_bytes())?;
    }
    xml.close_all()?;
    Ok(xml.into_inner())
}
