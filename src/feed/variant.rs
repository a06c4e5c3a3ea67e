use chrono::{DateTime, Utc};
use std::io::Write;

use crate::feed::{
    error::XmlError,
    item::FeedItem,
    util::rfc2822_date,
    xml::{Attributes, XmlWriter},
};

pub const CONTENT_TYPE: &str = "application/xml";

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";
const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const YANDEX_NS: &str = "http://news.yandex.ru";
const TURBO_NS: &str = "http://turbo.yandex.ru";

/// Channel-level values shared by every variant.
#[derive(Debug, Clone)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub feed_url: String,
    pub language: Option<String>,
    pub categories: Vec<String>,
    pub copyright: Option<String>,
    pub ttl: Option<u32>,
    pub last_build_date: DateTime<Utc>,
    pub yandex_analytics_id: String,
    pub google_analytics_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, derive_more::Display)]
pub enum FeedVariant {
    /// Plain RSS 2.0 with atom, media and content extensions.
    #[display("generic")]
    Generic,
    /// Yandex Turbo pages feed.
    #[default]
    #[display("yandex-turbo")]
    YandexTurbo,
}

impl FeedVariant {
    /// Namespace of cached fragments and the rendering flavor.
    pub fn name(self) -> &'static str {
        match self {
            FeedVariant::Generic => "default",
            FeedVariant::YandexTurbo => "yandexturbo",
        }
    }

    pub fn content_type(self) -> &'static str {
        CONTENT_TYPE
    }

    /// Article flags that keep an article out of this feed.
    pub fn exclude_flags(self) -> &'static [&'static str] {
        match self {
            FeedVariant::Generic => &[],
            FeedVariant::YandexTurbo => &["hidden_from_turbo", "urania", "ugc"],
        }
    }

    /// Whether items carry rendered article bodies.
    pub fn renders_content(self) -> bool {
        matches!(self, FeedVariant::YandexTurbo)
    }

    pub fn rss_attributes(self) -> Vec<(&'static str, &'static str)> {
        match self {
            FeedVariant::Generic => vec![
                ("version", "2.0"),
                ("xmlns:atom", ATOM_NS),
                ("xmlns:media", MEDIA_NS),
            ],
            FeedVariant::YandexTurbo => vec![
                ("version", "2.0"),
                ("xmlns:yandex", YANDEX_NS),
                ("xmlns:turbo", TURBO_NS),
            ],
        }
    }

    pub fn channel_attributes(self) -> Vec<(&'static str, &'static str)> {
        match self {
            FeedVariant::Generic => vec![("xmlns:content", CONTENT_NS)],
            FeedVariant::YandexTurbo => Vec::new(),
        }
    }

    pub fn item_attributes(self) -> Vec<(&'static str, &'static str)> {
        match self {
            FeedVariant::Generic => Vec::new(),
            FeedVariant::YandexTurbo => vec![("turbo", "true")],
        }
    }

    pub fn write_root_elements<W: Write>(
        self,
        xml: &mut XmlWriter<W>,
        channel: &Channel,
    ) -> Result<(), XmlError> {
        xml.quick_element("title", Some(&channel.title), &[])?;
        xml.quick_element("link", Some(&channel.link), &[])?;
        xml.quick_element("description", Some(&channel.description), &[])?;

        match self {
            FeedVariant::Generic => {
                let self_link: &Attributes<'_> =
                    &[("rel", "self"), ("href", channel.feed_url.as_str())];
                xml.quick_element("atom:link", None, self_link)?;
                if let Some(language) = &channel.language {
                    xml.quick_element("language", Some(language), &[])?;
                }
                for category in &channel.categories {
                    xml.quick_element("category", Some(category), &[])?;
                }
                if let Some(copyright) = &channel.copyright {
                    xml.quick_element("copyright", Some(copyright), &[])?;
                }
                xml.quick_element(
                    "lastBuildDate",
                    Some(&rfc2822_date(&channel.last_build_date)),
                    &[],
                )?;
                if let Some(ttl) = channel.ttl {
                    xml.quick_element("ttl", Some(&ttl.to_string()), &[])?;
                }
            }
            FeedVariant::YandexTurbo => {
                xml.quick_element(
                    "yandex:analytics",
                    None,
                    &[("type", "Yandex"), ("id", channel.yandex_analytics_id.as_str())],
                )?;
                xml.quick_element(
                    "turbo:analytics",
                    None,
                    &[("type", "Google"), ("id", channel.google_analytics_id.as_str())],
                )?;
            }
        }
        Ok(())
    }

    pub fn write_item_elements<W: Write>(
        self,
        xml: &mut XmlWriter<W>,
        item: &FeedItem,
    ) -> Result<(), XmlError> {
        match self {
            FeedVariant::Generic => {
                xml.quick_element("title", Some(&item.title), &[])?;
                xml.quick_element("link", Some(&item.link), &[])?;
                if let Some(description) = &item.description {
                    xml.quick_element("description", Some(description), &[])?;
                }
                xml.quick_element(
                    "dc:creator",
                    Some(&item.author_name),
                    &[("xmlns:dc", DC_NS)],
                )?;
                if let Some(pubdate) = &item.pubdate {
                    xml.quick_element("pubDate", Some(&rfc2822_date(pubdate)), &[])?;
                }
                if let Some(guid) = &item.guid {
                    xml.quick_element("guid", Some(guid), &[("isPermaLink", "false")])?;
                }
                for category in &item.categories {
                    xml.quick_element("category", Some(category), &[])?;
                }
            }
            FeedVariant::YandexTurbo => {
                xml.quick_element("turbo:extendedHtml", Some("true"), &[])?;
                xml.quick_element("link", Some(&item.link), &[])?;
                xml.quick_element("author", Some(&item.author_name), &[])?;
                for category in &item.categories {
                    xml.quick_element("category", Some(category), &[])?;
                }
                if let Some(pubdate) = &item.pubdate {
                    xml.quick_element("pubDate", Some(&rfc2822_date(pubdate)), &[])?;
                }
                xml.cdata_element("turbo:content", item.content.as_deref())?;
            }
        }
        Ok(())
    }
}
