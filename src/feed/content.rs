use quick_xml::escape::escape;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::article::{error::ArticleError, Article, Node};
use crate::feed::comment::{render_comments_block, CommentSource};
use crate::feed::error::RenderError;
use crate::feed::render::ContentRenderer;

const TURBO_LINK_SEGMENT: &str = "yandex.ru/turbo/";
const PRUNED_KINDS: [&str; 3] = ["bannerlink-level", "quiz-banner", "subscription-level"];
const PRUNED_CLASS: &str = "desktop-table";
const RECOMMENDATIONS_TITLE: &str = "Читайте также";

static INLINE_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<(.*?) style=".*?"(.*?)>"#).expect("valid style pattern"));

pub type Transform = fn(&str) -> String;

/// Applied in order to rendered article bodies. Links are rewritten before
/// attributes are stripped.
pub const PIPELINE: [Transform; 3] = [fix_links_for_turbo, fix_marks_for_turbo, remove_inline_styles];

pub fn post_process(content: &str) -> String {
    PIPELINE
        .iter()
        .fold(content.to_string(), |content, transform| transform(&content))
}

pub fn fix_links_for_turbo(content: &str) -> String {
    content.replace(TURBO_LINK_SEGMENT, "")
}

pub fn fix_marks_for_turbo(content: &str) -> String {
    content.to_string()
}

pub fn remove_inline_styles(content: &str) -> String {
    INLINE_STYLE.replace_all(content, "<$1$2>").into_owned()
}

/// Removes promotional and desktop-only nodes, recursively.
pub fn prune_nodes(nodes: &mut Vec<Node>) {
    nodes.retain(|node| {
        !PRUNED_KINDS.contains(&node.kind.as_str())
            && !node.class.iter().any(|class| class == PRUNED_CLASS)
    });
    for node in nodes.iter_mut() {
        prune_nodes(&mut node.children);
    }
}

fn cover_src(article: &Article) -> Result<&str, ArticleError> {
    article
        .cover
        .as_ref()
        .ok_or(ArticleError::MissingCover)?
        .original_filepath()
}

/// Title and, when the article has one, the cover image.
pub fn render_header(article: &Article) -> String {
    let mut header = format!("<header><h1>{}</h1>", escape(article.title.as_str()));
    match cover_src(article) {
        Ok(src) => header.push_str(&format!("<figure><img src=\"{}\"/></figure>", escape(src))),
        Err(e) => debug!("rendering header of '{}' without cover: {}", article.slug, e),
    }
    header.push_str("</header>");
    header
}

/// Other articles of the same feed that share a flow or tag.
pub fn recommend<'a>(article: &Article, siblings: &'a [Article], limit: usize) -> Vec<&'a Article> {
    let topics = article.topics();
    if topics.is_empty() || limit == 0 {
        return Vec::new();
    }
    siblings
        .iter()
        .filter(|other| other.slug != article.slug)
        .filter(|other| other.topics().iter().any(|topic| topics.contains(topic)))
        .take(limit)
        .collect()
}

/// `(title, href)` pairs rendered as a Turbo feed block.
pub fn render_recommendations(links: &[(String, String)]) -> String {
    if links.is_empty() {
        return String::new();
    }
    let items: String = links
        .iter()
        .map(|(title, href)| {
            format!(
                "<div data-block=\"feed-item\" data-title=\"{}\" data-href=\"{}\"></div>",
                escape(title.as_str()),
                escape(href.as_str())
            )
        })
        .collect();
    format!(
        "<div data-block=\"feed\" data-layout=\"vertical\" data-title=\"{RECOMMENDATIONS_TITLE}\">{items}</div>"
    )
}

/// Builds the full body of a Turbo item.
pub struct ContentAssembler {
    renderer: Arc<dyn ContentRenderer>,
    comments: Arc<dyn CommentSource>,
    comments_limit: usize,
}

impl ContentAssembler {
    pub fn new(
        renderer: Arc<dyn ContentRenderer>,
        comments: Arc<dyn CommentSource>,
        comments_limit: usize,
    ) -> Self {
        Self {
            renderer,
            comments,
            comments_limit,
        }
    }

    /// Header followed by body, recommendations and comments. The last three
    /// are rendered concurrently.
    pub async fn assemble(
        &self,
        article: &Article,
        link: &str,
        recommended: &[(String, String)],
        flavor: &str,
    ) -> Result<String, RenderError> {
        let header = render_header(article);
        let (content, recommendations, comments) = futures::join!(
            self.render_content(article, flavor),
            async { render_recommendations(recommended) },
            self.render_comments(article, link),
        );
        Ok(format!("{header}{}{recommendations}{comments}", content?))
    }

    pub async fn render_content(&self, article: &Article, flavor: &str) -> Result<String, RenderError> {
        let mut content = article.content.clone();
        prune_nodes(&mut content.nodes);

        let rendered = self.renderer.render(&content, flavor).await?;
        if rendered.trim().is_empty() {
            return Err(RenderError::Empty);
        }
        Ok(post_process(&rendered))
    }

    async fn render_comments(&self, article: &Article, link: &str) -> String {
        let comments = self
            .comments
            .best_comments(article, self.comments_limit)
            .await;
        render_comments_block(link, &comments)
    }
}
