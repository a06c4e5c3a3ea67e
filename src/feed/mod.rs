pub mod cache;
pub mod comment;
pub mod content;
pub mod error;
pub mod item;
pub mod render;
pub mod serializer;
pub mod util;
pub mod variant;
pub mod writer;
pub mod xml;

pub use cache::{
    fragment_namespace, Fragment, FragmentCache, FragmentKey, MokaFragmentCache, NoopFragmentCache,
};
pub use content::ContentAssembler;
pub use error::{FeedError, RenderError, SkipReason, XmlError};
pub use item::{FeedItem, ItemMapper, Population};
pub use variant::{FeedVariant, CONTENT_TYPE};
pub use writer::{FeedBuilder, FeedRequest, RenderedFeed};
