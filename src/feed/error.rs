use std::string::FromUtf8Error;

use thiserror::Error;

use crate::article::error::ArticleError;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("I/O error writing XML")]
    Io(#[from] std::io::Error),

    #[error("Error encoding or reading XML")]
    Encode(#[from] quick_xml::Error),

    #[error("Control characters are not supported in XML 1.0")]
    ControlCharacters,

    #[error("Closing </{found}> while <{expected}> is open")]
    Unbalanced { expected: String, found: String },

    #[error("Not a single well-formed <item>: {0}")]
    MalformedFragment(&'static str),

    #[error("Rendered XML is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Rendered content is empty")]
    Empty,

    #[error("Unsupported content schema version {0}")]
    UnsupportedSchema(u32),

    #[error("Rendering service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("article has no content")]
    NoContent(#[source] RenderError),
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Error loading articles")]
    Articles(#[from] ArticleError),

    #[error("Article '{slug}' was skipped")]
    Skipped {
        slug: String,
        #[source]
        reason: SkipReason,
    },

    #[error("Error serializing article '{slug}'")]
    Serialization {
        slug: String,
        #[source]
        source: XmlError,
    },

    #[error("Error writing feed document")]
    Document(#[from] XmlError),
}
