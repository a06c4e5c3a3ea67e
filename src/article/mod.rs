pub mod error;
pub mod store;
pub mod types;

pub use store::{ArticleQuery, ArticleSource, FixtureStore};
pub use types::*;
