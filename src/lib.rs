pub mod article;
pub mod config;
pub mod error;
pub mod feed;
pub mod http;
