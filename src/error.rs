use std::error::Error;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{feed::error::FeedError, http::warmup::WarmUpError};

#[derive(Debug, Error)]
pub enum RestError {
    #[error("Error encountered rendering the feed")]
    Feed(#[from] FeedError),

    #[error("Feed is not ready to be served")]
    WarmUp(#[from] WarmUpError),
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        error!("{}: {:?}", self, self.source());

        let status = match self {
            RestError::Feed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::WarmUp(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(json!({"message": self.to_string()}));

        (status, payload).into_response()
    }
}
