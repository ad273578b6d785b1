use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::admin::AdminError;
use crate::application::feed::FeedError;
use crate::application::posts::PostError;
use crate::application::repos::RepoError;
use crate::application::subscriptions::SubscriptionError;
use crate::{domain::error::DomainError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response =
            crate::presentation::views::render_error_page(self.status, self.public_message);
        self.report.attach(&mut response);
        response
    }
}

fn repo_status(error: &RepoError) -> (StatusCode, &'static str) {
    match error {
        RepoError::Timeout => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
        ),
        RepoError::NotFound => (StatusCode::NOT_FOUND, "Page not found"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "application::error::feed_error_to_http_error";
        match error {
            FeedError::NotFound { entity } => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Page not found",
                format!("{entity} not found"),
            ),
            FeedError::Repo(err) => {
                let (status, message) = repo_status(&err);
                HttpError::from_error(SOURCE, status, message, &err)
            }
        }
    }
}

impl From<SubscriptionError> for HttpError {
    fn from(error: SubscriptionError) -> Self {
        const SOURCE: &str = "application::error::subscription_error_to_http_error";
        match error {
            SubscriptionError::Conflict => HttpError::new(
                SOURCE,
                StatusCode::CONFLICT,
                "You already follow this author",
                "duplicate follow rejected",
            ),
            SubscriptionError::InvalidOperation(message) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "You cannot follow yourself",
                message,
            ),
            SubscriptionError::NotFound { entity } => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Page not found",
                format!("{entity} not found"),
            ),
            SubscriptionError::Repo(err) => {
                let (status, message) = repo_status(&err);
                HttpError::from_error(SOURCE, status, message, &err)
            }
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "application::error::post_error_to_http_error";
        match error {
            PostError::NotFound { entity } => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Page not found",
                format!("{entity} not found"),
            ),
            PostError::Forbidden { action } => HttpError::new(
                SOURCE,
                StatusCode::FORBIDDEN,
                "You are not the author of this post",
                format!("{action} refused for non-author"),
            ),
            PostError::Validation(message) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request could not be processed",
                message,
            ),
            PostError::Repo(err) => {
                let (status, message) = repo_status(&err);
                HttpError::from_error(SOURCE, status, message, &err)
            }
        }
    }
}

/// Process-level failure reported by the binary before exiting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
