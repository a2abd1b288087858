//! JSON envelope shared by every `/api/v1` response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::PageMeta;
use serde::Serialize;

/// Pagination block of a list response.
#[derive(Debug, Serialize)]
pub struct Meta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl From<PageMeta> for Meta {
    fn from(meta: PageMeta) -> Self {
        Self {
            page: meta.page,
            limit: meta.page_size,
            total: meta.total,
            total_pages: meta.total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta: None,
            error: None,
        }
    }

    pub fn page(message: impl Into<String>, data: T, meta: PageMeta) -> Self {
        Self {
            meta: Some(meta.into()),
            ..Self::data(message, data)
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            meta: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            meta: None,
            error: Some(code),
        }
    }
}

/// A success envelope with a status code.
pub struct Reply<T: Serialize>(pub StatusCode, pub Envelope<T>);

impl<T: Serialize> Reply<T> {
    pub fn ok(envelope: Envelope<T>) -> Self {
        Self(StatusCode::OK, envelope)
    }

    pub fn created(envelope: Envelope<T>) -> Self {
        Self(StatusCode::CREATED, envelope)
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}
