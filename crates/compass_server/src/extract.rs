//! Request extractors with API-shaped rejections.

use crate::error::JsonBodyError;
use axum::extract::FromRequest;

/// `axum::Json` whose rejections render as `{"error": message}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(JsonBodyError))]
pub struct ApiJson<T>(pub T);
