use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use crate::conversion::{Conversion, TypeTag};

/// Canonical JSON payload for error responses.
#[derive(Debug, Serialize, Clone)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body returned for a finished conversion.
#[derive(Debug, Serialize, Clone)]
pub struct ConversionResponse {
    pub message: String,
    /// Absolute filesystem path of the PDF.
    pub path: String,
    /// Where the PDF can be downloaded from this server.
    pub url: String,
    pub file_name: String,
    pub kind: TypeTag,
    pub request_id: Uuid,
}

impl ConversionResponse {
    pub fn new(conversion: Conversion, url_prefix: &str) -> Self {
        Self {
            message: conversion.message(),
            path: conversion.output_path.to_string_lossy().into_owned(),
            url: format!("{}/{}", url_prefix.trim_end_matches('/'), conversion.output_name),
            file_name: conversion.file_name,
            kind: conversion.kind,
            request_id: conversion.request_id,
        }
    }
}

/// Helper for handlers that need to return `(StatusCode, Json<ApiError>)`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError::new(message)))
}
