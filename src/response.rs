//! The streamed export download response.
//!
//! [`ExportResponse`] wraps the chunk pipeline in an HTTP attachment
//! response: `text/csv` with the target charset, a filename-bearing
//! `Content-Disposition` header, and a body that transmits each chunk as
//! it is produced. The body is never buffered, so a mid-stream failure
//! reaches the client as a truncated download, which is the documented
//! trade-off of streaming.

use std::pin::Pin;

use axum::body::Body;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures_core::Stream;
use http::{header, HeaderValue, StatusCode};

use crate::error::ExportError;

/// A streamed attachment download of delimited text.
pub struct ExportResponse {
    filename: String,
    charset: &'static str,
    stream: Pin<Box<dyn Stream<Item = Result<Bytes, ExportError>> + Send>>,
}

impl ExportResponse {
    /// Creates a download response for the given filename and charset,
    /// streaming the given chunk sequence.
    pub fn new(
        filename: impl Into<String>,
        charset: &'static str,
        stream: impl Stream<Item = Result<Bytes, ExportError>> + Send + 'static,
    ) -> Self {
        Self {
            filename: filename.into(),
            charset,
            stream: Box::pin(stream),
        }
    }

    /// Returns the download filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the full `Content-Type` header value.
    pub fn content_type(&self) -> String {
        format!("text/csv; charset={}", self.charset)
    }

    /// Returns the `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

impl std::fmt::Debug for ExportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportResponse")
            .field("filename", &self.filename)
            .field("charset", &self.charset)
            .finish_non_exhaustive()
    }
}

impl IntoResponse for ExportResponse {
    fn into_response(self) -> axum::response::Response {
        let mut builder = axum::response::Response::builder().status(StatusCode::OK);
        if let Ok(value) = HeaderValue::from_str(&self.content_type()) {
            builder = builder.header(header::CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.content_disposition()) {
            builder = builder.header(header::CONTENT_DISPOSITION, value);
        }
        builder
            .body(Body::from_stream(self.stream))
            .unwrap_or_else(|_| {
                axum::response::Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::from("Internal Server Error"))
                    .expect("fallback response should always be valid")
            })
    }
}
