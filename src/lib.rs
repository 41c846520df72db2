//! # exportable-admin
//!
//! Streaming "export current list view to delimited text" endpoints for
//! admin-style web interfaces. The crate registers one export route and
//! one button per configured format (comma-, tab-, or custom-delimited),
//! pulls records lazily from the host's list machinery, and streams the
//! encoded document to the client one row at a time; memory stays bounded
//! at a single line no matter how large the export is.
//!
//! ## Modules
//!
//! - [`admin`] - Per-model export configuration and route registration
//! - [`formats`] - Export format (name + delimiter) configuration
//! - [`writer`] - The incremental, memory-bounded row encoder
//! - [`export`] - The per-request chunk pipeline
//! - [`source`] - Row source traits and in-memory implementations
//! - [`response`] - The streamed attachment download response
//! - [`error`] - Error types
//! - [`text`] - Slugs, markup stripping, value conversion
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use exportable_admin::{ExportableAdmin, InMemoryExportSource};
//! use serde_json::json;
//!
//! let source = Arc::new(InMemoryExportSource::new(vec![
//!     json!({"title": "First", "amount": 5}),
//! ]));
//! let router = ExportableAdmin::new("blog", "article")
//!     .list_display(vec!["title", "amount"])
//!     .into_router(source)
//!     .unwrap();
//! // Mount `router` under /admin/blog/article in the host application.
//! let _app: axum::Router = axum::Router::new().nest("/admin/blog/article", router);
//! ```

pub mod admin;
pub mod error;
pub mod export;
pub mod formats;
pub mod response;
pub mod source;
pub mod text;
pub mod writer;

// Re-export the most commonly used types at the crate root.
pub use admin::{ExportButton, ExportColumn, ExportableAdmin};
pub use error::{DoesNotExist, ExportError, ExportResult};
pub use export::{export_rows, ExportRows};
pub use formats::ExportFormat;
pub use response::ExportResponse;
pub use source::{ExportSource, InMemoryExportSource, JsonRowSource, Record, RowSource};
pub use writer::{BufferSink, ChunkSink, Echo, Row, RowEncoder};
