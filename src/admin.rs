//! Exportable admin configuration and route registration.
//!
//! [`ExportableAdmin`] is the explicit, immutable per-model configuration
//! for changelist export: which columns are exported under which labels,
//! which delimited formats are offered, and which output encoding is
//! written. It is built once, validated at registration time, and turned
//! into an axum [`Router`] carrying one GET route per export format.
//!
//! The host mounts the returned router under the model's admin path and
//! renders [`export_buttons`](ExportableAdmin::export_buttons) into its
//! changelist page; this crate does neither URL reversing nor template
//! work.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use encoding_rs::Encoding;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::export::export_rows;
use crate::formats::ExportFormat;
use crate::response::ExportResponse;
use crate::source::ExportSource;
use crate::text::{sanitize_query_string, slugify};

/// One exported column: a field name plus an optional display label.
///
/// When no label is configured, the field name is prettified (underscores
/// become spaces, first letter capitalized); this is the single label
/// resolution rule used everywhere in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumn {
    field: String,
    label: Option<String>,
}

impl ExportColumn {
    /// Creates a column exporting `field` under its prettified name.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: None,
        }
    }

    /// Sets an explicit display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the field name resolved against each record.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the display label used in the header line.
    pub fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| {
            let pretty = self.field.replace('_', " ");
            let mut chars = pretty.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
    }
}

/// One export button for the changelist page: display text plus target
/// URL, with the current view's query string preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportButton {
    /// The button text, e.g. `"Export as CSV"`.
    pub label: String,
    /// The export route URL, including any preserved query string.
    pub url: String,
}

/// Export configuration for one admin model.
///
/// # Examples
///
/// ```
/// use exportable_admin::admin::ExportableAdmin;
///
/// let admin = ExportableAdmin::new("blog", "article")
///     .list_display(vec!["title", "author", "published"]);
/// assert_eq!(admin.model_key(), "blog.article");
/// assert_eq!(admin.export_filename(), "article.csv");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableAdmin {
    /// The application label (e.g. "blog").
    pub app_label: String,
    /// The model name in lowercase (e.g. "article").
    pub model_name: String,
    /// The human-readable verbose name; drives the download filename.
    pub verbose_name: String,
    /// The exported columns, in display order.
    pub columns: Vec<ExportColumn>,
    /// The export formats offered; each becomes one route and one button.
    pub export_formats: Vec<ExportFormat>,
    /// The output encoding label (any WHATWG label).
    pub encoding: String,
    /// The URL prefix the host mounts admin routes under.
    pub url_prefix: String,
}

impl ExportableAdmin {
    /// Creates an export configuration with the default formats
    /// (comma- and tab-delimited) and UTF-8 output.
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        let model = model_name.into();
        let verbose = model.replace('_', " ");
        Self {
            app_label: app_label.into(),
            model_name: model,
            verbose_name: verbose,
            columns: Vec::new(),
            export_formats: ExportFormat::default_formats(),
            encoding: "utf-8".to_string(),
            url_prefix: "/admin".to_string(),
        }
    }

    /// Sets the verbose name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the exported columns from field names, each under its
    /// prettified label.
    #[must_use]
    pub fn list_display(mut self, fields: Vec<&str>) -> Self {
        self.columns = fields.into_iter().map(ExportColumn::new).collect();
        self
    }

    /// Sets the exported columns explicitly.
    #[must_use]
    pub fn columns(mut self, columns: Vec<ExportColumn>) -> Self {
        self.columns = columns;
        self
    }

    /// Sets the offered export formats.
    #[must_use]
    pub fn export_formats(mut self, formats: Vec<ExportFormat>) -> Self {
        self.export_formats = formats;
        self
    }

    /// Offers only the comma-delimited format.
    #[must_use]
    pub fn csv_only(self) -> Self {
        self.export_formats(vec![ExportFormat::csv()])
    }

    /// Offers only the pipe-delimited format.
    #[must_use]
    pub fn pipe_only(self) -> Self {
        self.export_formats(vec![ExportFormat::pipe()])
    }

    /// Offers the comma- and pipe-delimited formats.
    #[must_use]
    pub fn csv_and_pipe(self) -> Self {
        self.export_formats(vec![ExportFormat::csv(), ExportFormat::pipe()])
    }

    /// Sets the output encoding label.
    #[must_use]
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    /// Sets the URL prefix used when building button URLs.
    #[must_use]
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// Returns the model key in `"app_label.model_name"` format.
    pub fn model_key(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Returns the slug naming this resource in the download filename.
    ///
    /// The slug comes from the verbose name; when that yields nothing
    /// slug-safe, the model name is used verbatim. This is the one
    /// canonical name resolution; there is no attribute probing.
    pub fn export_slug(&self) -> String {
        let slug = slugify(&self.verbose_name);
        if slug.is_empty() {
            self.model_name.clone()
        } else {
            slug
        }
    }

    /// Returns the attachment filename for export downloads.
    pub fn export_filename(&self) -> String {
        format!("{}.csv", self.export_slug())
    }

    /// Returns the base URL path of this model's admin pages.
    fn base_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.url_prefix, self.app_label, self.model_name
        )
    }

    /// Returns one button per export format for the changelist page.
    ///
    /// A non-empty `query_string` (the current view's filters and
    /// ordering) is sanitized and appended, so the export reproduces
    /// exactly the filtered list the user is looking at.
    pub fn export_buttons(&self, query_string: Option<&str>) -> Vec<ExportButton> {
        self.export_formats
            .iter()
            .map(|format| {
                let mut url = format!("{}/export/{}", self.base_path(), format.slug());
                if let Some(qs) = query_string.filter(|qs| !qs.is_empty()) {
                    url.push('?');
                    url.push_str(&sanitize_query_string(qs));
                }
                ExportButton {
                    label: format!("Export as {}", format.name()),
                    url,
                }
            })
            .collect()
    }

    /// Checks the configuration, returning the first problem found.
    ///
    /// Runs as part of [`into_router`](Self::into_router); exposed so
    /// hosts can fail fast at startup.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.export_formats.is_empty() {
            return Err(ExportError::ImproperlyConfigured(format!(
                "{}: set export_formats before registering export routes",
                self.model_key()
            )));
        }
        if self.columns.is_empty() {
            return Err(ExportError::ImproperlyConfigured(format!(
                "{}: an export needs at least one column",
                self.model_key()
            )));
        }
        let mut slugs = Vec::with_capacity(self.export_formats.len());
        for format in &self.export_formats {
            format.delimiter_byte()?;
            let slug = format.slug();
            if slug.is_empty() {
                return Err(ExportError::ImproperlyConfigured(format!(
                    "{}: format {:?} has no URL-safe name",
                    self.model_key(),
                    format.name()
                )));
            }
            if slugs.contains(&slug) {
                return Err(ExportError::ImproperlyConfigured(format!(
                    "{}: duplicate export format slug {slug:?}",
                    self.model_key()
                )));
            }
            slugs.push(slug);
        }
        if Encoding::for_label(self.encoding.as_bytes()).is_none() {
            return Err(ExportError::UnknownEncoding(self.encoding.clone()));
        }
        Ok(())
    }

    /// Builds the export routes: one `GET /export/{format-slug}` per
    /// configured format, each carrying its own immutable state.
    ///
    /// The host nests the returned router under the model's admin path
    /// (the path [`export_buttons`](Self::export_buttons) links to).
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::ImproperlyConfigured`] (or
    /// [`ExportError::UnknownEncoding`]) when the configuration is
    /// invalid; no routes are registered in that case.
    pub fn into_router(self, source: Arc<dyn ExportSource>) -> Result<Router, ExportError> {
        self.validate()?;
        let encoding = Encoding::for_label(self.encoding.as_bytes())
            .ok_or_else(|| ExportError::UnknownEncoding(self.encoding.clone()))?;

        let mut router = Router::new();
        for format in &self.export_formats {
            let path = format!("/export/{}", format.slug());
            let state = Arc::new(ExportRouteState {
                model_key: self.model_key(),
                format_name: format.name().to_string(),
                filename: self.export_filename(),
                charset: encoding.name(),
                encoding_label: self.encoding.clone(),
                delimiter: format.delimiter_byte()?,
                columns: self.columns.clone(),
                source: Arc::clone(&source),
            });
            tracing::debug!(
                model = %state.model_key,
                format = %state.format_name,
                path = %path,
                "registered export route"
            );
            router = router.merge(Router::new().route(&path, get(handle_export)).with_state(state));
        }
        Ok(router)
    }
}

/// Immutable per-route state: everything one export route needs, resolved
/// at registration time.
struct ExportRouteState {
    model_key: String,
    format_name: String,
    filename: String,
    charset: &'static str,
    encoding_label: String,
    delimiter: u8,
    columns: Vec<ExportColumn>,
    source: Arc<dyn ExportSource>,
}

/// Handler for `GET /export/{format-slug}`: opens a fresh row source for
/// the request's query and streams the encoded document.
async fn handle_export(
    State(state): State<Arc<ExportRouteState>>,
    Query(query): Query<HashMap<String, String>>,
) -> axum::response::Response {
    tracing::debug!(
        model = %state.model_key,
        format = %state.format_name,
        "export requested"
    );
    let rows = state.source.open(&query);
    match export_rows(rows, &state.columns, state.delimiter, &state.encoding_label) {
        Ok(stream) => {
            ExportResponse::new(state.filename.clone(), state.charset, stream).into_response()
        }
        Err(err) => {
            // Unreachable after validate(), short of a racing config edit.
            tracing::error!(error = %err, model = %state.model_key, "failed to start export");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
