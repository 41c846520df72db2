//! Row sources: the boundary to the host admin's list machinery.
//!
//! The host framework owns the actual queryset, filtering, and per-field
//! resolution logic; this crate only pulls from it. [`RowSource`] is the
//! single-use, per-request view of that machinery: a lazy record pull plus
//! a per-record per-column value lookup. [`ExportSource`] is the factory
//! the export routes call to open one fresh `RowSource` per request.
//!
//! [`JsonRowSource`] and [`InMemoryExportSource`] are the JSON-backed
//! in-memory implementations used in tests and development, in the same
//! spirit as an in-memory database executor behind an admin API.

use std::collections::HashMap;

use crate::error::DoesNotExist;

/// A domain record in the admin's universal JSON representation.
pub type Record = serde_json::Value;

/// A lazy, finite source of records with per-field value resolution.
///
/// One instance serves exactly one export request and is consumed by it.
/// Records are pulled one at a time; nothing obliges an implementation to
/// materialize the result set.
///
/// Field lookups may fail per field (typically because a referenced
/// related record no longer exists) without aborting the export: the
/// pipeline turns [`DoesNotExist`] into an empty value. The encoder never
/// sees that failure mode.
pub trait RowSource: Send {
    /// Pulls the next record of the list view, or `None` when exhausted.
    fn next_record(&mut self) -> Option<Record>;

    /// Resolves the display value of `field` on `record`.
    fn lookup_field(&self, record: &Record, field: &str)
        -> Result<serde_json::Value, DoesNotExist>;
}

impl RowSource for Box<dyn RowSource> {
    fn next_record(&mut self) -> Option<Record> {
        (**self).next_record()
    }

    fn lookup_field(
        &self,
        record: &Record,
        field: &str,
    ) -> Result<serde_json::Value, DoesNotExist> {
        (**self).lookup_field(record, field)
    }
}

/// Builds one fresh [`RowSource`] per export request.
///
/// The raw query parameters of the export request are passed through so
/// the host can reproduce the currently filtered and sorted list view;
/// interpreting them is entirely the host's business.
pub trait ExportSource: Send + Sync {
    /// Opens a row source for one export request.
    fn open(&self, query: &HashMap<String, String>) -> Box<dyn RowSource>;
}

impl<F> ExportSource for F
where
    F: Fn(&HashMap<String, String>) -> Box<dyn RowSource> + Send + Sync,
{
    fn open(&self, query: &HashMap<String, String>) -> Box<dyn RowSource> {
        self(query)
    }
}

/// An in-memory [`RowSource`] over JSON objects, resolving fields by key.
///
/// A key that is absent from a record resolves to null (an empty exported
/// field), matching how a list view renders a blank cell.
#[derive(Debug)]
pub struct JsonRowSource {
    records: std::vec::IntoIter<Record>,
}

impl JsonRowSource {
    /// Creates a row source over the given records.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl RowSource for JsonRowSource {
    fn next_record(&mut self) -> Option<Record> {
        self.records.next()
    }

    fn lookup_field(
        &self,
        record: &Record,
        field: &str,
    ) -> Result<serde_json::Value, DoesNotExist> {
        Ok(record.get(field).cloned().unwrap_or(serde_json::Value::Null))
    }
}

/// An [`ExportSource`] serving a fixed record set.
///
/// Every request sees the same records regardless of its query parameters;
/// useful for tests and development fixtures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExportSource {
    records: Vec<Record>,
}

impl InMemoryExportSource {
    /// Creates a source over the given records.
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Returns the number of records served per request.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the source has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ExportSource for InMemoryExportSource {
    fn open(&self, _query: &HashMap<String, String>) -> Box<dyn RowSource> {
        Box::new(JsonRowSource::new(self.records.clone()))
    }
}
