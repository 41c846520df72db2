//! The per-request export pipeline.
//!
//! [`ExportRows`] wires a [`RowSource`] to a [`RowEncoder`] and produces
//! the finite chunk sequence a streaming response body consumes: the
//! header line first, then one encoded chunk per record. Production is
//! pull-based: nothing is resolved or encoded until the consumer asks for
//! the next chunk, so a slow client throttles row production through
//! ordinary backpressure and a disconnected client simply stops it.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;

use crate::admin::ExportColumn;
use crate::error::ExportError;
use crate::source::RowSource;
use crate::text::strip_tags;
use crate::writer::{Echo, Row, RowEncoder};

/// Builds the chunk pipeline for one export request.
///
/// Resolves the column labels once, constructs the encoder (which encodes
/// the header line eagerly), and returns the lazy producer. Configuration
/// problems (no columns, unknown encoding) surface here, before the first
/// chunk is transmitted.
pub fn export_rows<R: RowSource>(
    source: R,
    columns: &[ExportColumn],
    delimiter: u8,
    encoding_label: &str,
) -> Result<ExportRows<R>, ExportError> {
    let columns: Vec<(String, String)> = columns
        .iter()
        .map(|c| (c.field().to_string(), c.label()))
        .collect();
    let labels = columns.iter().map(|(_, label)| label.clone()).collect();
    let (encoder, header) = RowEncoder::with_encoding(Echo, labels, delimiter, encoding_label)?;
    Ok(ExportRows {
        source,
        columns,
        encoder: Some(encoder),
        header: Some(header),
        rows_written: 0,
    })
}

/// A finite, single-use producer of encoded export chunks.
///
/// Yields the header chunk first, then one chunk per record. For each
/// record, every column is resolved through the row source (a missing
/// related record becomes an empty value) and inline markup is stripped
/// from string values before encoding.
///
/// Implements both [`Iterator`] (synchronous consumption) and
/// [`futures_core::Stream`] (streaming-body consumption); the stream never
/// parks because each chunk is computed on demand. After a terminal
/// encoding error the producer is fused.
pub struct ExportRows<R: RowSource> {
    source: R,
    /// Resolved `(field, label)` pairs, in display order.
    columns: Vec<(String, String)>,
    encoder: Option<RowEncoder<Echo>>,
    header: Option<Bytes>,
    rows_written: u64,
}

impl<R: RowSource> ExportRows<R> {
    /// Returns the number of data rows encoded so far.
    pub const fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn next_chunk(&mut self) -> Option<Result<Bytes, ExportError>> {
        if let Some(header) = self.header.take() {
            return Some(Ok(header));
        }
        let encoder = self.encoder.as_mut()?;
        let Some(record) = self.source.next_record() else {
            tracing::debug!(rows = self.rows_written, "export stream complete");
            self.encoder = None;
            return None;
        };

        let mut row = Row::with_capacity(self.columns.len());
        for (field, label) in &self.columns {
            let value = self
                .source
                .lookup_field(&record, field)
                .unwrap_or(serde_json::Value::Null);
            let value = match value {
                serde_json::Value::String(s) => serde_json::Value::String(strip_tags(&s)),
                other => other,
            };
            row.insert(label.clone(), value);
        }

        match encoder.write_row(&row) {
            Ok(chunk) => {
                self.rows_written += 1;
                Some(Ok(chunk))
            }
            Err(err) => {
                tracing::warn!(error = %err, rows = self.rows_written,
                    "export terminated mid-stream; client receives a truncated file");
                self.encoder = None;
                Some(Err(err))
            }
        }
    }
}

impl<R: RowSource> Iterator for ExportRows<R> {
    type Item = Result<Bytes, ExportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk()
    }
}

impl<R: RowSource + Unpin> futures_core::Stream for ExportRows<R> {
    type Item = Result<Bytes, ExportError>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().next_chunk())
    }
}

impl<R: RowSource> std::fmt::Debug for ExportRows<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportRows")
            .field("columns", &self.columns)
            .field("rows_written", &self.rows_written)
            .field("header_pending", &self.header.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DoesNotExist;
    use crate::source::{JsonRowSource, Record};
    use serde_json::json;

    fn columns(fields: &[&str]) -> Vec<ExportColumn> {
        fields.iter().map(|f| ExportColumn::new(*f)).collect()
    }

    fn collect_document(rows: ExportRows<impl RowSource>) -> String {
        let mut out = Vec::new();
        for chunk in rows {
            out.extend_from_slice(&chunk.unwrap());
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_is_first_chunk() {
        let source = JsonRowSource::new(vec![json!({"name": "A"})]);
        let mut rows = export_rows(source, &columns(&["name"]), b',', "utf-8").unwrap();
        let first = rows.next().unwrap().unwrap();
        assert_eq!(&first[..], b"Name\n");
    }

    #[test]
    fn test_one_chunk_per_record() {
        let source = JsonRowSource::new(vec![
            json!({"name": "A", "amount": 5}),
            json!({"name": "B,C", "amount": 10}),
        ]);
        let rows = export_rows(source, &columns(&["name", "amount"]), b',', "utf-8").unwrap();
        let doc = collect_document(rows);
        assert_eq!(doc, "Name,Amount\nA,5\n\"B,C\",10\n");
    }

    #[test]
    fn test_markup_stripped_from_string_values() {
        let source = JsonRowSource::new(vec![
            json!({"title": "<a href=\"/1/\">First</a>", "count": 1}),
        ]);
        let rows = export_rows(source, &columns(&["title", "count"]), b',', "utf-8").unwrap();
        let doc = collect_document(rows);
        assert_eq!(doc, "Title,Count\nFirst,1\n");
    }

    #[test]
    fn test_rows_written_counter() {
        let source = JsonRowSource::new(vec![json!({"n": 1}), json!({"n": 2})]);
        let mut rows = export_rows(source, &columns(&["n"]), b',', "utf-8").unwrap();
        assert_eq!(rows.rows_written(), 0);
        while rows.next().is_some() {}
        assert_eq!(rows.rows_written(), 2);
    }

    /// A source whose `broken` field always resolves like a dangling
    /// relation.
    struct DanglingRelation {
        inner: JsonRowSource,
    }

    impl RowSource for DanglingRelation {
        fn next_record(&mut self) -> Option<Record> {
            self.inner.next_record()
        }

        fn lookup_field(
            &self,
            record: &Record,
            field: &str,
        ) -> Result<serde_json::Value, DoesNotExist> {
            if field == "author" {
                Err(DoesNotExist("author".to_string()))
            } else {
                self.inner.lookup_field(record, field)
            }
        }
    }

    #[test]
    fn test_missing_related_record_becomes_empty_field() {
        let source = DanglingRelation {
            inner: JsonRowSource::new(vec![json!({"title": "T"})]),
        };
        let rows = export_rows(source, &columns(&["title", "author"]), b',', "utf-8").unwrap();
        let doc = collect_document(rows);
        assert_eq!(doc, "Title,Author\nT,\n");
    }

    #[test]
    fn test_encode_error_is_terminal_and_fuses() {
        let source = JsonRowSource::new(vec![
            json!({"name": "fine"}),
            json!({"name": "bad ☃"}),
            json!({"name": "never reached"}),
        ]);
        let mut rows =
            export_rows(source, &columns(&["name"]), b',', "windows-1252").unwrap();
        assert!(rows.next().unwrap().is_ok()); // header
        assert!(rows.next().unwrap().is_ok()); // "fine"
        assert!(rows.next().unwrap().is_err()); // snowman
        assert!(rows.next().is_none()); // fused
    }

    /// Counts how many records have been pulled, to observe laziness.
    struct Counting {
        inner: JsonRowSource,
        pulled: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl RowSource for Counting {
        fn next_record(&mut self) -> Option<Record> {
            let record = self.inner.next_record();
            if record.is_some() {
                self.pulled
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            record
        }

        fn lookup_field(
            &self,
            record: &Record,
            field: &str,
        ) -> Result<serde_json::Value, DoesNotExist> {
            self.inner.lookup_field(record, field)
        }
    }

    #[test]
    fn test_records_are_pulled_on_demand() {
        let pulled = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let source = Counting {
            inner: JsonRowSource::new((0..100).map(|i| json!({"n": i})).collect()),
            pulled: pulled.clone(),
        };
        let mut rows = export_rows(source, &columns(&["n"]), b',', "utf-8").unwrap();

        // Header needs no record at all.
        rows.next().unwrap().unwrap();
        assert_eq!(pulled.load(std::sync::atomic::Ordering::Relaxed), 0);

        // Each data chunk pulls exactly one record.
        rows.next().unwrap().unwrap();
        assert_eq!(pulled.load(std::sync::atomic::Ordering::Relaxed), 1);
        rows.next().unwrap().unwrap();
        assert_eq!(pulled.load(std::sync::atomic::Ordering::Relaxed), 2);
    }
}
