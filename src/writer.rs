//! Incremental delimited-text encoding.
//!
//! [`RowEncoder`] is the memory-bounded core of the crate: it turns a
//! header set and a sequence of rows into a sequence of independently
//! transmittable encoded chunks. Each line (header or row) is formatted
//! into a single reusable in-memory buffer, re-encoded into the target
//! output encoding through one long-lived incremental encoder, forwarded
//! to the sink, and the buffer is truncated back to empty. At no point is
//! more than one line held in memory, regardless of how many rows an
//! export produces.
//!
//! The sink side is deliberately minimal: [`Echo`] forwards nothing and
//! hands each chunk straight back, which lets the encoder act as a pure
//! transform inside a pull pipeline with the real destination (the
//! streaming HTTP body) attached one layer above.

use std::collections::HashMap;

use bytes::Bytes;
use encoding_rs::{Encoder, EncoderResult, Encoding};

use crate::error::ExportError;
use crate::text::smart_text;

/// One row of display values, keyed by column label.
///
/// Values use the admin's universal JSON representation; anything missing
/// from the map (or explicitly null) is exported as an empty field.
pub type Row = HashMap<String, serde_json::Value>;

/// Destination for encoded chunks.
///
/// The contract is "write-only passthrough": a sink accepts one encoded
/// chunk and returns the bytes it forwarded. A real destination can hang
/// on to the chunk; a passthrough returns it unchanged so the caller can
/// forward it itself.
pub trait ChunkSink {
    /// Accepts one encoded chunk and returns the forwarded bytes.
    fn accept(&mut self, chunk: Bytes) -> Bytes;
}

/// A sink that stores nothing and returns each chunk to its caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

impl ChunkSink for Echo {
    fn accept(&mut self, chunk: Bytes) -> Bytes {
        chunk
    }
}

/// A sink that appends every chunk to an in-memory buffer.
///
/// Useful in tests and for callers that want a whole document rather than
/// a stream; the streaming path never uses it.
#[derive(Debug, Default)]
pub struct BufferSink {
    buf: Vec<u8>,
}

impl BufferSink {
    /// Creates an empty buffering sink.
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Returns the accumulated bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the sink, returning the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl ChunkSink for BufferSink {
    fn accept(&mut self, chunk: Bytes) -> Bytes {
        self.buf.extend_from_slice(&chunk);
        chunk
    }
}

/// An incremental delimited-text encoder.
///
/// Construction immediately encodes the header line and emits it through
/// the sink; the header is the first chunk of every export, produced as a
/// side effect of construction, not of the first row write. Each
/// subsequent [`write_row`](Self::write_row) produces exactly one more
/// chunk.
///
/// Quoting follows the standard text-table rules: fields containing the
/// delimiter, the quote character, or line breaks are quoted, and embedded
/// quotes are doubled.
///
/// # Examples
///
/// ```
/// use exportable_admin::writer::{Echo, Row, RowEncoder};
///
/// let headers = vec!["Name".to_string(), "Amount".to_string()];
/// let (mut encoder, header) = RowEncoder::new(Echo, headers, b',').unwrap();
/// assert_eq!(&header[..], b"Name,Amount\n");
///
/// let mut row = Row::new();
/// row.insert("Name".to_string(), serde_json::json!("B,C"));
/// row.insert("Amount".to_string(), serde_json::json!(10));
/// let chunk = encoder.write_row(&row).unwrap();
/// assert_eq!(&chunk[..], b"\"B,C\",10\n");
/// ```
pub struct RowEncoder<S: ChunkSink> {
    sink: S,
    headers: Vec<String>,
    delimiter: u8,
    line_buf: Vec<u8>,
    encoder: Encoder,
    encoding: &'static Encoding,
}

impl<S: ChunkSink> RowEncoder<S> {
    /// Creates an encoder targeting UTF-8 and emits the header line.
    ///
    /// Returns the encoder together with the header chunk (the sink's
    /// passthrough return), so stream-style callers can yield it as their
    /// first item.
    pub fn new(sink: S, headers: Vec<String>, delimiter: u8) -> Result<(Self, Bytes), ExportError> {
        Self::with_encoding(sink, headers, delimiter, "utf-8")
    }

    /// Creates an encoder targeting the encoding named by `label` (any
    /// WHATWG encoding label) and emits the header line.
    pub fn with_encoding(
        sink: S,
        headers: Vec<String>,
        delimiter: u8,
        label: &str,
    ) -> Result<(Self, Bytes), ExportError> {
        if headers.is_empty() {
            return Err(ExportError::ImproperlyConfigured(
                "an export needs at least one column header".to_string(),
            ));
        }
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ExportError::UnknownEncoding(label.to_string()))?;

        let mut this = Self {
            sink,
            headers,
            delimiter,
            line_buf: Vec::with_capacity(256),
            encoder: encoding.new_encoder(),
            encoding,
        };
        let labels = this.headers.clone();
        let header_chunk = this.write_line(&labels)?;
        Ok((this, header_chunk))
    }

    /// Returns the ordered column labels this encoder writes.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the canonical name of the target encoding.
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Returns the number of bytes currently held in the line buffer.
    ///
    /// Zero between calls: the buffer is truncated after every line, which
    /// is what bounds the encoder's memory to O(1) lines.
    pub fn pending_bytes(&self) -> usize {
        self.line_buf.len()
    }

    /// Encodes one row as a single delimited line and forwards it.
    ///
    /// Fields are looked up by column label; missing or null values become
    /// empty fields. Returns the same encoded bytes that were forwarded to
    /// the sink.
    pub fn write_row(&mut self, row: &Row) -> Result<Bytes, ExportError> {
        let fields: Vec<String> = self
            .headers
            .iter()
            .map(|label| row.get(label).map_or_else(String::new, smart_text))
            .collect();
        self.write_line(&fields)
    }

    /// Consumes the encoder, returning a lazy iterator that yields one
    /// encoded chunk per input row.
    ///
    /// Nothing is encoded until the iterator is advanced; this is the
    /// shape a demand-driven streaming body consumes.
    pub fn write_rows<I>(self, rows: I) -> WriteRows<S, I::IntoIter>
    where
        I: IntoIterator<Item = Row>,
    {
        WriteRows {
            encoder: self,
            rows: rows.into_iter(),
        }
    }

    fn write_line(&mut self, fields: &[String]) -> Result<Bytes, ExportError> {
        debug_assert!(self.line_buf.is_empty());
        {
            let mut line = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .from_writer(&mut self.line_buf);
            line.write_record(fields)?;
            line.flush()?;
        }
        // Truncate the buffer whether or not encoding succeeded; a failed
        // line must not leak into a later (hypothetical) write.
        let encoded = self.encode_line();
        self.line_buf.clear();
        Ok(self.sink.accept(encoded?))
    }

    /// Re-encodes the buffered UTF-8 line into the target encoding,
    /// continuing the incremental encoder state from previous lines.
    fn encode_line(&mut self) -> Result<Bytes, ExportError> {
        let text = std::str::from_utf8(&self.line_buf)
            .expect("delimited writer emits UTF-8 for UTF-8 input");
        let mut out: Vec<u8> = Vec::new();
        let mut remaining = text;
        loop {
            let needed = self
                .encoder
                .max_buffer_length_from_utf8_without_replacement(remaining.len())
                .unwrap_or(remaining.len() * 4 + 16);
            let start = out.len();
            out.resize(start + needed.max(16), 0);
            let (result, read, written) = self.encoder.encode_from_utf8_without_replacement(
                remaining,
                &mut out[start..],
                false,
            );
            out.truncate(start + written);
            remaining = &remaining[read..];
            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(character) => {
                    return Err(ExportError::Unencodable {
                        character,
                        encoding: self.encoding.name(),
                    })
                }
            }
        }
        Ok(Bytes::from(out))
    }
}

impl<S: ChunkSink> std::fmt::Debug for RowEncoder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowEncoder")
            .field("headers", &self.headers)
            .field("delimiter", &(self.delimiter as char))
            .field("encoding", &self.encoding.name())
            .field("pending_bytes", &self.line_buf.len())
            .finish_non_exhaustive()
    }
}

/// Lazy per-row encoding: applies [`RowEncoder::write_row`] to each input
/// row on demand, yielding one `Result` per row.
#[derive(Debug)]
pub struct WriteRows<S: ChunkSink, I> {
    encoder: RowEncoder<S>,
    rows: I,
}

impl<S: ChunkSink, I: Iterator<Item = Row>> Iterator for WriteRows<S, I> {
    type Item = Result<Bytes, ExportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| self.encoder.write_row(&row))
    }
}
