//! JSON-lines output.
//!
//! Each transformed record becomes one JSON object on its own line. The
//! record identifier is written under `"id"`, followed by the output fields
//! in production order. Multi-valued fields are arrays, single-valued fields
//! are plain strings:
//!
//! ```text
//! {"id":"rec-1","title":"The great Gatsby","topic":["Rich people","Married women"]}
//! ```
//!
//! A rule whose output field is itself called `id` produces a second `"id"`
//! key; most JSON readers keep the last one.

use std::io::Write;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::{MarcmapError, Result};
use crate::sink::OutputSink;
use crate::transform::TransformedRecord;

/// Writes transformed records as JSON lines.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    records_written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    /// Create a sink writing to `writer`
    pub fn new(writer: W) -> Self {
        JsonLinesSink {
            writer,
            records_written: 0,
        }
    }

    /// Return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + std::fmt::Debug> OutputSink for JsonLinesSink<W> {
    fn accept(&mut self, record: &TransformedRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &JsonLine(record))
            .map_err(|e| MarcmapError::SerializationError(format!("record {}: {e}", record.id)))?;
        self.writer.write_all(b"\n")?;
        self.records_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

/// Serialize a record as one flat JSON object.
struct JsonLine<'a>(&'a TransformedRecord);

impl Serialize for JsonLine<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let record = self.0;
        let mut map = serializer.serialize_map(Some(record.fields.len() + 1))?;
        map.serialize_entry("id", &record.id)?;
        for field in &record.fields {
            if field.multi_valued {
                map.serialize_entry(&field.name, &field.values)?;
            } else if let Some(value) = field.first_value() {
                map.serialize_entry(&field.name, value)?;
            }
        }
        map.end()
    }
}

/// Render one record as a JSON line (without the trailing newline).
///
/// # Errors
///
/// Returns [`MarcmapError::SerializationError`] if serialization fails.
pub fn to_json_line(record: &TransformedRecord) -> Result<String> {
    serde_json::to_string(&JsonLine(record))
        .map_err(|e| MarcmapError::SerializationError(format!("record {}: {e}", record.id)))
}
