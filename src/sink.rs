//! Consumers of transformed records.
//!
//! An [`OutputSink`] receives every [`TransformedRecord`] the pipeline
//! produces. Index submission, batching towards a search server and similar
//! concerns live behind this trait; [`CollectingSink`] keeps records in
//! memory and [`JsonLinesSink`](crate::json_sink::JsonLinesSink) writes them
//! as JSON lines.

use crate::error::Result;
use crate::transform::TransformedRecord;

/// Destination for transformed records.
///
/// [`flush`](Self::flush) must be called once all records were accepted;
/// sinks may buffer until then.
pub trait OutputSink: std::fmt::Debug {
    /// Accept one transformed record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    fn accept(&mut self, record: &TransformedRecord) -> Result<()>;

    /// Accept several records in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error.
    fn accept_batch(&mut self, records: &[TransformedRecord]) -> Result<()> {
        for record in records {
            self.accept(record)?;
        }
        Ok(())
    }

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying output cannot be flushed.
    fn flush(&mut self) -> Result<()>;

    /// Number of records accepted so far, if the sink tracks it
    fn records_written(&self) -> Option<usize> {
        None
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    /// Records in the order they were accepted
    pub records: Vec<TransformedRecord>,
    flushed: bool,
}

impl CollectingSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`OutputSink::flush`] has been called
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }
}

impl OutputSink for CollectingSink {
    fn accept(&mut self, record: &TransformedRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushed = true;
        Ok(())
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records.len())
    }
}
