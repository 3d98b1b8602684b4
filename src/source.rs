//! Producers of raw records.
//!
//! The engine itself never reads input. Anything that can hand out
//! [`RawRecord`]s one at a time implements [`RecordSource`]; the
//! [`run_pipeline`](crate::pipeline::run_pipeline) driver pulls from it.
//!
//! ```
//! use marcmap::source::{RecordSource, VecSource};
//! use marcmap::RawRecord;
//!
//! let mut source = VecSource::new(vec![RawRecord::new("a"), RawRecord::new("b")]);
//! let ids: Vec<String> = source
//!     .records()
//!     .map(|r| r.map(|record| record.id))
//!     .collect::<marcmap::Result<_>>()?;
//! assert_eq!(ids, ["a", "b"]);
//! # Ok::<(), marcmap::MarcmapError>(())
//! ```

use std::collections::VecDeque;

use crate::error::Result;
use crate::record::RawRecord;

/// A stream of raw records.
///
/// Implementations return `Ok(None)` once the source is exhausted; that is
/// not an error. Field and subfield order must be preserved exactly as in
/// the source, since consolidation keeps the first value produced.
pub trait RecordSource: std::fmt::Debug {
    /// Read the next record.
    ///
    /// # Errors
    ///
    /// Returns an error if the source contains malformed data or I/O fails.
    fn next_record(&mut self) -> Result<Option<RawRecord>>;

    /// Read all remaining records into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; records read before it are
    /// discarded.
    fn read_all(&mut self) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Number of records handed out so far, if the source tracks it
    fn records_read(&self) -> Option<usize> {
        None
    }

    /// Iterate over the remaining records
    fn records(&mut self) -> Records<'_, Self>
    where
        Self: Sized,
    {
        Records { source: self }
    }
}

/// Iterator adapter created by [`RecordSource::records`].
#[derive(Debug)]
pub struct Records<'a, S: RecordSource> {
    source: &'a mut S,
}

impl<S: RecordSource> Iterator for Records<'_, S> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next_record().transpose()
    }
}

/// A source over records already in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    records: VecDeque<RawRecord>,
    read: usize,
}

impl VecSource {
    /// Create a source that yields `records` in order
    #[must_use]
    pub fn new(records: Vec<RawRecord>) -> Self {
        VecSource {
            records: records.into(),
            read: 0,
        }
    }
}

impl RecordSource for VecSource {
    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        let record = self.records.pop_front();
        if record.is_some() {
            self.read += 1;
        }
        Ok(record)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.read)
    }
}
