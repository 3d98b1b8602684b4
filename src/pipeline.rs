//! Driving records from a source through the engine into a sink.
//!
//! Records are pulled from the [`RecordSource`] in batches of
//! [`PipelineConfig::batch_size`], transformed (sequentially or on the rayon
//! pool) and handed to the [`OutputSink`] in source order. Memory use is
//! bounded by one batch plus the rule set.
//!
//! ```
//! use marcmap::pipeline::run_pipeline;
//! use marcmap::sink::CollectingSink;
//! use marcmap::source::VecSource;
//! use marcmap::{InMemorySource, RawRecord, RuleCompiler};
//!
//! let rules = RuleCompiler::new(InMemorySource::new()).compile("id: 001")?;
//! let mut source = VecSource::new(vec![
//!     RawRecord::builder("a").control_field_str("001", "a").build(),
//!     RawRecord::new("b"),
//! ]);
//! let mut sink = CollectingSink::new();
//!
//! let stats = run_pipeline(&mut source, &rules, &mut sink)?;
//! assert_eq!(stats.records_read, 2);
//! assert_eq!(stats.empty_records, 1);
//! # Ok::<(), marcmap::MarcmapError>(())
//! ```

use std::fmt;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::rules::CompiledRuleSet;
use crate::sink::OutputSink;
use crate::source::RecordSource;
use crate::transform::{transform, transform_batch_parallel, TransformedRecord};

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Records pulled from the source
    pub records_read: usize,
    /// Records handed to the sink
    pub records_written: usize,
    /// Records for which no rule produced a value
    pub empty_records: usize,
    /// Output fields produced across all records
    pub fields_emitted: usize,
    /// Batches processed
    pub batches: usize,
}

impl PipelineStats {
    fn add_batch(&mut self, outputs: &[TransformedRecord]) {
        self.batches += 1;
        self.records_written += outputs.len();
        self.empty_records += outputs.iter().filter(|r| r.is_empty()).count();
        self.fields_emitted += outputs.iter().map(|r| r.fields.len()).sum::<usize>();
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records read, {} written ({} empty), {} fields in {} batches",
            self.records_read, self.records_written, self.empty_records, self.fields_emitted, self.batches
        )
    }
}

/// Run with the default [`PipelineConfig`].
///
/// # Errors
///
/// Returns the first error raised by the source or the sink. Records
/// accepted before the error stay accepted.
pub fn run_pipeline<S, K>(
    source: &mut S,
    rule_set: &CompiledRuleSet,
    sink: &mut K,
) -> Result<PipelineStats>
where
    S: RecordSource,
    K: OutputSink,
{
    run_pipeline_with_config(source, rule_set, sink, &PipelineConfig::default())
}

/// Run with an explicit configuration.
///
/// # Errors
///
/// Returns the first error raised by the source or the sink.
pub fn run_pipeline_with_config<S, K>(
    source: &mut S,
    rule_set: &CompiledRuleSet,
    sink: &mut K,
    config: &PipelineConfig,
) -> Result<PipelineStats>
where
    S: RecordSource,
    K: OutputSink,
{
    let batch_size = config.batch_size.max(1);
    let mut stats = PipelineStats::default();
    let mut batch = Vec::with_capacity(batch_size);

    loop {
        batch.clear();
        while batch.len() < batch_size {
            match source.next_record()? {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }
        stats.records_read += batch.len();

        let outputs: Vec<TransformedRecord> = if config.parallel {
            transform_batch_parallel(&batch, rule_set)
        } else {
            batch.iter().map(|record| transform(record, rule_set)).collect()
        };
        sink.accept_batch(&outputs)?;
        stats.add_batch(&outputs);
        log::debug!("batch {}: {} records transformed", stats.batches, outputs.len());

        if batch.len() < batch_size {
            break;
        }
    }

    sink.flush()?;
    log::info!("pipeline finished: {stats}");
    Ok(stats)
}
