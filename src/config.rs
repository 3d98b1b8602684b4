//! Configuration for rule compilation and pipeline runs.
//!
//! [`CompilerConfig`] tells the [`RuleCompiler`](crate::rules::RuleCompiler)
//! where translation files live; [`PipelineConfig`] controls how
//! [`run_pipeline`](crate::pipeline::run_pipeline) batches records.

use std::path::PathBuf;

/// Configuration for compiling a rule file.
///
/// # Examples
///
/// ```
/// use marcmap::CompilerConfig;
///
/// let config = CompilerConfig::default().with_translation_dir("/etc/marcmap/translations");
/// assert_eq!(config.translation_dir.to_str(), Some("/etc/marcmap/translations"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Directory that `translate*[file]` names are resolved against.
    ///
    /// Defaults to the current directory.
    pub translation_dir: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            translation_dir: PathBuf::from("."),
        }
    }
}

impl CompilerConfig {
    /// Set the translation directory
    #[must_use]
    pub fn with_translation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.translation_dir = dir.into();
        self
    }
}

/// Configuration for driving records from a source to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Records transformed together before being handed to the sink
    pub batch_size: usize,
    /// Transform each batch on the rayon thread pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100, // 100 records per batch
            parallel: false,
        }
    }
}

impl PipelineConfig {
    /// Set the batch size (at least 1)
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Enable or disable parallel batch transforms
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
