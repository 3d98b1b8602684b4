//! Error types for rule compilation and record transformation.
//!
//! This module provides two error types:
//! - [`CompileError`] for everything that can go wrong while turning rule text
//!   into a [`CompiledRuleSet`](crate::rules::CompiledRuleSet). These are fatal
//!   for a run: a partially compiled rule set would silently mis-transform data.
//! - [`MarcmapError`] for failures in the collaborators around the engine
//!   (record sources, output sinks, I/O).
//!
//! Transforming a record never fails. A strict-regex miss, a translation miss
//! without a default, or a failed existence predicate simply produce no value.

use thiserror::Error;

/// Error raised while compiling rule text.
///
/// Every variant carries the output field name of the rule being compiled
/// (or the offending line) so a broken rule file can be fixed without
/// guesswork.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A rule line is not of the form `name: token, token, ...`.
    #[error("Invalid rule line {line}: {message}")]
    InvalidLine {
        /// 1-based line number in the rule text
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// Two rule lines declare the same output field.
    #[error("Duplicate rule for output field '{0}'")]
    DuplicateField(String),

    /// A coordinate token has the wrong length or shape.
    #[error("Invalid coordinate '{token}' in rule '{field}': {message}")]
    InvalidCoordinate {
        /// Output field name
        field: String,
        /// The offending token
        token: String,
        /// Description of the problem
        message: String,
    },

    /// Brackets in a token do not balance.
    #[error("Unbalanced brackets in '{token}' (rule '{field}')")]
    UnbalancedBrackets {
        /// Output field name
        field: String,
        /// The offending token
        token: String,
    },

    /// A token looks like a modifier but is not one the compiler knows.
    #[error("Unknown modifier '{token}' in rule '{field}'")]
    UnknownModifier {
        /// Output field name
        field: String,
        /// The offending token
        token: String,
    },

    /// A modifier argument could not be parsed.
    #[error("Invalid argument for {modifier} in rule '{field}': {message}")]
    InvalidArgument {
        /// Output field name
        field: String,
        /// Modifier name
        modifier: String,
        /// Description of the problem
        message: String,
    },

    /// A character range such as `35-37` is malformed.
    #[error("Invalid character range '{range}' in rule '{field}'")]
    InvalidRange {
        /// Output field name
        field: String,
        /// The offending range text
        range: String,
    },

    /// A regular expression failed to compile.
    #[error("Invalid regex '{pattern}' in rule '{field}': {message}")]
    InvalidRegex {
        /// Output field name (or translation file name for regex tables)
        field: String,
        /// The pattern that failed
        pattern: String,
        /// Error reported by the regex engine
        message: String,
    },

    /// A referenced translation file does not exist or cannot be read.
    #[error("Translation file '{file}' referenced by rule '{field}' could not be loaded: {message}")]
    MissingTranslationFile {
        /// Output field name
        field: String,
        /// File name as written in the rule
        file: String,
        /// Underlying cause
        message: String,
    },

    /// The rule combines modifiers the engine does not support together.
    #[error("Unsupported modifier combination in rule '{field}': {message}")]
    UnsupportedCombination {
        /// Output field name
        field: String,
        /// Which modifiers conflict
        message: String,
    },

    /// The rule has no source coordinates (and is not a custom-text rule).
    #[error("Rule '{0}' has no field coordinates")]
    NoCoordinates(String),
}

/// Error type for record sources, output sinks and pipeline runs.
#[derive(Error, Debug)]
pub enum MarcmapError {
    /// The rule set failed to compile.
    #[error("Rule compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// A source document could not be parsed into a record.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A record was structurally invalid.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A transformed record could not be serialized for the sink.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`MarcmapError`].
pub type Result<T> = std::result::Result<T, MarcmapError>;

/// Convenience type alias for compilation results.
pub type CompileResult<T> = std::result::Result<T, CompileError>;
