#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # marcmap: rule-driven MARC record transformation
//!
//! Turns bibliographic records (leader, control fields, data fields with
//! coded subfields) into flat sets of named output fields for a search
//! index. What goes where is not hard-coded: a rule file maps source
//! coordinates to output fields and shapes the values on the way.
//!
//! ## Quick Start
//!
//! ```
//! use marcmap::{transform, Datafield, InMemorySource, RawRecord, RuleCompiler};
//!
//! let tables = InMemorySource::new().with_table("roles.properties", "aut=Author\n");
//! let rules = RuleCompiler::new(tables).compile(
//!     "title: 245$**$a, 245$**$b, concatenatedSubfields[b: : ], applyToFields[245$**$a]\n\
//!      author: 100$**$a, connectedSubfields[4:NoRole], \
//!              translateConnectedSubfields[roles.properties]\n\
//!      source: customText, Union Catalogue",
//! )?;
//!
//! let record = RawRecord::builder("rec-1")
//!     .data_field(
//!         Datafield::builder("245", '1', '0')
//!             .subfield_str('a', "Main title")
//!             .subfield_str('b', "a subtitle")
//!             .build(),
//!     )
//!     .data_field(
//!         Datafield::builder("100", '1', ' ')
//!             .subfield_str('a', "Smith, J.")
//!             .subfield_str('4', "aut")
//!             .build(),
//!     )
//!     .build();
//!
//! let output = transform(&record, &rules);
//! assert_eq!(output.values("title"), ["Main title : a subtitle"]);
//! assert_eq!(output.values("author"), ["Smith, J.", "Author"]);
//! assert_eq!(output.values("source"), ["Union Catalogue"]);
//! # Ok::<(), marcmap::CompileError>(())
//! ```
//!
//! ## Modules
//!
//! - [`record`] and [`partition`]: the field model and active/passive views
//! - [`coordinate`], [`brackets`], [`modifier`], [`translation`], [`rules`]:
//!   rule compilation
//! - [`matcher`]: selecting the rules that apply to a field
//! - [`resolver`]: producing candidate values for a (field, rule) pair
//! - [`consolidate`]: merging candidates into output fields
//! - [`transform`]: the per-record entry points
//! - [`source`], [`sink`], [`marcxml`], [`json_sink`], [`pipeline`]: the
//!   collaborators around the engine

pub mod brackets;
pub mod config;
pub mod consolidate;
pub mod coordinate;
pub mod diagnostics;
pub mod error;
pub mod json_sink;
pub mod marcxml;
pub mod matcher;
pub mod modifier;
pub mod partition;
pub mod pipeline;
/// Raw record structures (`RawRecord`, `Controlfield`, `Datafield`, `Subfield`)
pub mod record;
pub mod resolver;
pub mod rules;
pub mod sink;
pub mod source;
pub mod transform;
pub mod translation;

pub use config::{CompilerConfig, PipelineConfig};
pub use consolidate::{Consolidator, OutputField};
pub use coordinate::Coordinate;
pub use diagnostics::{DiagnosticEvent, Diagnostics};
pub use error::{CompileError, CompileResult, MarcmapError, Result};
pub use json_sink::JsonLinesSink;
pub use marcxml::MarcxmlSource;
pub use pipeline::{run_pipeline, run_pipeline_with_config, PipelineStats};
pub use record::{
    Controlfield, Datafield, DatafieldBuilder, RawRecord, RawRecordBuilder, Subfield,
};
pub use rules::{CompiledRuleSet, Rule, RuleCompiler};
pub use sink::{CollectingSink, OutputSink};
pub use source::{RecordSource, VecSource};
pub use transform::{
    transform, transform_batch_parallel, transform_with_diagnostics, TransformedRecord,
};
pub use translation::{DirectorySource, InMemorySource, TranslationSource, TranslationTable};
