//! The record transformation entry points.
//!
//! [`transform`] is a pure function of a record and a compiled rule set: it
//! takes no locks, shares no mutable state and does no I/O, so any number of
//! threads may call it with the same rule set. Fields are visited in record
//! order (leader, control fields, data fields), each field is matched against
//! the rules, every match is resolved, and the candidates are consolidated.
//! `customText` values are added last.
//!
//! # Examples
//!
//! ```
//! use marcmap::{transform, Datafield, InMemorySource, RawRecord, RuleCompiler};
//!
//! let rules = RuleCompiler::new(InMemorySource::new())
//!     .compile("author: 100$**$a, connectedSubfields[d:NoDate]")?;
//! let record = RawRecord::builder("rec-1")
//!     .data_field(
//!         Datafield::builder("100", '1', ' ')
//!             .subfield_str('a', "Smith, J.")
//!             .subfield_str('d', "1900-1980")
//!             .build(),
//!     )
//!     .build();
//!
//! let output = transform(&record, &rules);
//! assert_eq!(output.values("author"), ["Smith, J.", "1900-1980"]);
//! # Ok::<(), marcmap::CompileError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::consolidate::{Consolidator, OutputField};
use crate::diagnostics::Diagnostics;
use crate::matcher::{rules_for_control_field, rules_for_data_field};
use crate::record::RawRecord;
use crate::resolver::{resolve_control_field, resolve_data_field};
use crate::rules::CompiledRuleSet;

/// The output of transforming one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedRecord {
    /// Identifier of the source record
    pub id: String,
    /// Output fields in the order they were first produced
    pub fields: Vec<OutputField>,
}

impl TransformedRecord {
    /// Look up an output field by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutputField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Values of an output field, empty if the field was not produced
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.get(name).map_or(&[][..], |f| f.values.as_slice())
    }

    /// True when no rule produced a value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Transform one record.
#[must_use]
pub fn transform(record: &RawRecord, rule_set: &CompiledRuleSet) -> TransformedRecord {
    let mut diagnostics = Diagnostics::logging_only();
    transform_into(record, rule_set, &mut diagnostics)
}

/// Transform one record and return the diagnostic events it caused.
#[must_use]
pub fn transform_with_diagnostics(
    record: &RawRecord,
    rule_set: &CompiledRuleSet,
) -> (TransformedRecord, Diagnostics) {
    let mut diagnostics = Diagnostics::collecting();
    let output = transform_into(record, rule_set, &mut diagnostics);
    (output, diagnostics)
}

/// Transform a batch of records on the rayon thread pool.
///
/// The output is in input order.
#[must_use]
pub fn transform_batch_parallel(
    records: &[RawRecord],
    rule_set: &CompiledRuleSet,
) -> Vec<TransformedRecord> {
    use rayon::prelude::*;

    records
        .par_iter()
        .map(|record| transform(record, rule_set))
        .collect()
}

fn transform_into(
    record: &RawRecord,
    rule_set: &CompiledRuleSet,
    diagnostics: &mut Diagnostics,
) -> TransformedRecord {
    let mut consolidator = Consolidator::new();

    let leader = record.leader_field();
    for field in leader.iter().chain(record.control_fields()) {
        for rule in rules_for_control_field(rule_set, field) {
            let values = resolve_control_field(rule, field, diagnostics);
            consolidator.extend(rule, values);
        }
    }

    for field in record.data_fields() {
        for rule in rules_for_data_field(rule_set, field) {
            let values = resolve_data_field(rule, field, diagnostics);
            consolidator.extend(rule, values);
        }
    }

    for rule in rule_set.custom_text_rules() {
        if let Some(texts) = &rule.custom_text {
            consolidator.extend(rule, texts.iter().cloned());
        }
    }

    TransformedRecord {
        id: record.id.clone(),
        fields: consolidator.finish(),
    }
}
