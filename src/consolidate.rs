//! Merging candidate values into output fields.
//!
//! The [`Consolidator`] receives `(rule, value)` pairs in production order
//! (record field order, then rule declaration order) and keeps them in an
//! insertion-ordered map keyed by output field name:
//!
//! - single-valued fields keep only their first value;
//! - multi-valued fields drop later equal values unless the rule allows
//!   duplicates, preserving first-occurrence order.
//!
//! Consolidation never fails, and a field is only created together with its
//! first value, so no output field is ever empty.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rules::Rule;

/// One named output field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
    /// Output field name
    pub name: String,
    /// Values in production order, never empty
    pub values: Vec<String>,
    /// Whether the field may carry more than one value
    pub multi_valued: bool,
    /// Whether equal values are kept
    pub allow_duplicates: bool,
}

impl OutputField {
    /// The first (for single-valued fields, the only) value
    #[must_use]
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// Accumulates output fields for one record.
#[derive(Debug, Default)]
pub struct Consolidator {
    fields: IndexMap<String, OutputField>,
}

impl Consolidator {
    /// Create an empty consolidator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer one value produced by `rule`.
    ///
    /// Returns `true` if the value was kept.
    pub fn add(&mut self, rule: &Rule, value: String) -> bool {
        if value.is_empty() {
            return false;
        }
        match self.fields.get_mut(&rule.name) {
            Some(field) => {
                if !field.multi_valued
                    || (!field.allow_duplicates && field.values.contains(&value))
                {
                    return false;
                }
                field.values.push(value);
            },
            None => {
                self.fields.insert(
                    rule.name.clone(),
                    OutputField {
                        name: rule.name.clone(),
                        values: vec![value],
                        multi_valued: rule.is_multi_valued(),
                        allow_duplicates: rule.allows_duplicates(),
                    },
                );
            },
        }
        true
    }

    /// Offer several values produced by `rule`, in order.
    pub fn extend(&mut self, rule: &Rule, values: impl IntoIterator<Item = String>) {
        for value in values {
            self.add(rule, value);
        }
    }

    /// Number of output fields so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no value has been kept
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Output fields in the order they were first produced
    #[must_use]
    pub fn finish(self) -> Vec<OutputField> {
        self.fields.into_values().collect()
    }
}
