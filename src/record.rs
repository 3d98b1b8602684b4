//! Raw catalog record structures.
//!
//! This module provides the field model the transformation engine reads from:
//! - [`RawRecord`]: one parsed source record
//! - [`Controlfield`]: fixed-tag field with unstructured content
//! - [`Datafield`]: indicator-qualified field made of subfields
//! - [`Subfield`]: coded data element within a data field
//!
//! Records are built once by a producer (see [`crate::source`]) and are never
//! mutated by the engine. Field order is preserved exactly as produced, because
//! "first value wins" consolidation depends on it.
//!
//! # Examples
//!
//! ```
//! use marcmap::{Datafield, RawRecord};
//!
//! let record = RawRecord::builder("rec-1")
//!     .control_field_str("008", "850101s1925    nyu           000 1 eng d")
//!     .data_field(
//!         Datafield::builder("100", '1', ' ')
//!             .subfield_str('a', "Fitzgerald, F. Scott")
//!             .subfield_str('d', "1896-1940")
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(record.control_field("008").map(str::len), Some(40));
//! assert_eq!(record.data_fields().count(), 1);
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Marker used for an unset indicator (and for wildcard positions in rule
/// coordinates).
pub const UNSET_INDICATOR: char = '*';

/// Tag under which the leader is exposed to rules as a pseudo control field.
pub const LEADER_TAG: &str = "000";

/// One parsed source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Record identifier (usually the content of control field 001)
    pub id: String,
    /// Record leader, empty when the source provided none
    #[serde(default)]
    pub leader: String,
    /// Control fields in source order
    pub control_fields: Vec<Controlfield>,
    /// Data fields in source order
    pub data_fields: Vec<Datafield>,
}

/// A control field: a tag plus unstructured content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controlfield {
    /// Field tag (3 characters)
    pub tag: String,
    /// Field content
    pub content: String,
}

/// A data field: tag, two indicators and ordered subfields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datafield {
    /// Field tag (3 characters)
    pub tag: String,
    /// First indicator, [`UNSET_INDICATOR`] when blank
    pub indicator1: char,
    /// Second indicator, [`UNSET_INDICATOR`] when blank
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields with 4 or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield content
    pub content: String,
}

/// Normalize an indicator as delivered by a source.
///
/// Blank (space) and empty indicators both mean "unset" and are stored as
/// [`UNSET_INDICATOR`], so rule coordinates never have to distinguish them.
#[must_use]
pub fn normalize_indicator(indicator: Option<char>) -> char {
    match indicator {
        None | Some(' ') => UNSET_INDICATOR,
        Some(c) => c,
    }
}

impl RawRecord {
    /// Create an empty record with the given identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        RawRecord {
            id: id.into(),
            leader: String::new(),
            control_fields: Vec::new(),
            data_fields: Vec::new(),
        }
    }

    /// Create a builder for fluently constructing records
    #[must_use]
    pub fn builder(id: impl Into<String>) -> RawRecordBuilder {
        RawRecordBuilder {
            record: RawRecord::new(id),
        }
    }

    /// Get the first control field content with the given tag
    #[must_use]
    pub fn control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields
            .iter()
            .find(|cf| cf.tag == tag)
            .map(|cf| cf.content.as_str())
    }

    /// Iterate over control fields in record order
    pub fn control_fields(&self) -> impl Iterator<Item = &Controlfield> {
        self.control_fields.iter()
    }

    /// Iterate over data fields in record order
    pub fn data_fields(&self) -> impl Iterator<Item = &Datafield> {
        self.data_fields.iter()
    }

    /// Iterate over data fields with the given tag
    pub fn data_fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Datafield> {
        self.data_fields.iter().filter(move |df| df.tag == tag)
    }

    /// The leader as a pseudo control field tagged [`LEADER_TAG`], if the
    /// record has a leader.
    #[must_use]
    pub fn leader_field(&self) -> Option<Controlfield> {
        if self.leader.is_empty() {
            None
        } else {
            Some(Controlfield::new(LEADER_TAG, self.leader.clone()))
        }
    }

    /// True when the record has neither control nor data fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.control_fields.is_empty() && self.data_fields.is_empty()
    }
}

/// Builder for fluently constructing records
#[derive(Debug)]
pub struct RawRecordBuilder {
    record: RawRecord,
}

impl RawRecordBuilder {
    /// Set the record leader
    #[must_use]
    pub fn leader(mut self, leader: impl Into<String>) -> Self {
        self.record.leader = leader.into();
        self
    }

    /// Append a control field
    #[must_use]
    pub fn control_field(mut self, field: Controlfield) -> Self {
        self.record.control_fields.push(field);
        self
    }

    /// Append a control field from string slices
    #[must_use]
    pub fn control_field_str(self, tag: &str, content: &str) -> Self {
        self.control_field(Controlfield::new(tag, content))
    }

    /// Append a data field
    #[must_use]
    pub fn data_field(mut self, field: Datafield) -> Self {
        self.record.data_fields.push(field);
        self
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> RawRecord {
        self.record
    }
}

impl Controlfield {
    /// Create a control field
    #[must_use]
    pub fn new(tag: impl Into<String>, content: impl Into<String>) -> Self {
        Controlfield {
            tag: tag.into(),
            content: content.into(),
        }
    }
}

impl Datafield {
    /// Create a data field without subfields
    ///
    /// Blank indicators are normalized to [`UNSET_INDICATOR`].
    #[must_use]
    pub fn new(tag: impl Into<String>, indicator1: char, indicator2: char) -> Self {
        Datafield {
            tag: tag.into(),
            indicator1: normalize_indicator(Some(indicator1)),
            indicator2: normalize_indicator(Some(indicator2)),
            subfields: SmallVec::new(),
        }
    }

    /// Create a builder for constructing data fields fluently
    ///
    /// # Examples
    ///
    /// ```
    /// use marcmap::Datafield;
    ///
    /// let field = Datafield::builder("245", '1', '0')
    ///     .subfield_str('a', "The Great Gatsby")
    ///     .subfield_str('c', "F. Scott Fitzgerald")
    ///     .build();
    /// assert_eq!(field.first_content('c'), Some("F. Scott Fitzgerald"));
    /// ```
    #[must_use]
    pub fn builder(tag: impl Into<String>, indicator1: char, indicator2: char) -> DatafieldBuilder {
        DatafieldBuilder {
            field: Datafield::new(tag, indicator1, indicator2),
        }
    }

    /// Add a subfield
    pub fn add_subfield(&mut self, code: char, content: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            content: content.into(),
        });
    }

    /// Iterate over all subfields
    pub fn subfields(&self) -> impl Iterator<Item = &Subfield> {
        self.subfields.iter()
    }

    /// Get the first content for a subfield code
    #[must_use]
    pub fn first_content(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.content.as_str())
    }

    /// Check whether any subfield has the given code
    #[must_use]
    pub fn has_subfield(&self, code: char) -> bool {
        self.subfields.iter().any(|sf| sf.code == code)
    }
}

/// Builder for fluently constructing data fields
#[derive(Debug)]
pub struct DatafieldBuilder {
    field: Datafield,
}

impl DatafieldBuilder {
    /// Add a subfield to the field being built
    #[must_use]
    pub fn subfield(mut self, code: char, content: String) -> Self {
        self.field.add_subfield(code, content);
        self
    }

    /// Add a subfield using a string slice
    #[must_use]
    pub fn subfield_str(mut self, code: char, content: &str) -> Self {
        self.field.add_subfield(code, content);
        self
    }

    /// Build the field
    #[must_use]
    pub fn build(self) -> Datafield {
        self.field
    }
}

impl Subfield {
    /// Create a subfield
    #[must_use]
    pub fn new(code: char, content: impl Into<String>) -> Self {
        Subfield {
            code,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder_preserves_order() {
        let record = RawRecord::builder("1")
            .control_field_str("001", "1")
            .control_field_str("008", "abc")
            .data_field(Datafield::builder("700", ' ', ' ').subfield_str('a', "B").build())
            .data_field(Datafield::builder("100", ' ', ' ').subfield_str('a', "A").build())
            .build();

        let tags: Vec<_> = record.data_fields().map(|df| df.tag.as_str()).collect();
        assert_eq!(tags, vec!["700", "100"]);
        assert_eq!(record.control_field("008"), Some("abc"));
        assert_eq!(record.control_field("005"), None);
    }

    #[test]
    fn test_blank_indicators_are_normalized() {
        let field = Datafield::new("245", ' ', '0');
        assert_eq!(field.indicator1, UNSET_INDICATOR);
        assert_eq!(field.indicator2, '0');
        assert_eq!(normalize_indicator(None), UNSET_INDICATOR);
    }

    #[test]
    fn test_leader_field() {
        let mut record = RawRecord::new("x");
        assert!(record.leader_field().is_none());
        record.leader = "00000nam a2200000 a 4500".to_string();
        let leader = record.leader_field().unwrap();
        assert_eq!(leader.tag, LEADER_TAG);
        assert_eq!(leader.content.len(), 24);
    }

    #[test]
    fn test_subfield_access() {
        let field = Datafield::builder("100", '1', ' ')
            .subfield_str('a', "Smith")
            .subfield_str('d', "1900-1980")
            .subfield_str('a', "ignored")
            .build();
        assert_eq!(field.first_content('a'), Some("Smith"));
        assert!(field.has_subfield('d'));
        assert!(!field.has_subfield('e'));
        assert_eq!(field.subfields().count(), 3);
    }

    #[test]
    fn test_data_fields_by_tag() {
        let record = RawRecord::builder("1")
            .data_field(Datafield::new("650", ' ', '0'))
            .data_field(Datafield::new("651", ' ', '0'))
            .data_field(Datafield::new("650", ' ', '7'))
            .build();
        assert_eq!(record.data_fields_by_tag("650").count(), 2);
        assert!(!record.is_empty());
        assert!(RawRecord::new("e").is_empty());
    }
}
