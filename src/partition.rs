//! Active and passive subfield views.
//!
//! When a rule is applied to a data field, the subfields its coordinates name
//! are *active* (they provide the main values) and all others are *passive*
//! (readable only by connected, concatenated and existence operations). The
//! partition is two borrowed views over the unchanged field, recomputed for
//! every rule application.

use smallvec::SmallVec;

use crate::coordinate::Coordinate;
use crate::record::{Datafield, Subfield};

/// Disjoint active/passive views over one data field's subfields.
#[derive(Debug, Clone)]
pub struct SubfieldPartition<'a> {
    active: SmallVec<[&'a Subfield; 4]>,
    passive: SmallVec<[&'a Subfield; 4]>,
}

impl<'a> SubfieldPartition<'a> {
    /// Partition with a custom activity test
    pub fn new(field: &'a Datafield, is_active: impl Fn(char) -> bool) -> Self {
        let (active, passive) = field.subfields.iter().partition(|sf| is_active(sf.code));
        SubfieldPartition { active, passive }
    }

    /// A partition with no subfields at all, as seen by control fields
    #[must_use]
    pub fn empty() -> Self {
        SubfieldPartition {
            active: SmallVec::new(),
            passive: SmallVec::new(),
        }
    }

    /// Partition for a set of coordinates: a subfield is active when at least
    /// one coordinate names its code. Codes in `forced_passive` are passive
    /// regardless.
    #[must_use]
    pub fn for_coordinates(
        field: &'a Datafield,
        coordinates: &[&Coordinate],
        forced_passive: &[char],
    ) -> Self {
        Self::new(field, |code| {
            !forced_passive.contains(&code) && coordinates.iter().any(|c| c.names_subfield(code))
        })
    }

    /// Active subfields in field order
    #[must_use]
    pub fn active(&self) -> &[&'a Subfield] {
        &self.active
    }

    /// Passive subfields in field order
    #[must_use]
    pub fn passive(&self) -> &[&'a Subfield] {
        &self.passive
    }

    /// Whether a passive subfield with this code exists
    #[must_use]
    pub fn has_passive(&self, code: char) -> bool {
        self.passive.iter().any(|sf| sf.code == code)
    }

    /// First passive subfield (in field order) whose code is in `codes` and
    /// whose content is non-empty.
    #[must_use]
    pub fn first_passive(&self, codes: &[char]) -> Option<&'a str> {
        self.passive
            .iter()
            .find(|sf| codes.contains(&sf.code) && !sf.content.is_empty())
            .map(|sf| sf.content.as_str())
    }

    /// Non-empty passive contents with the given code, in field order
    pub fn passive_contents(&self, code: char) -> impl Iterator<Item = &'a str> + '_ {
        self.passive
            .iter()
            .filter(move |sf| sf.code == code && !sf.content.is_empty())
            .map(|sf| sf.content.as_str())
    }
}
