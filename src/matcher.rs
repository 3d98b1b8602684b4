//! Selecting the rules that can apply to a field.
//!
//! The matcher is a pure filter: given a control or data field it returns the
//! rules with at least one coordinate matching the field's tag (and, for data
//! fields, its indicators), in declaration order. Declaration order is the
//! tie-break the consolidator relies on, so it is preserved even though
//! candidate rules come from two index lists.
//!
//! [`RuleIndex`] avoids scanning every rule for every field: rules whose
//! coordinates all have literal tags are filed under those tags, rules with
//! any wildcard tag go to a short list checked for every field.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::record::{Controlfield, Datafield};
use crate::rules::{CompiledRuleSet, Rule};

/// Tag index over a rule list.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    by_tag: HashMap<String, Vec<usize>>,
    wildcard: Vec<usize>,
}

impl RuleIndex {
    /// Index `rules` by the literal tags of their coordinates.
    #[must_use]
    pub fn build(rules: &[Rule]) -> Self {
        let mut index = RuleIndex::default();
        for (position, rule) in rules.iter().enumerate() {
            if rule.is_custom_text() {
                continue;
            }
            if rule.coordinates.iter().any(|c| c.literal_tag().is_none()) {
                index.wildcard.push(position);
                continue;
            }
            for coordinate in &rule.coordinates {
                if let Some(tag) = coordinate.literal_tag() {
                    let positions = index.by_tag.entry(tag).or_default();
                    if positions.last() != Some(&position) {
                        positions.push(position);
                    }
                }
            }
        }
        index
    }

    /// Positions of rules that might apply to `tag`, in declaration order.
    #[must_use]
    pub fn candidates(&self, tag: &str) -> Vec<usize> {
        let literal = self.by_tag.get(tag).map_or(&[][..], Vec::as_slice);
        merge_sorted(literal, &self.wildcard)
    }
}

/// Merge two ascending position lists into one.
fn merge_sorted(left: &[usize], right: &[usize]) -> Vec<usize> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            Ordering::Less => {
                merged.push(left[i]);
                i += 1;
            },
            Ordering::Greater => {
                merged.push(right[j]);
                j += 1;
            },
            Ordering::Equal => {
                merged.push(left[i]);
                i += 1;
                j += 1;
            },
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}

/// Rules that can apply to a control field, in declaration order.
#[must_use]
pub fn rules_for_control_field<'r>(
    rule_set: &'r CompiledRuleSet,
    field: &Controlfield,
) -> Vec<&'r Rule> {
    let rules = rule_set.rules();
    rule_set
        .index()
        .candidates(&field.tag)
        .into_iter()
        .map(|position| &rules[position])
        .filter(|rule| rule.matches_control_field(field))
        .collect()
}

/// Rules that can apply to a data field, in declaration order.
#[must_use]
pub fn rules_for_data_field<'r>(rule_set: &'r CompiledRuleSet, field: &Datafield) -> Vec<&'r Rule> {
    let rules = rule_set.rules();
    rule_set
        .index()
        .candidates(&field.tag)
        .into_iter()
        .map(|position| &rules[position])
        .filter(|rule| rule.matches_data_field(field))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleCompiler;
    use crate::translation::InMemorySource;

    fn rule_set(text: &str) -> CompiledRuleSet {
        RuleCompiler::new(InMemorySource::new()).compile(text).unwrap()
    }

    fn names(rules: &[&Rule]) -> Vec<String> {
        rules.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_merge_sorted() {
        assert_eq!(merge_sorted(&[0, 3, 5], &[1, 3, 6]), vec![0, 1, 3, 5, 6]);
        assert_eq!(merge_sorted(&[], &[2]), vec![2]);
        assert_eq!(merge_sorted(&[4], &[]), vec![4]);
    }

    #[test]
    fn test_declaration_order_is_preserved() {
        let rules = rule_set(
            "subjects: 6**$**$a, multiValued\n\
             lcsh: 650$*0$a\n\
             topics: 650$**$a, 651$**$a\n\
             names: 100$**$a",
        );
        let field = Datafield::new("650", ' ', '0');
        assert_eq!(
            names(&rules_for_data_field(&rules, &field)),
            vec!["subjects", "lcsh", "topics"]
        );
    }

    #[test]
    fn test_indicators_filter_data_fields() {
        let rules = rule_set("lcsh: 650$*0$a\nmesh: 650$*2$a");
        let lcsh = Datafield::new("650", ' ', '0');
        let local = Datafield::new("650", ' ', '4');
        assert_eq!(names(&rules_for_data_field(&rules, &lcsh)), vec!["lcsh"]);
        assert!(rules_for_data_field(&rules, &local).is_empty());
    }

    #[test]
    fn test_control_fields_match_on_tag_only() {
        let rules = rule_set("year: 008$*, regexStrict[\\d{4}]\nid: 001\nleader: 000");
        let field = Controlfield::new("008", "abc1999");
        assert_eq!(names(&rules_for_control_field(&rules, &field)), vec!["year"]);
        let leader = Controlfield::new("000", "00000nam");
        assert_eq!(names(&rules_for_control_field(&rules, &leader)), vec!["leader"]);
    }

    #[test]
    fn test_rule_listed_once_per_tag() {
        let rules = rule_set("title: 245$**$a, 245$**$b, 245$**$c");
        assert_eq!(rules.index().candidates("245"), vec![0]);
        assert!(rules.index().candidates("100").is_empty());
    }

    #[test]
    fn test_custom_text_rules_never_match() {
        let rules = rule_set("source: customText, Library\ntitle: 245$**$a");
        let field = Datafield::new("245", '1', '0');
        assert_eq!(names(&rules_for_data_field(&rules, &field)), vec!["title"]);
    }
}
