//! Turning one (field, rule) pair into candidate values.
//!
//! Resolution happens in three steps:
//!
//! 1. Partition the field's subfields into active and passive views, using
//!    only the rule's coordinates that match this field.
//! 2. Evaluate the existence predicates against the passive codes.
//! 3. Shape every non-empty active value through exactly one path, chosen by
//!    [`Rule::value_path`]: translate, regex, replace, connected,
//!    concatenated or plain.
//!
//! Control fields have a single active value (their content) and no passive
//! subfields. Empty strings are never returned.

use smallvec::SmallVec;

use crate::coordinate::Coordinate;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::modifier::{ConcatenatedSpec, RegexMode, RegexSpec, TranslateSpec};
use crate::partition::SubfieldPartition;
use crate::record::{Controlfield, Datafield};
use crate::rules::{Rule, ValuePath};

/// Candidate values produced by `rule` for a control field.
pub fn resolve_control_field(
    rule: &Rule,
    field: &Controlfield,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let resolution = Resolution {
        rule,
        tag: &field.tag,
        partition: SubfieldPartition::empty(),
        concatenate: true,
    };
    resolution.resolve(std::iter::once(field.content.as_str()), diagnostics)
}

/// Candidate values produced by `rule` for a data field.
///
/// With `applyToFields`, concatenation only happens for the listed fields,
/// and for those the concatenation codes are passive even when a coordinate
/// names them.
pub fn resolve_data_field(
    rule: &Rule,
    field: &Datafield,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let coordinates: SmallVec<[&Coordinate; 4]> = rule.coordinates_for(field).collect();
    let concatenate = rule.concatenates(field);
    let forced_passive: &[char] = match &rule.concatenated {
        Some(spec) if concatenate && !rule.apply_to.is_empty() => &spec.codes,
        _ => &[],
    };
    let resolution = Resolution {
        rule,
        tag: &field.tag,
        partition: SubfieldPartition::for_coordinates(field, &coordinates, forced_passive),
        concatenate,
    };
    let active: SmallVec<[&str; 4]> = resolution
        .partition
        .active()
        .iter()
        .map(|sf| sf.content.as_str())
        .collect();
    resolution.resolve(active.into_iter(), diagnostics)
}

struct Resolution<'a> {
    rule: &'a Rule,
    tag: &'a str,
    partition: SubfieldPartition<'a>,
    concatenate: bool,
}

impl Resolution<'_> {
    fn resolve<'c>(
        &self,
        active: impl Iterator<Item = &'c str>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<String> {
        if !self.passes_existence() {
            diagnostics.report(DiagnosticEvent::SkippedByExistence {
                rule: self.rule.name.clone(),
                tag: self.tag.to_string(),
            });
            return Vec::new();
        }

        let mut values = Vec::new();
        for content in active.filter(|c| !c.is_empty()) {
            self.shape(content, diagnostics, &mut values);
        }
        values
    }

    fn passes_existence(&self) -> bool {
        let present = |code| self.partition.has_passive(code);
        let exists = self
            .rule
            .exists
            .as_ref()
            .map_or(true, |spec| spec.is_satisfied(present));
        let not_exists = self
            .rule
            .not_exists
            .as_ref()
            .map_or(true, |spec| !spec.is_satisfied(present));
        exists && not_exists
    }

    fn shape(&self, content: &str, diagnostics: &mut Diagnostics, values: &mut Vec<String>) {
        let rule = self.rule;
        match rule.value_path() {
            ValuePath::Translate => {
                if let Some(spec) = &rule.translate {
                    push(values, self.translate(spec, content, diagnostics));
                }
            },
            ValuePath::Regex => {
                if let Some(regex) = &rule.regex {
                    push(values, self.apply_regex(regex, content, diagnostics));
                }
            },
            ValuePath::Replace => {
                if let Some(replace) = &rule.replace {
                    push(values, Some(replace.apply(content)));
                }
            },
            ValuePath::Connected => self.connected(content, values),
            ValuePath::Concatenated => match &rule.concatenated {
                Some(spec) if self.concatenate => push(values, Some(self.concatenated(spec, content))),
                _ => push(values, Some(content.to_string())),
            },
            ValuePath::Plain => push(values, Some(content.to_string())),
        }
    }

    /// Range, then regex, then table lookup, then default.
    fn translate(
        &self,
        spec: &TranslateSpec,
        content: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        let candidate = match spec.range {
            Some(range) => range.extract(content)?,
            None => content.to_string(),
        };
        let candidate = match &self.rule.regex {
            Some(regex) => self.apply_regex(regex, &candidate, diagnostics)?,
            None => candidate,
        };

        spec.lookup(self.tag, &candidate)
            .map(str::to_string)
            .or_else(|| self.fall_back(candidate, diagnostics))
    }

    fn fall_back(&self, candidate: String, diagnostics: &mut Diagnostics) -> Option<String> {
        let rule = self.rule.name.clone();
        let tag = self.tag.to_string();
        match &self.rule.default_value {
            Some(default) => {
                diagnostics.report(DiagnosticEvent::TranslationDefault {
                    rule,
                    tag,
                    candidate,
                });
                Some(default.clone())
            },
            None => {
                diagnostics.report(DiagnosticEvent::TranslationDropped {
                    rule,
                    tag,
                    candidate,
                });
                None
            },
        }
    }

    fn apply_regex(
        &self,
        regex: &RegexSpec,
        content: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        let result = regex.apply(content);
        if result.is_none() && regex.mode == RegexMode::Strict {
            diagnostics.report(DiagnosticEvent::StrictRegexMiss {
                rule: self.rule.name.clone(),
                tag: self.tag.to_string(),
                content: content.to_string(),
            });
        }
        result
    }

    /// The active value, then one value per code set.
    fn connected(&self, content: &str, values: &mut Vec<String>) {
        push(values, Some(content.to_string()));
        for spec in &self.rule.connected {
            let value = match self.partition.first_passive(&spec.codes) {
                Some(found) => match &self.rule.connected_translation {
                    Some(translation) => translation.apply(found),
                    None => found.to_string(),
                },
                None => spec.default.clone(),
            };
            push(values, Some(value));
        }
    }

    fn concatenated(&self, spec: &ConcatenatedSpec, content: &str) -> String {
        let parts: Vec<String> = spec
            .codes
            .iter()
            .flat_map(|&code| self.partition.passive_contents(code))
            .map(|part| match &self.rule.concatenated_translation {
                Some(translation) => translation.apply(part),
                None => part.to_string(),
            })
            .collect();
        if parts.is_empty() {
            content.to_string()
        } else {
            format!("{content}{}{}", spec.separator, parts.join(&spec.separator))
        }
    }
}

fn push(values: &mut Vec<String>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{CompiledRuleSet, RuleCompiler};
    use crate::translation::InMemorySource;

    fn compile(text: &str) -> CompiledRuleSet {
        let tables = InMemorySource::new()
            .with_table("language.properties", "ger=German\neng=English\n")
            .with_table("roles.properties", "aut=Author\nedt=Editor\n")
            .with_table("genre.properties", "Roman=Novel\nGedicht=Poem\n")
            .with_table(
                "format.properties",
                "245|\\[Tonträger\\]=Audio\n\\[Karte\\]=Map\n.*=Book\n",
            );
        RuleCompiler::new(tables).compile(text).unwrap()
    }

    fn data(rule_text: &str, field: &Datafield) -> Vec<String> {
        let rules = compile(rule_text);
        let mut diagnostics = Diagnostics::logging_only();
        resolve_data_field(&rules.rules()[0], field, &mut diagnostics)
    }

    fn control(rule_text: &str, content: &str) -> Vec<String> {
        let rules = compile(rule_text);
        let field = Controlfield::new("008", content);
        let mut diagnostics = Diagnostics::logging_only();
        resolve_control_field(&rules.rules()[0], &field, &mut diagnostics)
    }

    fn author() -> Datafield {
        Datafield::builder("100", '1', ' ')
            .subfield_str('a', "Smith, J.")
            .subfield_str('d', "1900-1980")
            .subfield_str('4', "aut")
            .build()
    }

    #[test]
    fn test_plain_value_per_active_subfield() {
        let field = Datafield::builder("650", ' ', '0')
            .subfield_str('a', "Cats")
            .subfield_str('x', "Behavior")
            .subfield_str('a', "")
            .subfield_str('a', "Dogs")
            .build();
        assert_eq!(data("topic: 650$**$a, multiValued", &field), vec!["Cats", "Dogs"]);
    }

    #[test]
    fn test_only_coordinates_matching_the_field_are_active() {
        // 700$**$d must not make $d active in a 100 field
        let values = data(
            "name: 100$**$a, 700$**$d, concatenatedSubfields[d:, ]",
            &author(),
        );
        assert_eq!(values, vec!["Smith, J., 1900-1980"]);
    }

    #[test]
    fn test_connected_subfields() {
        assert_eq!(
            data("author: 100$**$a, connectedSubfields[d:NoDate]", &author()),
            vec!["Smith, J.", "1900-1980"]
        );
        assert_eq!(
            data(
                "author: 100$**$a, connectedSubfields[b:NoRole][9:NoGndId]",
                &author()
            ),
            vec!["Smith, J.", "NoRole", "NoGndId"]
        );
    }

    #[test]
    fn test_connected_first_non_empty_passive_in_field_order() {
        let field = Datafield::builder("100", '1', ' ')
            .subfield_str('a', "Smith, J.")
            .subfield_str('e', "")
            .subfield_str('4', "aut")
            .subfield_str('e', "editor")
            .build();
        assert_eq!(
            data("author: 100$**$a, connectedSubfields[e:4:NoRole]", &field),
            vec!["Smith, J.", "aut"]
        );
    }

    #[test]
    fn test_connected_translation_keeps_misses() {
        let field = Datafield::builder("700", '1', ' ')
            .subfield_str('a', "Doe, A.")
            .subfield_str('4', "ill")
            .build();
        assert_eq!(
            data(
                "contributor: 700$**$a, connectedSubfields[4:NoRole], \
                 translateConnectedSubfields[roles.properties]",
                &author_as_700()
            ),
            vec!["Smith, J.", "Author"]
        );
        assert_eq!(
            data(
                "contributor: 700$**$a, connectedSubfields[4:NoRole], \
                 translateConnectedSubfields[roles.properties]",
                &field
            ),
            vec!["Doe, A.", "ill"]
        );
    }

    fn author_as_700() -> Datafield {
        let mut field = author();
        field.tag = "700".into();
        field
    }

    #[test]
    fn test_empty_connected_default_yields_no_value() {
        assert_eq!(
            data("author: 100$**$a, connectedSubfields[b:]", &author()),
            vec!["Smith, J."]
        );
    }

    #[test]
    fn test_concatenated_subfields() {
        let field = Datafield::builder("245", '1', '0')
            .subfield_str('a', "Main title")
            .subfield_str('b', "subtitle")
            .subfield_str('c', "by someone")
            .subfield_str('b', "more")
            .build();
        assert_eq!(
            data("title: 245$**$a, concatenatedSubfields[b:c: : ]", &field),
            vec!["Main title : subtitle : more : by someone"]
        );
        assert_eq!(
            data("title: 245$**$a, concatenatedSubfields[x: : ]", &field),
            vec!["Main title"]
        );
    }

    #[test]
    fn test_concatenated_translation() {
        let field = Datafield::builder("655", ' ', '7')
            .subfield_str('a', "Fiction")
            .subfield_str('v', "Roman")
            .subfield_str('v', "Drama")
            .build();
        assert_eq!(
            data(
                "genre: 655$**$a, concatenatedSubfields[v:/], \
                 translateConcatenatedSubfields[genre.properties]",
                &field
            ),
            vec!["Fiction/Novel/Drama"]
        );
    }

    #[test]
    fn test_apply_to_fields() {
        let rule = "title: 245$**$a, 245$**$b, 246$**$a, 246$**$b, \
                    concatenatedSubfields[b: : ], applyToFields[245$**$a]";
        let main = Datafield::builder("245", '1', '0')
            .subfield_str('a', "Main")
            .subfield_str('b', "sub")
            .build();
        let mut variant = main.clone();
        variant.tag = "246".into();
        // listed: $b forced passive and joined on
        assert_eq!(data(rule, &main), vec!["Main : sub"]);
        // not listed: plain active values only, first one kept later by consolidation
        assert_eq!(data(rule, &variant), vec!["Main", "sub"]);
    }

    #[test]
    fn test_existence_predicates() {
        let with_2 = Datafield::builder("650", ' ', '7')
            .subfield_str('a', "Cats")
            .subfield_str('2', "gnd")
            .build();
        let without = Datafield::builder("650", ' ', '7')
            .subfield_str('a', "Dogs")
            .build();
        let rule = "gnd_topic: 650$**$a, subfieldExists[2]";
        assert_eq!(data(rule, &with_2), vec!["Cats"]);
        assert!(data(rule, &without).is_empty());

        let rule = "local_topic: 650$**$a, subfieldNotExists[2:0:OR]";
        assert!(data(rule, &with_2).is_empty());
        assert_eq!(data(rule, &without), vec!["Dogs"]);

        let rule = "both: 650$**$a, subfieldExists[2:x:AND]";
        assert!(data(rule, &with_2).is_empty());
    }

    #[test]
    fn test_existence_skip_is_reported() {
        let rules = compile("gnd_topic: 650$**$a, subfieldExists[2]");
        let field = Datafield::builder("650", ' ', '7')
            .subfield_str('a', "Dogs")
            .build();
        let mut diagnostics = Diagnostics::collecting();
        assert!(resolve_data_field(&rules.rules()[0], &field, &mut diagnostics).is_empty());
        assert_eq!(
            diagnostics.events(),
            &[DiagnosticEvent::SkippedByExistence {
                rule: "gnd_topic".into(),
                tag: "650".into(),
            }]
        );
    }

    #[test]
    fn test_strict_regex_on_control_field() {
        assert_eq!(control("year: 008$*, regexStrict[\\d{4}]", "abc1999xyz"), vec!["1999"]);
        assert!(control("year: 008$*, regexStrict[\\d{4}]", "no-year-here").is_empty());
        assert_eq!(
            control("year: 008$*, regex[\\d{4}]", "no-year-here"),
            vec!["no-year-here"]
        );
    }

    #[test]
    fn test_regex_replace() {
        let field = Datafield::builder("245", '1', '0')
            .subfield_str('a', "Title [electronic resource] /")
            .build();
        assert_eq!(
            data("title: 245$**$a, regexReplace[\\[.*?\\]|/:]", &field),
            vec!["Title"]
        );
    }

    #[test]
    fn test_translate_range_and_default() {
        let rule = "language: 008, translateValue[language.properties, 35-37], defaultValue[Unknown]";
        let german = "850101s1925    gw            000 1 ger d";
        let klingon = "850101s1925    gw            000 1 tlh d";
        assert_eq!(control(rule, german), vec!["German"]);
        assert_eq!(control(rule, klingon), vec!["Unknown"]);
        // too short for the range
        assert!(control(rule, "850101").is_empty());
        // one character short: "ge" is never looked up
        assert!(control(rule, "850101s1925    gw            000 1 ge").is_empty());
    }

    #[test]
    fn test_translate_default_is_reported() {
        let rules = compile(
            "language: 008, translateValue[language.properties, 35-37], defaultValue[Unknown]",
        );
        let field = Controlfield::new("008", "850101s1925    gw            000 1 tlh d");
        let mut diagnostics = Diagnostics::collecting();
        assert_eq!(
            resolve_control_field(&rules.rules()[0], &field, &mut diagnostics),
            vec!["Unknown"]
        );
        assert!(matches!(
            diagnostics.events(),
            [DiagnosticEvent::TranslationDefault { candidate, rule, tag }]
                if candidate == "tlh" && rule == "language" && tag == "008"
        ));
    }

    #[test]
    fn test_translate_range_ending_at_usize_max() {
        let rule = format!(
            "language: 008, translateValue[language.properties, 0-{}]",
            usize::MAX
        );
        assert!(control(&rule, "ger").is_empty());
    }

    #[test]
    fn test_translate_miss_without_default_is_dropped() {
        let rules = compile("language: 008, translateValue[language.properties]");
        let mut diagnostics = Diagnostics::collecting();
        let field = Controlfield::new("008", "fre");
        assert!(resolve_control_field(&rules.rules()[0], &field, &mut diagnostics).is_empty());
        assert!(matches!(
            diagnostics.events(),
            [DiagnosticEvent::TranslationDropped { candidate, .. }] if candidate == "fre"
        ));
    }

    #[test]
    fn test_translate_contains() {
        let field = Datafield::builder("655", ' ', '7')
            .subfield_str('a', "Historischer Roman")
            .build();
        assert_eq!(
            data("genre: 655$**$a, translateValueContains[genre.properties]", &field),
            vec!["Novel"]
        );
    }

    #[test]
    fn test_translate_regex_with_compound_keys() {
        let rule = "format: 245$**$h, 300$**$a, translateValueRegex[format.properties]";
        let audio = Datafield::builder("245", '1', '0')
            .subfield_str('h', "[Tonträger]")
            .build();
        let not_245 = Datafield::builder("300", ' ', ' ')
            .subfield_str('a', "[Tonträger]")
            .build();
        let map = Datafield::builder("300", ' ', ' ')
            .subfield_str('a', "1 [Karte]")
            .build();
        assert_eq!(data(rule, &audio), vec!["Audio"]);
        assert_eq!(data(rule, &not_245), vec!["Book"]);
        assert_eq!(data(rule, &map), vec!["Map"]);
    }

    #[test]
    fn test_translate_after_regex_extraction() {
        let rule = "language: 008, regexStrict[[a-z]{3}$], translateValue[language.properties]";
        assert_eq!(control(rule, "1999 eng"), vec!["English"]);
        assert!(control(rule, "1999").is_empty());
    }
}
