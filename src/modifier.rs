//! Compiled forms of rule modifiers.
//!
//! Modifier arguments are a small string-encoded DSL (`b:4:NoRole`,
//! `a:b:OR`, `pattern:replacement`, `file, 35-37`). They are parsed once at
//! compile time into the typed specs below, so resolving a record never
//! re-parses rule text. Every spec renders back to its argument syntax via
//! `Display`, which is what makes compiled rules re-serializable.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::translation::{RegexTable, TranslationTable};

/// Separator between parts of a modifier argument.
pub const ARGUMENT_SEPARATOR: char = ':';

/// Split a colon-separated argument into leading subfield codes and the
/// remainder.
///
/// Codes are the leading single alphanumeric segments; the last segment is
/// never taken as a code. Everything after the codes is rejoined with `:`,
/// so a default or separator may itself contain colons. Returns `None` when
/// there is no code at all.
///
/// ```
/// use marcmap::modifier::split_codes;
///
/// assert_eq!(split_codes("b:4:NoRole"), Some((vec!['b', '4'], "NoRole".to_string())));
/// assert_eq!(split_codes("b:c: : "), Some((vec!['b', 'c'], " : ".to_string())));
/// assert_eq!(split_codes("NoRole"), None);
/// ```
#[must_use]
pub fn split_codes(argument: &str) -> Option<(Vec<char>, String)> {
    let segments: Vec<&str> = argument.split(ARGUMENT_SEPARATOR).collect();
    let mut codes = Vec::new();
    for segment in &segments[..segments.len() - 1] {
        match single_code(segment) {
            Some(code) => codes.push(code),
            None => break,
        }
    }
    if codes.is_empty() {
        return None;
    }
    let rest = segments[codes.len()..].join(&ARGUMENT_SEPARATOR.to_string());
    Some((codes, rest))
}

fn single_code(segment: &str) -> Option<char> {
    let mut chars = segment.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(c),
        _ => None,
    }
}

fn write_codes(f: &mut fmt::Formatter<'_>, codes: &[char]) -> fmt::Result {
    for code in codes {
        write!(f, "{code}{ARGUMENT_SEPARATOR}")?;
    }
    Ok(())
}

/// Inclusive, 0-based character range (`35-37`, or a single position `7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    /// First character position
    pub start: usize,
    /// Last character position (inclusive)
    pub end: usize,
}

impl CharRange {
    /// Parse `start-end` or a single position.
    ///
    /// Returns `None` for anything malformed, including `end < start`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (start, end) = match text.split_once('-') {
            Some((start, end)) => (start.trim(), end.trim()),
            None => (text, text),
        };
        let start: usize = start.parse().ok()?;
        let end: usize = end.parse().ok()?;
        (end >= start).then_some(CharRange { start, end })
    }

    /// Extract the range from `content`.
    ///
    /// Returns `None` unless every position up to `end` exists; a partial
    /// range is never looked up.
    #[must_use]
    pub fn extract(&self, content: &str) -> Option<String> {
        if content.chars().count() <= self.end {
            return None;
        }
        let extracted: String = content
            .chars()
            .skip(self.start)
            .take((self.end - self.start).saturating_add(1))
            .collect();
        Some(extracted)
    }
}

impl fmt::Display for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// How a translation table is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateMode {
    /// `translateValue`: exact key lookup
    Exact,
    /// `translateValueContains`: first key contained in the value
    Contains,
    /// `translateValueRegex`: first key pattern matching the value
    Regex,
}

impl TranslateMode {
    /// The modifier keyword for this mode
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Exact => "translateValue",
            Self::Contains => "translateValueContains",
            Self::Regex => "translateValueRegex",
        }
    }
}

/// The table behind a translate modifier, in the form its mode needs.
#[derive(Debug, Clone)]
pub enum TranslationLookup {
    /// Plain table for exact and contains lookups
    Table(Arc<TranslationTable>),
    /// Table with precompiled regex keys
    Regex(Arc<RegexTable>),
}

/// `translateValue*[file]` or `translateValue*[file, range]`.
#[derive(Debug, Clone)]
pub struct TranslateSpec {
    /// Lookup mode
    pub mode: TranslateMode,
    /// File name as written in the rule
    pub file: String,
    /// Optional character range extracted before lookup
    pub range: Option<CharRange>,
    /// Shared table
    pub lookup: TranslationLookup,
}

impl TranslateSpec {
    /// Look `candidate` up according to the mode. `tag` is only consulted by
    /// compound keys in regex tables.
    #[must_use]
    pub fn lookup(&self, tag: &str, candidate: &str) -> Option<&str> {
        match (&self.lookup, self.mode) {
            (TranslationLookup::Table(table), TranslateMode::Exact) => table.get(candidate),
            (TranslationLookup::Table(table), TranslateMode::Contains) => {
                table.find_contained(candidate)
            },
            (TranslationLookup::Regex(table), _) => table.find(tag, candidate),
            (TranslationLookup::Table(_), TranslateMode::Regex) => None,
        }
    }
}

impl fmt::Display for TranslateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}", self.mode.keyword(), self.file)?;
        if let Some(range) = self.range {
            write!(f, ", {range}")?;
        }
        write!(f, "]")
    }
}

/// Table used to translate connected or concatenated subfield values.
/// A miss keeps the original text.
#[derive(Debug, Clone)]
pub struct SubfieldTranslation {
    /// File name as written in the rule
    pub file: String,
    /// Shared table
    pub table: Arc<TranslationTable>,
}

impl SubfieldTranslation {
    /// Translate `value`, falling back to the value itself.
    #[must_use]
    pub fn apply(&self, value: &str) -> String {
        self.table.get(value).unwrap_or(value).to_string()
    }
}

/// Whether a regex must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexMode {
    /// `regex`: keep the content unchanged when nothing matches
    Extract,
    /// `regexStrict`: drop the value when nothing matches
    Strict,
}

/// `regex[pattern]` / `regexStrict[pattern]`.
#[derive(Debug, Clone)]
pub struct RegexSpec {
    /// Match mode
    pub mode: RegexMode,
    /// Compiled pattern
    pub pattern: Regex,
}

impl RegexSpec {
    /// Concatenate every match found in `content`.
    ///
    /// Without a match, `Extract` passes the content through and `Strict`
    /// returns `None`.
    #[must_use]
    pub fn apply(&self, content: &str) -> Option<String> {
        let joined: String = self.pattern.find_iter(content).map(|m| m.as_str()).collect();
        if joined.is_empty() {
            match self.mode {
                RegexMode::Extract => Some(content.to_string()),
                RegexMode::Strict => None,
            }
        } else {
            Some(joined)
        }
    }
}

impl fmt::Display for RegexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.mode {
            RegexMode::Extract => "regex",
            RegexMode::Strict => "regexStrict",
        };
        write!(f, "{keyword}[{}]", self.pattern.as_str())
    }
}

/// `regexReplace[pattern:replacement]`.
#[derive(Debug, Clone)]
pub struct ReplaceSpec {
    /// Compiled pattern
    pub pattern: Regex,
    /// Replacement text (may use `$1` style group references)
    pub replacement: String,
}

impl ReplaceSpec {
    /// Replace every match and trim the result.
    #[must_use]
    pub fn apply(&self, content: &str) -> String {
        self.pattern
            .replace_all(content, self.replacement.as_str())
            .trim()
            .to_string()
    }
}

impl fmt::Display for ReplaceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "regexReplace[{}{ARGUMENT_SEPARATOR}{}]",
            self.pattern.as_str(),
            self.replacement
        )
    }
}

/// One bracket group of `connectedSubfields`: a set of codes and the value
/// used when none of them is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedSpec {
    /// Subfield codes searched, in order of preference
    pub codes: Vec<char>,
    /// Fallback value; empty means no value
    pub default: String,
}

impl ConnectedSpec {
    /// Parse `code:code:...:default`
    #[must_use]
    pub fn parse(argument: &str) -> Option<Self> {
        let (codes, default) = split_codes(argument)?;
        Some(ConnectedSpec { codes, default })
    }
}

impl fmt::Display for ConnectedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_codes(f, &self.codes)?;
        write!(f, "{}", self.default)
    }
}

/// `concatenatedSubfields[code:...:separator]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatenatedSpec {
    /// Subfield codes joined onto the main value, in order
    pub codes: Vec<char>,
    /// Separator placed between values
    pub separator: String,
}

impl ConcatenatedSpec {
    /// Parse `code:...:separator`
    #[must_use]
    pub fn parse(argument: &str) -> Option<Self> {
        let (codes, separator) = split_codes(argument)?;
        Some(ConcatenatedSpec { codes, separator })
    }
}

impl fmt::Display for ConcatenatedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_codes(f, &self.codes)?;
        write!(f, "{}", self.separator)
    }
}

/// How the codes of an existence predicate are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Every code must be present
    And,
    /// At least one code must be present
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// `subfieldExists[...]` / `subfieldNotExists[...]` predicate body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistsSpec {
    /// Codes tested
    pub codes: Vec<char>,
    /// How the tests combine
    pub combinator: Combinator,
}

impl ExistsSpec {
    /// Parse `code:...:AND|OR`. A missing combinator means `AND`.
    #[must_use]
    pub fn parse(argument: &str) -> Option<Self> {
        let segments: Vec<&str> = argument.split(ARGUMENT_SEPARATOR).collect();
        let (code_segments, combinator) = match segments.last().map(|s| s.trim()) {
            Some(last) if last.eq_ignore_ascii_case("AND") => {
                (&segments[..segments.len() - 1], Combinator::And)
            },
            Some(last) if last.eq_ignore_ascii_case("OR") => {
                (&segments[..segments.len() - 1], Combinator::Or)
            },
            _ => (&segments[..], Combinator::And),
        };
        let codes = code_segments
            .iter()
            .map(|s| single_code(s))
            .collect::<Option<Vec<char>>>()?;
        if codes.is_empty() {
            return None;
        }
        Some(ExistsSpec { codes, combinator })
    }

    /// Evaluate the predicate against a presence test.
    pub fn is_satisfied(&self, present: impl Fn(char) -> bool) -> bool {
        match self.combinator {
            Combinator::And => self.codes.iter().all(|&c| present(c)),
            Combinator::Or => self.codes.iter().any(|&c| present(c)),
        }
    }
}

impl fmt::Display for ExistsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_codes(f, &self.codes)?;
        write!(f, "{}", self.combinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_codes() {
        assert_eq!(split_codes("d:NoDate"), Some((vec!['d'], "NoDate".into())));
        assert_eq!(split_codes("a:b:c"), Some((vec!['a', 'b'], "c".into())));
        assert_eq!(split_codes("a:"), Some((vec!['a'], String::new())));
        assert_eq!(
            split_codes("b:Foo: bar"),
            Some((vec!['b'], "Foo: bar".into()))
        );
        assert_eq!(split_codes("a"), None);
        assert_eq!(split_codes(":x"), None);
    }

    #[test]
    fn test_char_range() {
        let range = CharRange::parse("35-37").unwrap();
        assert_eq!(range, CharRange { start: 35, end: 37 });
        assert_eq!(range.to_string(), "35-37");
        assert_eq!(CharRange::parse("7").unwrap().to_string(), "7");
        assert_eq!(CharRange::parse(" 2 - 4 ").unwrap().start, 2);
        assert!(CharRange::parse("37-35").is_none());
        assert!(CharRange::parse("a-b").is_none());
        assert!(CharRange::parse("-3").is_none());
        assert!(CharRange::parse("").is_none());
    }

    #[test]
    fn test_char_range_extract() {
        let range = CharRange::parse("7-10").unwrap();
        assert_eq!(range.extract("850101s1925    nyu").as_deref(), Some("1925"));
        assert_eq!(range.extract("850101s1925").as_deref(), Some("1925"));
        assert_eq!(range.extract("850101s192"), None);
        assert_eq!(range.extract("850101s19"), None);
        assert_eq!(range.extract("short"), None);
        // character based, not byte based
        assert_eq!(CharRange::parse("1-2").unwrap().extract("äöü").as_deref(), Some("öü"));
        assert_eq!(CharRange::parse("1-2").unwrap().extract("äö"), None);
    }

    #[test]
    fn test_char_range_extract_at_usize_max() {
        let range = CharRange::parse(&format!("0-{}", usize::MAX)).unwrap();
        assert_eq!(range.end, usize::MAX);
        assert_eq!(range.extract("ger"), None);

        let single = CharRange::parse(&usize::MAX.to_string()).unwrap();
        assert_eq!(single.extract("ger"), None);
    }

    #[test]
    fn test_regex_spec_modes() {
        let extract = RegexSpec {
            mode: RegexMode::Extract,
            pattern: Regex::new(r"\d{4}").unwrap(),
        };
        let strict = RegexSpec {
            mode: RegexMode::Strict,
            pattern: Regex::new(r"\d{4}").unwrap(),
        };
        assert_eq!(extract.apply("abc1999xyz").as_deref(), Some("1999"));
        assert_eq!(extract.apply("no-year-here").as_deref(), Some("no-year-here"));
        assert_eq!(strict.apply("abc1999xyz").as_deref(), Some("1999"));
        assert_eq!(strict.apply("no-year-here"), None);
        assert_eq!(strict.apply("1999/2000").as_deref(), Some("19992000"));
    }

    #[test]
    fn test_replace_spec_trims() {
        let spec = ReplaceSpec {
            pattern: Regex::new(r"\[.*?\]").unwrap(),
            replacement: String::new(),
        };
        assert_eq!(spec.apply("Title [electronic resource] "), "Title");
        assert_eq!(spec.to_string(), r"regexReplace[\[.*?\]:]");
    }

    #[test]
    fn test_connected_and_concatenated_parse() {
        let connected = ConnectedSpec::parse("b:4:NoRole").unwrap();
        assert_eq!(connected.codes, vec!['b', '4']);
        assert_eq!(connected.default, "NoRole");
        assert_eq!(connected.to_string(), "b:4:NoRole");

        let concatenated = ConcatenatedSpec::parse("b:c:, ").unwrap();
        assert_eq!(concatenated.codes, vec!['b', 'c']);
        assert_eq!(concatenated.separator, ", ");
        assert_eq!(concatenated.to_string(), "b:c:, ");

        assert!(ConnectedSpec::parse("NoRole").is_none());
    }

    #[test]
    fn test_exists_parse_and_evaluate() {
        let and = ExistsSpec::parse("a:b:AND").unwrap();
        let or = ExistsSpec::parse("a:b:or").unwrap();
        let single = ExistsSpec::parse("x").unwrap();
        assert_eq!(single.combinator, Combinator::And);
        assert_eq!(or.combinator, Combinator::Or);
        assert_eq!(or.to_string(), "a:b:OR");

        let present = |c: char| c == 'a';
        assert!(!and.is_satisfied(present));
        assert!(or.is_satisfied(present));
        assert!(!single.is_satisfied(present));

        assert!(ExistsSpec::parse("AND").is_none());
        assert!(ExistsSpec::parse("ab:AND").is_none());
    }

    #[test]
    fn test_subfield_translation_keeps_misses() {
        let table = TranslationTable::parse("roles", "aut=Author\n");
        let translation = SubfieldTranslation {
            file: "roles".into(),
            table: Arc::new(table),
        };
        assert_eq!(translation.apply("aut"), "Author");
        assert_eq!(translation.apply("edt"), "edt");
    }
}
