//! Rule compilation.
//!
//! A rule file maps source coordinates to named output fields, one rule per
//! line:
//!
//! ```text
//! # output field: coordinates and modifiers
//! title: 245$**$a, 245$**$b, concatenatedSubfields[b: : ], applyToFields[245$**$a]
//! author: 100$**$a, 700$**$a, multiValued, connectedSubfields[4:NoRole][0:NoGndId], allowDuplicates
//! language: 008, translateValue[language.properties, 35-37], defaultValue[Unknown]
//! year: 008$*, regexStrict[\d{4}]
//! source: customText, Union Catalogue
//! ```
//!
//! Tokens are separated by commas at bracket depth 0, so bracketed arguments
//! may contain commas. A line ending in `\` continues on the next line. Blank
//! lines and lines starting with `#` are ignored.
//!
//! [`RuleCompiler::compile`] turns the text into an immutable
//! [`CompiledRuleSet`]. Any problem is a [`CompileError`]; nothing is
//! compiled partially.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::brackets::{bracket_groups, split_top_level, BracketError};
use crate::config::CompilerConfig;
use crate::coordinate::Coordinate;
use crate::error::{CompileError, CompileResult, Result};
use crate::matcher::RuleIndex;
use crate::modifier::{
    CharRange, ConcatenatedSpec, ConnectedSpec, ExistsSpec, RegexMode, RegexSpec, ReplaceSpec,
    SubfieldTranslation, TranslateMode, TranslateSpec, TranslationLookup, ARGUMENT_SEPARATOR,
};
use crate::record::{Controlfield, Datafield};
use crate::translation::{DirectorySource, RegexTable, TranslationSource, TranslationTable};

/// Separator between tokens of a rule line.
pub const TOKEN_SEPARATOR: char = ',';

/// Separator between the output field name and the tokens.
pub const NAME_SEPARATOR: char = ':';

/// One compiled rule: everything needed to produce one output field.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Output field name
    pub name: String,
    /// Source coordinates, in declaration order
    pub coordinates: Vec<Coordinate>,
    /// Literal values of a `customText` rule
    pub custom_text: Option<Vec<String>>,
    /// `multiValued` as declared
    pub multi_valued: bool,
    /// `allowDuplicates`
    pub allow_duplicates: bool,
    /// `translateValue*`
    pub translate: Option<TranslateSpec>,
    /// `defaultValue` used when a translation finds nothing
    pub default_value: Option<String>,
    /// `regex` / `regexStrict`
    pub regex: Option<RegexSpec>,
    /// `regexReplace`
    pub replace: Option<ReplaceSpec>,
    /// `connectedSubfields`, one entry per bracket group
    pub connected: Vec<ConnectedSpec>,
    /// `translateConnectedSubfields`
    pub connected_translation: Option<SubfieldTranslation>,
    /// `concatenatedSubfields`
    pub concatenated: Option<ConcatenatedSpec>,
    /// `translateConcatenatedSubfields`
    pub concatenated_translation: Option<SubfieldTranslation>,
    /// `subfieldExists`
    pub exists: Option<ExistsSpec>,
    /// `subfieldNotExists`
    pub not_exists: Option<ExistsSpec>,
    /// `applyToFields`
    pub apply_to: Vec<Coordinate>,
}

/// The single value-shaping path a rule takes, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePath {
    /// Table translation (with optional range/regex extraction)
    Translate,
    /// `regex` or `regexStrict`
    Regex,
    /// `regexReplace`
    Replace,
    /// `connectedSubfields`
    Connected,
    /// `concatenatedSubfields`
    Concatenated,
    /// The content as is
    Plain,
}

impl Rule {
    fn new(name: String) -> Self {
        Rule {
            name,
            coordinates: Vec::new(),
            custom_text: None,
            multi_valued: false,
            allow_duplicates: false,
            translate: None,
            default_value: None,
            regex: None,
            replace: None,
            connected: Vec::new(),
            connected_translation: None,
            concatenated: None,
            concatenated_translation: None,
            exists: None,
            not_exists: None,
            apply_to: Vec::new(),
        }
    }

    /// Whether the output field keeps more than one value.
    ///
    /// Connected rules always do: the main value and its connected values
    /// belong together.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued || !self.connected.is_empty()
    }

    /// Whether repeated values are kept.
    ///
    /// Connected rules always keep them, so every main value stays paired
    /// with its connected values.
    #[must_use]
    pub fn allows_duplicates(&self) -> bool {
        self.allow_duplicates || !self.connected.is_empty()
    }

    /// True for `customText` rules, which never match source fields.
    #[must_use]
    pub fn is_custom_text(&self) -> bool {
        self.custom_text.is_some()
    }

    /// The value-shaping path this rule takes.
    #[must_use]
    pub fn value_path(&self) -> ValuePath {
        if self.translate.is_some() {
            ValuePath::Translate
        } else if self.regex.is_some() {
            ValuePath::Regex
        } else if self.replace.is_some() {
            ValuePath::Replace
        } else if !self.connected.is_empty() {
            ValuePath::Connected
        } else if self.concatenated.is_some() {
            ValuePath::Concatenated
        } else {
            ValuePath::Plain
        }
    }

    /// Check whether any coordinate applies to a control field.
    #[must_use]
    pub fn matches_control_field(&self, field: &Controlfield) -> bool {
        self.coordinates
            .iter()
            .any(|c| c.matches_control_field(field))
    }

    /// Check whether any coordinate applies to a data field.
    #[must_use]
    pub fn matches_data_field(&self, field: &Datafield) -> bool {
        self.coordinates.iter().any(|c| c.matches_data_field(field))
    }

    /// Coordinates that apply to `field`
    pub fn coordinates_for<'a>(
        &'a self,
        field: &'a Datafield,
    ) -> impl Iterator<Item = &'a Coordinate> + 'a {
        self.coordinates
            .iter()
            .filter(move |c| c.matches_data_field(field))
    }

    /// Whether concatenation is applied to `field` (always, unless
    /// `applyToFields` restricts it).
    #[must_use]
    pub fn concatenates(&self, field: &Datafield) -> bool {
        self.concatenated.is_some()
            && (self.apply_to.is_empty() || self.apply_to.iter().any(|c| c.matches_data_field(field)))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<String> = Vec::new();
        if let Some(texts) = &self.custom_text {
            tokens.push("customText".to_string());
            tokens.extend(texts.iter().cloned());
        }
        tokens.extend(self.coordinates.iter().map(ToString::to_string));
        if self.multi_valued {
            tokens.push("multiValued".to_string());
        }
        if self.allow_duplicates {
            tokens.push("allowDuplicates".to_string());
        }
        if let Some(translate) = &self.translate {
            tokens.push(translate.to_string());
        }
        if let Some(default) = &self.default_value {
            tokens.push(format!("defaultValue[{default}]"));
        }
        if let Some(regex) = &self.regex {
            tokens.push(regex.to_string());
        }
        if let Some(replace) = &self.replace {
            tokens.push(replace.to_string());
        }
        if !self.connected.is_empty() {
            let groups: String = self.connected.iter().map(|c| format!("[{c}]")).collect();
            tokens.push(format!("connectedSubfields{groups}"));
        }
        if let Some(translation) = &self.connected_translation {
            tokens.push(format!("translateConnectedSubfields[{}]", translation.file));
        }
        if let Some(concatenated) = &self.concatenated {
            tokens.push(format!("concatenatedSubfields[{concatenated}]"));
        }
        if let Some(translation) = &self.concatenated_translation {
            tokens.push(format!("translateConcatenatedSubfields[{}]", translation.file));
        }
        if let Some(exists) = &self.exists {
            tokens.push(format!("subfieldExists[{exists}]"));
        }
        if let Some(not_exists) = &self.not_exists {
            tokens.push(format!("subfieldNotExists[{not_exists}]"));
        }
        if !self.apply_to.is_empty() {
            let coordinates: Vec<String> = self.apply_to.iter().map(ToString::to_string).collect();
            tokens.push(format!("applyToFields[{}]", coordinates.join(", ")));
        }
        write!(f, "{}{NAME_SEPARATOR} {}", self.name, tokens.join(", "))
    }
}

/// An immutable, compiled rule set.
///
/// Holds the rules in declaration order plus the tag index used by the
/// matcher. It is `Send + Sync` and can be shared across threads by
/// reference or through an `Arc`.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    rules: Vec<Rule>,
    index: RuleIndex,
}

impl CompiledRuleSet {
    /// Build a rule set from already compiled rules.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        let index = RuleIndex::build(&rules);
        CompiledRuleSet { rules, index }
    }

    /// All rules in declaration order
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Find a rule by output field name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when there are no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The tag index used for matching
    #[must_use]
    pub fn index(&self) -> &RuleIndex {
        &self.index
    }

    /// `customText` rules in declaration order
    pub fn custom_text_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_custom_text())
    }
}

impl fmt::Display for CompiledRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

/// Compiles rule text against a source of translation tables.
///
/// # Examples
///
/// ```
/// use marcmap::{InMemorySource, RuleCompiler};
///
/// let tables = InMemorySource::new().with_table("lang.properties", "ger=German\n");
/// let compiler = RuleCompiler::new(tables);
/// let rules = compiler
///     .compile("language: 041$**$a, translateValue[lang.properties], multiValued")
///     .unwrap();
/// assert_eq!(rules.len(), 1);
/// assert!(rules.get("language").unwrap().is_multi_valued());
/// ```
#[derive(Debug)]
pub struct RuleCompiler<S> {
    source: S,
}

impl RuleCompiler<DirectorySource> {
    /// Create a compiler that loads translation files from the configured
    /// directory.
    #[must_use]
    pub fn from_config(config: &CompilerConfig) -> Self {
        RuleCompiler::new(DirectorySource::new(config.translation_dir.clone()))
    }
}

impl<S: TranslationSource> RuleCompiler<S> {
    /// Create a compiler over the given translation source
    #[must_use]
    pub fn new(source: S) -> Self {
        RuleCompiler { source }
    }

    /// Compile rule text.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] for the first problem found.
    pub fn compile(&self, text: &str) -> CompileResult<CompiledRuleSet> {
        let mut tables = TableCache::new(&self.source);
        let mut names = HashSet::new();
        let mut rules = Vec::new();

        for (line_number, line) in logical_lines(text) {
            let rule = parse_rule_line(line_number, &line, &mut tables)?;
            if !names.insert(rule.name.clone()) {
                return Err(CompileError::DuplicateField(rule.name));
            }
            rules.push(rule);
        }

        log::debug!(
            "compiled {} rules using {} translation tables",
            rules.len(),
            tables.len()
        );
        Ok(CompiledRuleSet::new(rules))
    }

    /// Read and compile a rule file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or the compile error.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledRuleSet> {
        let text = fs::read_to_string(path)?;
        Ok(self.compile(&text)?)
    }
}

/// Loads each translation file once per compilation and shares it.
struct TableCache<'a> {
    source: &'a dyn TranslationSource,
    tables: HashMap<String, Arc<TranslationTable>>,
    regex_tables: HashMap<String, Arc<RegexTable>>,
}

impl<'a> TableCache<'a> {
    fn new(source: &'a dyn TranslationSource) -> Self {
        TableCache {
            source,
            tables: HashMap::new(),
            regex_tables: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.tables.len()
    }

    fn table(&mut self, field: &str, file: &str) -> CompileResult<Arc<TranslationTable>> {
        if let Some(table) = self.tables.get(file) {
            return Ok(Arc::clone(table));
        }
        let table = self
            .source
            .load(file)
            .map_err(|e| CompileError::MissingTranslationFile {
                field: field.to_string(),
                file: file.to_string(),
                message: e.to_string(),
            })?;
        let table = Arc::new(table);
        self.tables.insert(file.to_string(), Arc::clone(&table));
        Ok(table)
    }

    fn regex_table(&mut self, field: &str, file: &str) -> CompileResult<Arc<RegexTable>> {
        if let Some(table) = self.regex_tables.get(file) {
            return Ok(Arc::clone(table));
        }
        let table = self.table(field, file)?;
        let compiled = Arc::new(RegexTable::compile(&table)?);
        self.regex_tables
            .insert(file.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }
}

/// Join continuation lines and drop blanks and comments. Yields the 1-based
/// line number where each logical line starts.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if pending.is_none() && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }
        let (continues, content) = match trimmed.strip_suffix('\\') {
            Some(head) => (true, head),
            None => (false, trimmed),
        };
        let (start, mut line) = pending.take().unwrap_or((idx + 1, String::new()));
        if !line.is_empty() && !content.is_empty() {
            line.push(' ');
        }
        line.push_str(content);
        if continues {
            pending = Some((start, line));
        } else {
            lines.push((start, line));
        }
    }
    if let Some(last) = pending {
        lines.push(last);
    }
    lines
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '[' | ']' | ',' | '$'))
}

/// Tokens that look like a misspelt modifier rather than a coordinate.
fn looks_like_keyword(token: &str) -> bool {
    token.len() > 3 && token.chars().all(|c| c.is_ascii_alphabetic())
}

fn parse_rule_line(
    line_number: usize,
    line: &str,
    tables: &mut TableCache<'_>,
) -> CompileResult<Rule> {
    let Some((name, rest)) = line.split_once(NAME_SEPARATOR) else {
        return Err(CompileError::InvalidLine {
            line: line_number,
            message: format!("expected '<field>{NAME_SEPARATOR} <tokens>'"),
        });
    };
    let name = name.trim();
    if !is_valid_name(name) {
        return Err(CompileError::InvalidLine {
            line: line_number,
            message: format!("invalid output field name '{name}'"),
        });
    }

    let tokens = split_top_level(rest, TOKEN_SEPARATOR).map_err(|_| {
        CompileError::UnbalancedBrackets {
            field: name.to_string(),
            token: rest.trim().to_string(),
        }
    })?;

    let mut parser = RuleParser {
        rule: Rule::new(name.to_string()),
        custom_text: tokens.iter().any(|t| t == "customText"),
        texts: Vec::new(),
    };
    for token in &tokens {
        parser.token(token, tables)?;
    }
    parser.finish()
}

struct RuleParser {
    rule: Rule,
    custom_text: bool,
    texts: Vec<String>,
}

impl RuleParser {
    fn field(&self) -> String {
        self.rule.name.clone()
    }

    fn token(&mut self, token: &str, tables: &mut TableCache<'_>) -> CompileResult<()> {
        let (keyword, groups) = bracket_groups(token).map_err(|e| match e {
            BracketError::Unbalanced => CompileError::UnbalancedBrackets {
                field: self.field(),
                token: token.to_string(),
            },
            BracketError::StrayText(_) => CompileError::UnknownModifier {
                field: self.field(),
                token: token.to_string(),
            },
        })?;

        match keyword {
            "multiValued" => {
                self.no_argument(keyword, &groups)?;
                self.rule.multi_valued = true;
            },
            "allowDuplicates" => {
                self.no_argument(keyword, &groups)?;
                self.rule.allow_duplicates = true;
            },
            "customText" => self.no_argument(keyword, &groups)?,
            "translateValue" => self.translate(TranslateMode::Exact, &groups, tables)?,
            "translateValueContains" => self.translate(TranslateMode::Contains, &groups, tables)?,
            "translateValueRegex" => self.translate(TranslateMode::Regex, &groups, tables)?,
            "defaultValue" => {
                let value = self.single_argument(keyword, &groups)?.to_string();
                self.set_once(keyword, |r| &mut r.default_value, value)?;
            },
            "regex" | "regexStrict" => {
                let mode = if keyword == "regex" {
                    RegexMode::Extract
                } else {
                    RegexMode::Strict
                };
                let pattern = self.compile_regex(self.single_argument(keyword, &groups)?)?;
                if self.rule.regex.is_some() {
                    return Err(self.unsupported("only one of regex/regexStrict may be given"));
                }
                self.rule.regex = Some(RegexSpec { mode, pattern });
            },
            "regexReplace" => {
                let argument = self.single_argument(keyword, &groups)?;
                let Some((pattern, replacement)) = argument.rsplit_once(ARGUMENT_SEPARATOR) else {
                    return Err(self.invalid_argument("regexReplace", "expected pattern:replacement"));
                };
                let spec = ReplaceSpec {
                    pattern: self.compile_regex(pattern)?,
                    replacement: replacement.to_string(),
                };
                self.set_once(keyword, |r| &mut r.replace, spec)?;
            },
            "connectedSubfields" => {
                if groups.is_empty() {
                    return Err(self.invalid_argument("connectedSubfields", "missing argument"));
                }
                for group in &groups {
                    let spec = ConnectedSpec::parse(group).ok_or_else(|| {
                        self.invalid_argument(
                            "connectedSubfields",
                            &format!("expected code:...:default, got '{group}'"),
                        )
                    })?;
                    self.rule.connected.push(spec);
                }
            },
            "concatenatedSubfields" => {
                let argument = self.single_argument(keyword, &groups)?;
                let spec = ConcatenatedSpec::parse(argument).ok_or_else(|| {
                    self.invalid_argument(
                        "concatenatedSubfields",
                        &format!("expected code:...:separator, got '{argument}'"),
                    )
                })?;
                self.set_once(keyword, |r| &mut r.concatenated, spec)?;
            },
            "subfieldExists" | "subfieldNotExists" => {
                let argument = self.single_argument(keyword, &groups)?;
                let spec = ExistsSpec::parse(argument).ok_or_else(|| {
                    self.invalid_argument(
                        "subfieldExists",
                        &format!("expected code:...:AND|OR, got '{argument}'"),
                    )
                })?;
                if keyword == "subfieldExists" {
                    self.set_once(keyword, |r| &mut r.exists, spec)?;
                } else {
                    self.set_once(keyword, |r| &mut r.not_exists, spec)?;
                }
            },
            "applyToFields" => {
                let argument = self.single_argument(keyword, &groups)?.to_string();
                let pieces = split_top_level(&argument, TOKEN_SEPARATOR).map_err(|_| {
                    CompileError::UnbalancedBrackets {
                        field: self.field(),
                        token: token.to_string(),
                    }
                })?;
                if pieces.is_empty() {
                    return Err(self.invalid_argument("applyToFields", "no coordinates given"));
                }
                for piece in pieces {
                    let coordinate = self.coordinate(&piece)?;
                    self.rule.apply_to.push(coordinate);
                }
            },
            "translateConnectedSubfields" | "translateConcatenatedSubfields" => {
                let file = self.single_argument(keyword, &groups)?.trim().to_string();
                let table = tables.table(&self.rule.name, &file)?;
                let translation = SubfieldTranslation { file, table };
                if keyword == "translateConnectedSubfields" {
                    self.set_once(keyword, |r| &mut r.connected_translation, translation)?;
                } else {
                    self.set_once(keyword, |r| &mut r.concatenated_translation, translation)?;
                }
            },
            _ if !groups.is_empty() || (looks_like_keyword(token) && !self.custom_text) => {
                return Err(CompileError::UnknownModifier {
                    field: self.field(),
                    token: token.to_string(),
                });
            },
            _ if self.custom_text => self.texts.push(token.to_string()),
            _ => {
                let coordinate = self.coordinate(token)?;
                self.rule.coordinates.push(coordinate);
            },
        }
        Ok(())
    }

    fn translate(
        &mut self,
        mode: TranslateMode,
        groups: &[String],
        tables: &mut TableCache<'_>,
    ) -> CompileResult<()> {
        if self.rule.translate.is_some() {
            return Err(self.unsupported("only one translateValue modifier may be given"));
        }
        let argument = self.single_argument(mode.keyword(), groups)?;
        let parts = split_top_level(argument, TOKEN_SEPARATOR).map_err(|_| {
            CompileError::UnbalancedBrackets {
                field: self.field(),
                token: argument.to_string(),
            }
        })?;
        let (file, range) = match parts.as_slice() {
            [file] => (file.clone(), None),
            [file, range] => {
                let parsed = CharRange::parse(range).ok_or_else(|| CompileError::InvalidRange {
                    field: self.field(),
                    range: range.clone(),
                })?;
                (file.clone(), Some(parsed))
            },
            _ => {
                return Err(self.invalid_argument(mode.keyword(), "expected file or file, range"));
            },
        };
        let lookup = match mode {
            TranslateMode::Regex => {
                TranslationLookup::Regex(tables.regex_table(&self.rule.name, &file)?)
            },
            TranslateMode::Exact | TranslateMode::Contains => {
                TranslationLookup::Table(tables.table(&self.rule.name, &file)?)
            },
        };
        self.rule.translate = Some(TranslateSpec {
            mode,
            file,
            range,
            lookup,
        });
        Ok(())
    }

    fn coordinate(&self, token: &str) -> CompileResult<Coordinate> {
        Coordinate::parse(token).map_err(|message| CompileError::InvalidCoordinate {
            field: self.field(),
            token: token.to_string(),
            message,
        })
    }

    fn compile_regex(&self, pattern: &str) -> CompileResult<Regex> {
        Regex::new(pattern).map_err(|e| CompileError::InvalidRegex {
            field: self.field(),
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
    }

    fn no_argument(&self, keyword: &str, groups: &[String]) -> CompileResult<()> {
        if groups.is_empty() {
            Ok(())
        } else {
            Err(self.invalid_argument(keyword, "takes no argument"))
        }
    }

    fn single_argument<'g>(&self, keyword: &str, groups: &'g [String]) -> CompileResult<&'g str> {
        match groups {
            [argument] => Ok(argument.as_str()),
            [] => Err(self.invalid_argument(keyword, "missing argument")),
            _ => Err(self.invalid_argument(keyword, "expects exactly one argument")),
        }
    }

    fn set_once<T>(
        &mut self,
        keyword: &str,
        slot: impl FnOnce(&mut Rule) -> &mut Option<T>,
        value: T,
    ) -> CompileResult<()> {
        let field = self.field();
        let slot = slot(&mut self.rule);
        if slot.is_some() {
            return Err(CompileError::UnsupportedCombination {
                field,
                message: format!("{keyword} given more than once"),
            });
        }
        *slot = Some(value);
        Ok(())
    }

    fn invalid_argument(&self, modifier: &str, message: &str) -> CompileError {
        CompileError::InvalidArgument {
            field: self.field(),
            modifier: modifier.to_string(),
            message: message.to_string(),
        }
    }

    fn unsupported(&self, message: &str) -> CompileError {
        CompileError::UnsupportedCombination {
            field: self.field(),
            message: message.to_string(),
        }
    }

    /// Reject modifier combinations the resolver has no defined behaviour for.
    fn finish(mut self) -> CompileResult<Rule> {
        let rule = &self.rule;
        let translate = rule.translate.is_some();
        let regex = rule.regex.is_some();
        let replace = rule.replace.is_some();
        let connected = !rule.connected.is_empty();
        let concatenated = rule.concatenated.is_some();

        if self.custom_text {
            let shaped = translate
                || regex
                || replace
                || connected
                || concatenated
                || rule.default_value.is_some()
                || rule.exists.is_some()
                || rule.not_exists.is_some()
                || !rule.apply_to.is_empty();
            if shaped {
                return Err(self.unsupported("customText cannot be combined with value modifiers"));
            }
            if self.texts.is_empty() {
                return Err(CompileError::NoCoordinates(self.field()));
            }
            self.rule.custom_text = Some(std::mem::take(&mut self.texts));
            return Ok(self.rule);
        }

        if rule.coordinates.is_empty() {
            return Err(CompileError::NoCoordinates(self.field()));
        }
        let conflict = if translate && (connected || concatenated) {
            Some("translateValue cannot be combined with connected or concatenated subfields")
        } else if translate && replace {
            Some("translateValue cannot be combined with regexReplace")
        } else if regex && replace {
            Some("regex/regexStrict cannot be combined with regexReplace")
        } else if (regex || replace) && (connected || concatenated) {
            Some("regex modifiers cannot be combined with connected or concatenated subfields")
        } else if connected && concatenated {
            Some("connectedSubfields cannot be combined with concatenatedSubfields")
        } else if !rule.apply_to.is_empty() && !concatenated {
            Some("applyToFields requires concatenatedSubfields")
        } else if rule.default_value.is_some() && !translate {
            Some("defaultValue requires a translateValue modifier")
        } else if rule.connected_translation.is_some() && !connected {
            Some("translateConnectedSubfields requires connectedSubfields")
        } else if rule.concatenated_translation.is_some() && !concatenated {
            Some("translateConcatenatedSubfields requires concatenatedSubfields")
        } else {
            None
        };
        if let Some(message) = conflict {
            return Err(self.unsupported(message));
        }
        Ok(self.rule)
    }
}
