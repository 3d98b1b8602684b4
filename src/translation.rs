//! Translation tables referenced by `translate*` modifiers.
//!
//! A translation table is a simple `key=value` file in Java-properties style:
//!
//! ```text
//! # language codes
//! ger=German
//! eng=English
//! ! also a comment
//! fre : French
//! ```
//!
//! Entries keep file order, which matters for the contains and regex lookups
//! where the first matching key wins. Tables are loaded through a
//! [`TranslationSource`], either a directory on disk ([`DirectorySource`]) or
//! an in-memory map ([`InMemorySource`]).

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;

use crate::error::CompileError;

/// Separator between a tag restriction and the pattern in regex-table keys,
/// e.g. `100|^Smith`.
pub const COMPOUND_KEY_SEPARATOR: char = '|';

/// An ordered `key -> value` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    name: String,
    entries: IndexMap<String, String>,
}

impl TranslationTable {
    /// Create an empty table
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        TranslationTable {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    /// Parse properties-style text into a table.
    ///
    /// Later duplicates of a key replace the value but keep the key's
    /// original position.
    #[must_use]
    pub fn parse(name: impl Into<String>, text: &str) -> Self {
        let mut table = TranslationTable::new(name);
        for line in text.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = split_property(line);
            if key.is_empty() {
                continue;
            }
            table.insert(key, value);
        }
        table
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Name the table was loaded under (usually its file name)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// First entry (in table order) whose key occurs inside `candidate`.
    #[must_use]
    pub fn find_contained(&self, candidate: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| candidate.contains(key.as_str()))
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over entries in table order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a properties line at the first unescaped `=` or `:` and unescape
/// both halves.
fn split_property(line: &str) -> (String, String) {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                let key = unescape(line[..idx].trim());
                let value = unescape(line[idx + 1..].trim());
                return (key, value);
            },
            _ => {},
        }
    }
    (unescape(line.trim()), String::new())
}

/// Resolve `\=`, `\:`, `\ `, `\\`, `\t` and `\n`. Any other escape is kept
/// verbatim so regex-table keys like `\d{4}` survive.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(e @ ('=' | ':' | ' ' | '\\')) => out.push(e),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            },
            None => out.push('\\'),
        }
    }
    out
}

/// A table whose keys are regular expressions, compiled once.
///
/// Keys of the form `TAG|pattern` only apply to fields with that tag.
#[derive(Debug, Clone)]
pub struct RegexTable {
    name: String,
    entries: Vec<RegexEntry>,
}

#[derive(Debug, Clone)]
struct RegexEntry {
    tag: Option<String>,
    pattern: Regex,
    value: String,
}

impl RegexTable {
    /// Compile every key of `table` as a regex.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidRegex`] naming the table when a key is
    /// not a valid pattern.
    pub fn compile(table: &TranslationTable) -> Result<Self, CompileError> {
        let mut entries = Vec::with_capacity(table.len());
        for (key, value) in table.iter() {
            let (tag, pattern) = split_compound_key(key);
            let regex = Regex::new(pattern).map_err(|e| CompileError::InvalidRegex {
                field: table.name().to_string(),
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            entries.push(RegexEntry {
                tag: tag.map(str::to_string),
                pattern: regex,
                value: value.to_string(),
            });
        }
        Ok(RegexTable {
            name: table.name().to_string(),
            entries,
        })
    }

    /// Name of the underlying table
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First entry (in table order) whose pattern matches `candidate` and
    /// whose tag restriction, if any, equals `tag`.
    #[must_use]
    pub fn find(&self, tag: &str, candidate: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.tag.as_deref().map_or(true, |t| t == tag))
            .find(|entry| entry.pattern.is_match(candidate))
            .map(|entry| entry.value.as_str())
    }
}

/// `100|^abc` → (`Some("100")`, `^abc`). Only a three-character prefix counts
/// as a tag so patterns using alternation (`a|b`) are left alone.
fn split_compound_key(key: &str) -> (Option<&str>, &str) {
    match key.split_once(COMPOUND_KEY_SEPARATOR) {
        Some((tag, pattern))
            if tag.chars().count() == 3 && tag.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (Some(tag), pattern)
        },
        _ => (None, key),
    }
}

/// Provider of translation tables by file name.
pub trait TranslationSource: fmt::Debug + Send + Sync {
    /// Load the table stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the table does not exist or cannot be read.
    fn load(&self, name: &str) -> io::Result<TranslationTable>;
}

/// Loads tables from files in a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Create a source rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySource { dir: dir.into() }
    }

    /// The directory tables are resolved against
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TranslationSource for DirectorySource {
    fn load(&self, name: &str) -> io::Result<TranslationTable> {
        let text = fs::read_to_string(self.dir.join(name))?;
        Ok(TranslationTable::parse(name, &text))
    }
}

/// Tables held in memory, keyed by the file name rules refer to.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: IndexMap<String, TranslationTable>,
}

impl InMemorySource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table parsed from properties text
    #[must_use]
    pub fn with_table(mut self, name: &str, text: &str) -> Self {
        self.insert(name, text);
        self
    }

    /// Register a table parsed from properties text
    pub fn insert(&mut self, name: &str, text: &str) {
        self.tables
            .insert(name.to_string(), TranslationTable::parse(name, text));
    }
}

impl TranslationSource for InMemorySource {
    fn load(&self, name: &str) -> io::Result<TranslationTable> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no table named '{name}'"))
            })
    }
}
