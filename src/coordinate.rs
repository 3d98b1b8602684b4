//! Field coordinate patterns used by rules.
//!
//! A coordinate names a position in a source record: a tag, two indicators and
//! a subfield code. Each position is either a literal character or the
//! wildcard `*`. Rule text may leave trailing positions out; they are filled
//! with wildcards so every coordinate has the canonical fixed-length form
//! `TTT$II$S`:
//!
//! | token      | canonical  |
//! |------------|------------|
//! | `008`      | `008$**$*` |
//! | `008$*`    | `008$**$*` |
//! | `100$1`    | `100$1*$*` |
//! | `100$**$a` | `100$**$a` |
//! | `311$ab$c` | `311$ab$c` |
//!
//! Tags may carry wildcards per character (`6**` matches every 6XX field).

use std::fmt;

use crate::record::{Controlfield, Datafield};

/// The wildcard character accepted in every coordinate position.
pub const WILDCARD: char = '*';

/// Separator between tag, indicators and subfield code in rule text.
pub const POSITION_SEPARATOR: char = '$';

/// A single source coordinate pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    tag: [char; 3],
    /// First indicator pattern
    pub indicator1: char,
    /// Second indicator pattern
    pub indicator2: char,
    /// Subfield code pattern
    pub subfield: char,
}

fn is_position_char(c: char) -> bool {
    c == WILDCARD || c.is_ascii_alphanumeric()
}

impl Coordinate {
    /// Parse a coordinate token such as `100$**$a`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the token does not have one
    /// of the accepted shapes. The rule compiler wraps it into a
    /// [`CompileError::InvalidCoordinate`](crate::error::CompileError::InvalidCoordinate).
    pub fn parse(token: &str) -> std::result::Result<Self, String> {
        let token = token.trim();
        let parts: Vec<&str> = token.split(POSITION_SEPARATOR).collect();
        if parts.len() > 3 {
            return Err(format!(
                "expected at most 3 '{POSITION_SEPARATOR}'-separated parts, found {}",
                parts.len()
            ));
        }

        let tag_chars: Vec<char> = parts[0].chars().collect();
        if tag_chars.len() != 3 {
            return Err(format!("tag must be 3 characters, got {}", tag_chars.len()));
        }
        if let Some(bad) = tag_chars.iter().find(|c| !is_position_char(**c)) {
            return Err(format!("invalid character '{bad}' in tag"));
        }
        let tag = [tag_chars[0], tag_chars[1], tag_chars[2]];

        let (indicator1, indicator2) = match parts.get(1) {
            None => (WILDCARD, WILDCARD),
            Some(ind) => {
                let chars: Vec<char> = ind.chars().collect();
                match chars.as_slice() {
                    [a] if is_position_char(*a) => (*a, WILDCARD),
                    [a, b] if is_position_char(*a) && is_position_char(*b) => (*a, *b),
                    [] => return Err("empty indicator part".to_string()),
                    [_] | [_, _] => return Err(format!("invalid indicator part '{ind}'")),
                    _ => {
                        return Err(format!(
                            "indicator part must be 1 or 2 characters, got {}",
                            chars.len()
                        ))
                    },
                }
            },
        };

        let subfield = match parts.get(2) {
            None => WILDCARD,
            Some(code) => {
                let chars: Vec<char> = code.chars().collect();
                match chars.as_slice() {
                    [c] if is_position_char(*c) => *c,
                    _ => return Err(format!("subfield code must be 1 character, got '{code}'")),
                }
            },
        };

        Ok(Coordinate {
            tag,
            indicator1,
            indicator2,
            subfield,
        })
    }

    /// The tag pattern as a string
    #[must_use]
    pub fn tag(&self) -> String {
        self.tag.iter().collect()
    }

    /// The tag when it contains no wildcard, used to index rules by tag.
    #[must_use]
    pub fn literal_tag(&self) -> Option<String> {
        if self.tag.contains(&WILDCARD) {
            None
        } else {
            Some(self.tag())
        }
    }

    /// Check whether the tag pattern matches a concrete tag.
    #[must_use]
    pub fn matches_tag(&self, tag: &str) -> bool {
        let mut chars = tag.chars();
        for pattern in self.tag {
            match chars.next() {
                Some(c) if pattern == WILDCARD || pattern == c => {},
                _ => return false,
            }
        }
        chars.next().is_none()
    }

    /// Check whether both indicator patterns match.
    #[must_use]
    pub fn matches_indicators(&self, indicator1: char, indicator2: char) -> bool {
        (self.indicator1 == WILDCARD || self.indicator1 == indicator1)
            && (self.indicator2 == WILDCARD || self.indicator2 == indicator2)
    }

    /// Check whether this coordinate applies to a control field.
    #[must_use]
    pub fn matches_control_field(&self, field: &Controlfield) -> bool {
        self.matches_tag(&field.tag)
    }

    /// Check whether this coordinate applies to a data field (tag and
    /// indicators; subfields are not considered).
    #[must_use]
    pub fn matches_data_field(&self, field: &Datafield) -> bool {
        self.matches_tag(&field.tag) && self.matches_indicators(field.indicator1, field.indicator2)
    }

    /// Check whether this coordinate targets the given subfield code.
    #[must_use]
    pub fn names_subfield(&self, code: char) -> bool {
        self.subfield == WILDCARD || self.subfield == code
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}{}{}",
            self.tag[0],
            self.tag[1],
            self.tag[2],
            POSITION_SEPARATOR,
            self.indicator1,
            self.indicator2,
            POSITION_SEPARATOR,
            self.subfield
        )
    }
}
