//! Depth-aware splitting of rule lines and bracketed modifier arguments.
//!
//! Modifier arguments may themselves contain the list separator (`,`), the
//! argument separator (`:`) and even brackets (regex character classes), so
//! plain `split` calls are not enough. Both helpers here scan character by
//! character with a depth counter; only depth-0 commas split tokens and only
//! depth-1 brackets open or close an argument group. A backslash escapes the
//! following bracket so that `regex[\[]` is a single group.

use thiserror::Error;

/// Problems found while scanning brackets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BracketError {
    /// A closing bracket without an opening one, or an unclosed group.
    #[error("unbalanced brackets")]
    Unbalanced,
    /// Text between or after bracket groups, e.g. `name[a]junk`.
    #[error("unexpected text '{0}' outside brackets")]
    StrayText(String),
}

/// Split `text` on `separator` wherever the bracket depth is zero.
///
/// Each piece is trimmed; empty pieces are dropped.
///
/// # Errors
///
/// Returns [`BracketError::Unbalanced`] if brackets do not balance.
pub fn split_top_level(text: &str, separator: char) -> Result<Vec<String>, BracketError> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;
    let mut escaped = false;

    for c in text.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                current.push(c);
            },
            '[' => {
                depth += 1;
                current.push(c);
            },
            ']' => {
                depth = depth.checked_sub(1).ok_or(BracketError::Unbalanced)?;
                current.push(c);
            },
            c if c == separator && depth == 0 => {
                push_trimmed(&mut pieces, &current);
                current.clear();
            },
            _ => current.push(c),
        }
    }

    if depth != 0 {
        return Err(BracketError::Unbalanced);
    }
    push_trimmed(&mut pieces, &current);
    Ok(pieces)
}

fn push_trimmed(pieces: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
}

/// Split a modifier token into its name and its top-level bracket groups.
///
/// ```
/// use marcmap::brackets::bracket_groups;
///
/// let (name, groups) = bracket_groups("connectedSubfields[b:4:NoRole][9:NoGndId]").unwrap();
/// assert_eq!(name, "connectedSubfields");
/// assert_eq!(groups, vec!["b:4:NoRole", "9:NoGndId"]);
/// ```
///
/// # Errors
///
/// Returns [`BracketError::Unbalanced`] if brackets do not balance and
/// [`BracketError::StrayText`] if anything but whitespace appears between or
/// after the groups.
pub fn bracket_groups(token: &str) -> Result<(&str, Vec<String>), BracketError> {
    let token = token.trim();
    let Some(open) = token.find('[') else {
        if token.contains(']') {
            return Err(BracketError::Unbalanced);
        }
        return Ok((token, Vec::new()));
    };

    let name = token[..open].trim_end();
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut outside = String::new();
    let mut depth: usize = 0;
    let mut escaped = false;

    for c in token[open..].chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if depth > 0 => {
                escaped = true;
                current.push(c);
            },
            '[' => {
                depth += 1;
                if depth == 1 {
                    if !outside.trim().is_empty() {
                        return Err(BracketError::StrayText(outside.trim().to_string()));
                    }
                    outside.clear();
                } else {
                    current.push(c);
                }
            },
            ']' => {
                depth = depth.checked_sub(1).ok_or(BracketError::Unbalanced)?;
                if depth == 0 {
                    groups.push(std::mem::take(&mut current));
                } else {
                    current.push(c);
                }
            },
            _ if depth == 0 => outside.push(c),
            _ => current.push(c),
        }
    }

    if depth != 0 {
        return Err(BracketError::Unbalanced);
    }
    if !outside.trim().is_empty() {
        return Err(BracketError::StrayText(outside.trim().to_string()));
    }
    Ok((name, groups))
}
