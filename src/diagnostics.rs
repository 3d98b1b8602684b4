//! Per-record diagnostics.
//!
//! Resolving a record never fails, but some outcomes are worth knowing about
//! when a rule set is being tuned: a field skipped by an existence predicate,
//! a translation that fell back to its default or was dropped, a strict regex
//! that did not match. Every such event is logged at `debug` level through
//! the `log` facade. When collection is enabled (see
//! [`transform_with_diagnostics`](crate::transform::transform_with_diagnostics))
//! the events are also kept as structured data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened while resolving one field for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// `subfieldExists` / `subfieldNotExists` rejected the field
    SkippedByExistence {
        /// Output field name
        rule: String,
        /// Tag of the skipped field
        tag: String,
    },
    /// No table entry matched and the rule's default was used
    TranslationDefault {
        /// Output field name
        rule: String,
        /// Tag of the source field
        tag: String,
        /// The value that was looked up
        candidate: String,
    },
    /// No table entry matched and there was no default
    TranslationDropped {
        /// Output field name
        rule: String,
        /// Tag of the source field
        tag: String,
        /// The value that was looked up
        candidate: String,
    },
    /// `regexStrict` found no match
    StrictRegexMiss {
        /// Output field name
        rule: String,
        /// Tag of the source field
        tag: String,
        /// Content the pattern was applied to
        content: String,
    },
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkippedByExistence { rule, tag } => {
                write!(f, "rule '{rule}': field {tag} skipped by existence predicate")
            },
            Self::TranslationDefault {
                rule,
                tag,
                candidate,
            } => write!(
                f,
                "rule '{rule}': no translation for '{candidate}' in field {tag}, using default"
            ),
            Self::TranslationDropped {
                rule,
                tag,
                candidate,
            } => write!(
                f,
                "rule '{rule}': no translation for '{candidate}' in field {tag}, value dropped"
            ),
            Self::StrictRegexMiss { rule, tag, content } => {
                write!(f, "rule '{rule}': strict regex did not match '{content}' in field {tag}")
            },
        }
    }
}

/// Sink for [`DiagnosticEvent`]s during one transform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    collect: bool,
    events: Vec<DiagnosticEvent>,
}

impl Diagnostics {
    /// Log events without keeping them
    #[must_use]
    pub fn logging_only() -> Self {
        Diagnostics::default()
    }

    /// Log events and keep them for inspection
    #[must_use]
    pub fn collecting() -> Self {
        Diagnostics {
            collect: true,
            events: Vec::new(),
        }
    }

    /// Report an event.
    pub fn report(&mut self, event: DiagnosticEvent) {
        log::debug!("{event}");
        if self.collect {
            self.events.push(event);
        }
    }

    /// Events collected so far, in the order they happened
    #[must_use]
    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    /// Take ownership of the collected events
    #[must_use]
    pub fn into_events(self) -> Vec<DiagnosticEvent> {
        self.events
    }

    /// True when nothing was collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> DiagnosticEvent {
        DiagnosticEvent::SkippedByExistence {
            rule: "topic".into(),
            tag: "650".into(),
        }
    }

    #[test]
    fn test_logging_only_keeps_nothing() {
        let mut diagnostics = Diagnostics::logging_only();
        diagnostics.report(event());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_collecting_keeps_order() {
        let mut diagnostics = Diagnostics::collecting();
        diagnostics.report(event());
        diagnostics.report(DiagnosticEvent::StrictRegexMiss {
            rule: "year".into(),
            tag: "008".into(),
            content: "no-year-here".into(),
        });
        assert_eq!(diagnostics.events().len(), 2);
        assert_eq!(diagnostics.events()[0], event());
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let json = serde_json::to_string(&event()).unwrap();
        assert_eq!(json, r#"{"kind":"skipped_by_existence","rule":"topic","tag":"650"}"#);
        assert_eq!(
            event().to_string(),
            "rule 'topic': field 650 skipped by existence predicate"
        );
    }
}
