//! Field-level validation of client supplied data.
//!
//! Validators are plain functions that return `Ok(())` or the full set of
//! [Violations] they found, so callers can report every problem at once.

use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;

/// The problems found while validating client data, keyed by field name.
///
/// Only the first message recorded for a field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(BTreeMap<&'static str, String>);

impl Violations {
    /// Create a set of violations containing a single `field` and `message`.
    pub fn single(field: &'static str, message: &str) -> Self {
        Self(BTreeMap::from([(field, message.to_owned())]))
    }

    /// The message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether no violations were recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of fields with a violation.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn record(&mut self, field: &'static str, message: &str) {
        self.0
            .entry(field)
            .or_insert_with(|| message.to_owned());
    }
}

impl Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");

        write!(f, "{fields}")
    }
}

/// A single rule: `passed` must be true, otherwise `message` is recorded against `field`.
pub type Check = (bool, &'static str, &'static str);

/// Evaluate `checks` and collect every failure.
///
/// # Errors
/// Returns the [Violations] for all checks that did not pass.
pub fn validate(checks: impl IntoIterator<Item = Check>) -> Result<(), Violations> {
    let violations = checks
        .into_iter()
        .filter(|(passed, _, _)| !passed)
        .fold(Violations::default(), |mut violations, (_, field, message)| {
            violations.record(field, message);
            violations
        });

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
