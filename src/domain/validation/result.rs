use serde::Serialize;
use std::collections::BTreeMap;

use super::value::ValidatedValue;

/// Field name to ordered error messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Outcome of validating one field.
///
/// Produced fresh per call. `is_valid()` is true exactly when there are no errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    valid: bool,
    errors: FieldErrors,
    sanitized_value: Option<ValidatedValue>,
}

impl ValidationResult {
    /// Accepted; `value` is `None` for an absent optional field without default
    pub fn accepted(value: Option<ValidatedValue>) -> Self {
        Self {
            valid: true,
            errors: FieldErrors::new(),
            sanitized_value: value,
        }
    }

    pub fn rejected(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        Self::from_errors(errors)
    }

    /// Rejected with several messages. An empty map yields an accepted, empty result.
    pub fn from_errors(errors: FieldErrors) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            sanitized_value: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn value(&self) -> Option<&ValidatedValue> {
        self.sanitized_value.as_ref()
    }

    pub fn into_value(self) -> Option<ValidatedValue> {
        self.sanitized_value
    }

    /// First message recorded for `field`
    pub fn first_error(&self, field: &str) -> Option<&str> {
        self.errors
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }
}

/// Error accumulator scoped to one logical request.
///
/// Messages for a field are appended, never overwritten. Create one per
/// request, or `clear()` before reusing it.
#[derive(Debug, Default, Clone)]
pub struct ValidationContext {
    errors: FieldErrors,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a result's errors and hand back its value
    pub fn absorb(&mut self, result: ValidationResult) -> Option<ValidatedValue> {
        for (field, messages) in result.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        result.sanitized_value
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }
}
