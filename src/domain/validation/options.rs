use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::HashMap;

use super::value::ValidatedValue;
use crate::domain::upload::UploadStatus;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_PHONE_MIN_DIGITS: usize = 10;
pub const DEFAULT_PHONE_MAX_DIGITS: usize = 11;

pub const DEFAULT_TRUE_TOKENS: &[&str] = &["true", "1", "yes", "y", "on"];
pub const DEFAULT_FALSE_TOKENS: &[&str] = &["false", "0", "no", "n", "off"];

/// Per-field validation knobs.
///
/// Every option is optional; a knob that does not apply to the declared type
/// is ignored. Build with struct update syntax:
///
/// ```
/// use modelgate::domain::validation::ValidationOptions;
///
/// let options = ValidationOptions {
///     required: true,
///     max_length: Some(120),
///     ..Default::default()
/// };
/// assert!(options.sanitize);
/// ```
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub required: bool,
    /// Returned when the value is absent and not required
    pub default: Option<ValidatedValue>,
    /// Run the XSS sanitizer over accepted strings. Must be `false` for values
    /// bound into parameterized queries.
    pub sanitize: bool,

    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,

    pub min: Option<f64>,
    pub max: Option<f64>,

    pub allowed_domains: Option<Vec<String>>,
    pub blocked_domains: Option<Vec<String>>,
    pub protocols: Option<Vec<String>>,

    /// chrono format string for `date`/`datetime`
    pub format: Option<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub min_datetime: Option<NaiveDateTime>,
    pub max_datetime: Option<NaiveDateTime>,

    pub true_values: Option<Vec<String>>,
    pub false_values: Option<Vec<String>>,

    pub allowed_values: Option<Vec<String>>,

    pub delimiter: Option<String>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,

    pub max_size: Option<u64>,
    pub allowed_extensions: Option<Vec<String>>,
    pub allowed_mime_types: Option<Vec<String>>,

    pub messages: MessageOverrides,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            required: false,
            default: None,
            sanitize: true,
            min_length: None,
            max_length: None,
            pattern: None,
            min: None,
            max: None,
            allowed_domains: None,
            blocked_domains: None,
            protocols: None,
            format: None,
            min_date: None,
            max_date: None,
            min_datetime: None,
            max_datetime: None,
            true_values: None,
            false_values: None,
            allowed_values: None,
            delimiter: None,
            min_items: None,
            max_items: None,
            max_size: None,
            allowed_extensions: None,
            allowed_mime_types: None,
            messages: MessageOverrides::default(),
        }
    }
}

impl ValidationOptions {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Compile and attach a pattern.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression; a broken pattern
    /// is a caller bug, not bad input.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => self.pattern = Some(re),
            Err(e) => panic!("invalid validation pattern {:?}: {}", pattern, e),
        }
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn without_sanitize(mut self) -> Self {
        self.sanitize = false;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<ValidatedValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub(crate) fn true_tokens(&self) -> Vec<String> {
        self.true_values
            .clone()
            .unwrap_or_else(|| DEFAULT_TRUE_TOKENS.iter().map(|s| s.to_string()).collect())
    }

    pub(crate) fn false_tokens(&self) -> Vec<String> {
        self.false_values
            .clone()
            .unwrap_or_else(|| DEFAULT_FALSE_TOKENS.iter().map(|s| s.to_string()).collect())
    }
}

/// Caller-supplied replacements for the built-in error messages
#[derive(Debug, Clone, Default)]
pub struct MessageOverrides {
    pub required: Option<String>,
    pub invalid: Option<String>,
    pub min_length: Option<String>,
    pub max_length: Option<String>,
    pub pattern: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub domain: Option<String>,
    pub blocked_domain: Option<String>,
    pub protocol: Option<String>,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    pub min_items: Option<String>,
    pub max_items: Option<String>,
    pub max_size: Option<String>,
    pub extension: Option<String>,
    pub mime_type: Option<String>,
    pub upload_errors: HashMap<UploadStatus, String>,
}
