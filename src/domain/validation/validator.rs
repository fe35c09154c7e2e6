use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use validator::{ValidateEmail, ValidateUrl};

use super::field_type::FieldType;
use super::national_id;
use super::options::{
    ValidationOptions, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT, DEFAULT_PHONE_MAX_DIGITS,
    DEFAULT_PHONE_MIN_DIGITS,
};
use super::result::{FieldErrors, ValidationContext, ValidationResult};
use super::source::InputSource;
use super::value::{RawValue, ValidatedValue};
use crate::domain::inspection::mime;
use crate::domain::sanitization::Sanitizer;
use crate::domain::upload::{extension_allowed, format_size};

static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("Invalid slug regex"));

/// One entry of a batch validation
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: String,
    pub field_type: FieldType,
    pub options: ValidationOptions,
}

impl FieldSpec {
    pub fn new(field: impl Into<String>, field_type: FieldType, options: ValidationOptions) -> Self {
        Self {
            field: field.into(),
            field_type,
            options,
        }
    }
}

fn pick(custom: &Option<String>, default: impl FnOnce() -> String) -> String {
    custom.clone().unwrap_or_else(default)
}

fn single_error(field: &str, message: String) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message]);
    errors
}

/// Type-directed validation of untyped input.
///
/// Data-driven failures come back as a rejected [`ValidationResult`]; only
/// configuration mistakes (an enum field without `allowed_values`) panic.
pub struct FieldValidator;

impl FieldValidator {
    /// Read `field` from `source` and validate it as `field_type`
    pub fn validate<S: InputSource + ?Sized>(
        source: &S,
        field: &str,
        field_type: &FieldType,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let raw = source.get(field);
        Self::validate_value(raw.as_ref(), field, field_type, options)
    }

    /// Like [`FieldValidator::validate`] with the type given by name. An unknown
    /// name is reported as a field error once presence rules have passed.
    pub fn validate_named<S: InputSource + ?Sized>(
        source: &S,
        field: &str,
        type_name: &str,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let raw = source.get(field);
        match type_name.parse::<FieldType>() {
            Ok(field_type) => Self::validate_value(raw.as_ref(), field, &field_type, options),
            Err(unsupported) => match raw {
                Some(value) if !value.is_blank() => {
                    ValidationResult::rejected(field, unsupported.to_string())
                }
                _ => Self::absent(field, options),
            },
        }
    }

    /// Validate without sanitizing, preserving the raw value for parameter binding
    pub fn validate_for_database<S: InputSource + ?Sized>(
        source: &S,
        field: &str,
        field_type: &FieldType,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let options = options.clone().without_sanitize();
        Self::validate(source, field, field_type, &options)
    }

    /// Validate every spec against one source, accumulating errors into `ctx`
    pub fn validate_all<S: InputSource + ?Sized>(
        source: &S,
        specs: &[FieldSpec],
        ctx: &mut ValidationContext,
    ) -> BTreeMap<String, Option<ValidatedValue>> {
        specs
            .iter()
            .map(|spec| {
                let result = Self::validate(source, &spec.field, &spec.field_type, &spec.options);
                (spec.field.clone(), ctx.absorb(result))
            })
            .collect()
    }

    /// Validate an already extracted value (`None` = absent)
    pub fn validate_value(
        raw: Option<&RawValue>,
        field: &str,
        field_type: &FieldType,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let raw = match raw {
            Some(value) if !value.is_blank() => value,
            _ => return Self::absent(field, options),
        };

        match Self::check(raw, field, field_type, options) {
            Ok(value) => ValidationResult::accepted(Some(value)),
            Err(errors) => {
                debug!(field = %field, field_type = %field_type, "Field rejected");
                ValidationResult::from_errors(errors)
            }
        }
    }

    fn absent(field: &str, options: &ValidationOptions) -> ValidationResult {
        if options.required {
            let message = pick(&options.messages.required, || {
                format!("O campo '{}' é obrigatório.", field)
            });
            return ValidationResult::rejected(field, message);
        }
        ValidationResult::accepted(options.default.clone())
    }

    fn check(
        raw: &RawValue,
        field: &str,
        field_type: &FieldType,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, FieldErrors> {
        let outcome = match field_type {
            FieldType::Array { item } => {
                return Self::check_array(raw, field, item.as_deref(), options)
            }
            FieldType::String => Self::check_string(raw, field, options),
            FieldType::Int => Self::check_int(raw, field, options),
            FieldType::Float => Self::check_float(raw, field, options),
            FieldType::Email => Self::check_email(raw, field, options),
            FieldType::Url => Self::check_url(raw, field, options),
            FieldType::Date => Self::check_date(raw, field, options),
            FieldType::DateTime => Self::check_datetime(raw, field, options),
            FieldType::Bool => Ok(Self::check_bool(raw, options)),
            FieldType::File => Self::check_file(raw, field, options),
            FieldType::Slug => Self::check_slug(raw, field, options),
            FieldType::Enum => Self::check_enum(raw, field, options),
            FieldType::Phone => Self::check_phone(raw, field, options),
            FieldType::Cpf => Self::check_document(raw, field, options, "CPF", national_id::is_valid_cpf),
            FieldType::Cnpj => {
                Self::check_document(raw, field, options, "CNPJ", national_id::is_valid_cnpj)
            }
            FieldType::Cep => Self::check_document(raw, field, options, "CEP", national_id::is_valid_cep),
        };

        outcome.map_err(|message| single_error(field, message))
    }

    fn scalar_text(raw: &RawValue, invalid: impl FnOnce() -> String) -> Result<String, String> {
        raw.as_text().ok_or_else(invalid)
    }

    fn check_string(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let text = Self::scalar_text(raw, || {
            pick(&options.messages.invalid, || {
                format!("O campo '{}' não está no formato esperado.", field)
            })
        })?;
        let value = text.trim().to_string();
        let length = value.chars().count();

        if let Some(min) = options.min_length {
            if length < min {
                return Err(pick(&options.messages.min_length, || {
                    format!("O campo '{}' deve ter pelo menos {} caracteres.", field, min)
                }));
            }
        }

        if let Some(max) = options.max_length {
            if length > max {
                return Err(pick(&options.messages.max_length, || {
                    format!("O campo '{}' deve ter no máximo {} caracteres.", field, max)
                }));
            }
        }

        if let Some(pattern) = &options.pattern {
            if !pattern.is_match(&value) {
                return Err(pick(&options.messages.pattern, || {
                    format!("O campo '{}' não está no formato esperado.", field)
                }));
            }
        }

        if options.sanitize {
            return Ok(ValidatedValue::Text(Sanitizer::sanitize_advanced_xss(&value)));
        }

        Ok(ValidatedValue::Text(value))
    }

    fn check_range(value: f64, field: &str, options: &ValidationOptions) -> Result<(), String> {
        if let Some(min) = options.min {
            if value < min {
                return Err(pick(&options.messages.min, || {
                    format!("O campo '{}' deve ser maior ou igual a {}.", field, min)
                }));
            }
        }

        if let Some(max) = options.max {
            if value > max {
                return Err(pick(&options.messages.max, || {
                    format!("O campo '{}' deve ser menor ou igual a {}.", field, max)
                }));
            }
        }

        Ok(())
    }

    fn check_int(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        // Textual input must already be in canonical form ("7", not "07" or "7.0").
        let parsed = match raw {
            RawValue::Int(i) => Some(*i),
            RawValue::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Some(*f as i64)
            }
            RawValue::Text(s) => s.parse::<i64>().ok().filter(|i| i.to_string() == *s),
            _ => None,
        };

        let value = parsed.ok_or_else(|| {
            pick(&options.messages.invalid, || {
                format!("O campo '{}' deve ser um número inteiro.", field)
            })
        })?;

        Self::check_range(value as f64, field, options)?;
        Ok(ValidatedValue::Int(value))
    }

    fn check_float(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let parsed = match raw {
            RawValue::Int(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            RawValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|f| f.is_finite());

        let value = parsed.ok_or_else(|| {
            pick(&options.messages.invalid, || {
                format!("O campo '{}' deve ser um número decimal.", field)
            })
        })?;

        Self::check_range(value, field, options)?;
        Ok(ValidatedValue::Float(value))
    }

    fn check_email(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let invalid = || {
            pick(&options.messages.invalid, || {
                format!("O campo '{}' deve conter um endereço de e-mail válido.", field)
            })
        };
        let text = Self::scalar_text(raw, invalid)?;
        let value = text.trim();

        if !value.validate_email() {
            return Err(invalid());
        }

        let domain = value
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_lowercase())
            .unwrap_or_default();

        if let Some(allowed) = &options.allowed_domains {
            if !allowed.iter().any(|d| d.eq_ignore_ascii_case(&domain)) {
                return Err(pick(&options.messages.domain, || {
                    format!("O domínio de e-mail '{}' não é permitido.", domain)
                }));
            }
        }

        if let Some(blocked) = &options.blocked_domains {
            if blocked.iter().any(|d| d.eq_ignore_ascii_case(&domain)) {
                return Err(pick(&options.messages.blocked_domain, || {
                    format!("O domínio de e-mail '{}' não é permitido.", domain)
                }));
            }
        }

        Ok(ValidatedValue::Text(value.to_string()))
    }

    fn check_url(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let invalid = || {
            pick(&options.messages.invalid, || {
                format!("O campo '{}' deve conter uma URL válida.", field)
            })
        };
        let text = Self::scalar_text(raw, invalid)?;
        let value = text.trim();

        if !value.validate_url() {
            return Err(invalid());
        }

        if let Some(protocols) = &options.protocols {
            let scheme = value
                .split_once(':')
                .map(|(scheme, _)| scheme.to_lowercase())
                .unwrap_or_default();
            if !protocols.iter().any(|p| p.eq_ignore_ascii_case(&scheme)) {
                return Err(pick(&options.messages.protocol, || {
                    format!(
                        "O protocolo da URL deve ser um dos seguintes: {}.",
                        protocols.join(", ")
                    )
                }));
            }
        }

        Ok(ValidatedValue::Text(value.to_string()))
    }

    fn check_date(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let format = options.format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
        let invalid = || {
            pick(&options.messages.invalid, || {
                format!(
                    "O campo '{}' deve conter uma data válida no formato {}.",
                    field, format
                )
            })
        };
        let text = Self::scalar_text(raw, invalid)?;
        let value = text.trim();

        // Round-trip guards against lenient parses such as single-digit months.
        let date = NaiveDate::parse_from_str(value, format)
            .ok()
            .filter(|d| d.format(format).to_string() == value)
            .ok_or_else(invalid)?;

        if let Some(min) = options.min_date {
            if date < min {
                return Err(pick(&options.messages.min_date, || {
                    format!(
                        "A data no campo '{}' deve ser maior ou igual a {}.",
                        field,
                        min.format(format)
                    )
                }));
            }
        }

        if let Some(max) = options.max_date {
            if date > max {
                return Err(pick(&options.messages.max_date, || {
                    format!(
                        "A data no campo '{}' deve ser menor ou igual a {}.",
                        field,
                        max.format(format)
                    )
                }));
            }
        }

        Ok(ValidatedValue::Text(value.to_string()))
    }

    fn check_datetime(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let format = options.format.as_deref().unwrap_or(DEFAULT_DATETIME_FORMAT);
        let invalid = || {
            pick(&options.messages.invalid, || {
                format!(
                    "O campo '{}' deve conter uma data e hora válidas no formato {}.",
                    field, format
                )
            })
        };
        let text = Self::scalar_text(raw, invalid)?;
        let value = text.trim();

        let datetime = NaiveDateTime::parse_from_str(value, format)
            .ok()
            .filter(|d| d.format(format).to_string() == value)
            .ok_or_else(invalid)?;

        if let Some(min) = options.min_datetime {
            if datetime < min {
                return Err(pick(&options.messages.min_date, || {
                    format!(
                        "A data e hora no campo '{}' devem ser maiores ou iguais a {}.",
                        field,
                        min.format(format)
                    )
                }));
            }
        }

        if let Some(max) = options.max_datetime {
            if datetime > max {
                return Err(pick(&options.messages.max_date, || {
                    format!(
                        "A data e hora no campo '{}' devem ser menores ou iguais a {}.",
                        field,
                        max.format(format)
                    )
                }));
            }
        }

        Ok(ValidatedValue::Text(value.to_string()))
    }

    fn check_bool(raw: &RawValue, options: &ValidationOptions) -> ValidatedValue {
        let token = match raw {
            RawValue::Bool(b) => return ValidatedValue::Bool(*b),
            other => other.as_text().unwrap_or_default().trim().to_lowercase(),
        };

        if options
            .true_tokens()
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&token))
        {
            return ValidatedValue::Bool(true);
        }

        if options
            .false_tokens()
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&token))
        {
            return ValidatedValue::Bool(false);
        }

        ValidatedValue::Bool(
            options
                .default
                .as_ref()
                .and_then(ValidatedValue::as_bool)
                .unwrap_or(false),
        )
    }

    fn check_slug(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let invalid = || {
            pick(&options.messages.invalid, || {
                format!(
                    "O campo '{}' deve conter apenas letras minúsculas, números e hífens.",
                    field
                )
            })
        };
        let text = Self::scalar_text(raw, invalid)?;
        let value = text.trim();

        if !SLUG_REGEX.is_match(value) {
            return Err(invalid());
        }

        Ok(ValidatedValue::Text(value.to_string()))
    }

    fn check_enum(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let Some(allowed) = &options.allowed_values else {
            panic!(
                "enum field '{}' validated without allowed_values; this is a caller bug",
                field
            );
        };

        let invalid = || {
            pick(&options.messages.invalid, || {
                format!(
                    "O valor do campo '{}' deve ser um dos seguintes: {}.",
                    field,
                    allowed.join(", ")
                )
            })
        };
        let value = Self::scalar_text(raw, invalid)?;

        if !allowed.iter().any(|a| *a == value) {
            return Err(invalid());
        }

        Ok(ValidatedValue::Text(value))
    }

    fn check_phone(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let invalid = || {
            pick(&options.messages.invalid, || {
                format!("O campo '{}' deve conter um número de telefone válido.", field)
            })
        };
        let digits = national_id::digits_only(&Self::scalar_text(raw, invalid)?);
        let min = options.min_length.unwrap_or(DEFAULT_PHONE_MIN_DIGITS);
        let max = options.max_length.unwrap_or(DEFAULT_PHONE_MAX_DIGITS);

        if !national_id::is_valid_phone(&digits, min, max) {
            return Err(invalid());
        }

        Ok(ValidatedValue::Text(digits))
    }

    fn check_document(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
        label: &str,
        is_valid: fn(&str) -> bool,
    ) -> Result<ValidatedValue, String> {
        let invalid = || {
            pick(&options.messages.invalid, || {
                format!("O campo '{}' deve conter um {} válido.", field, label)
            })
        };
        let digits = national_id::digits_only(&Self::scalar_text(raw, invalid)?);

        if !is_valid(&digits) {
            return Err(invalid());
        }

        Ok(ValidatedValue::Text(digits))
    }

    fn check_array(
        raw: &RawValue,
        field: &str,
        item_type: Option<&FieldType>,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, FieldErrors> {
        let items: Vec<RawValue> = match (raw, &options.delimiter) {
            (RawValue::List(items), _) => items.clone(),
            (RawValue::Text(text), Some(delimiter)) if !delimiter.is_empty() => text
                .split(delimiter.as_str())
                .map(|part| RawValue::Text(part.to_string()))
                .collect(),
            _ => {
                let message = pick(&options.messages.invalid, || {
                    format!("O campo '{}' deve ser um array.", field)
                });
                return Err(single_error(field, message));
            }
        };

        if let Some(min) = options.min_items {
            if items.len() < min {
                let message = pick(&options.messages.min_items, || {
                    format!("O campo '{}' deve conter pelo menos {} itens.", field, min)
                });
                return Err(single_error(field, message));
            }
        }

        if let Some(max) = options.max_items {
            if items.len() > max {
                let message = pick(&options.messages.max_items, || {
                    format!("O campo '{}' deve conter no máximo {} itens.", field, max)
                });
                return Err(single_error(field, message));
            }
        }

        let Some(item_type) = item_type else {
            return Ok(ValidatedValue::List(
                items.iter().map(Self::passthrough).collect(),
            ));
        };

        let mut values = Vec::with_capacity(items.len());
        let mut errors = FieldErrors::new();

        for (idx, item) in items.iter().enumerate() {
            let item_field = format!("{}[{}]", field, idx);
            match Self::check(item, &item_field, item_type, options) {
                Ok(value) => values.push(value),
                Err(item_errors) => {
                    for (key, messages) in item_errors {
                        errors.entry(key).or_default().extend(messages);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(ValidatedValue::List(values))
        } else {
            Err(errors)
        }
    }

    fn passthrough(raw: &RawValue) -> ValidatedValue {
        match raw {
            RawValue::Null => ValidatedValue::Null,
            RawValue::Bool(b) => ValidatedValue::Bool(*b),
            RawValue::Int(i) => ValidatedValue::Int(*i),
            RawValue::Float(f) => ValidatedValue::Float(*f),
            RawValue::Text(s) => ValidatedValue::Text(s.clone()),
            RawValue::List(items) => {
                ValidatedValue::List(items.iter().map(Self::passthrough).collect())
            }
            RawValue::File(file) => ValidatedValue::File(file.clone()),
        }
    }

    fn check_file(
        raw: &RawValue,
        field: &str,
        options: &ValidationOptions,
    ) -> Result<ValidatedValue, String> {
        let RawValue::File(file) = raw else {
            return Err(pick(&options.messages.invalid, || {
                format!("O campo '{}' deve ser um arquivo.", field)
            }));
        };

        if !file.status.is_ok() {
            return Err(options
                .messages
                .upload_errors
                .get(&file.status)
                .cloned()
                .unwrap_or_else(|| file.status.field_message(field)));
        }

        if let Some(max_size) = options.max_size {
            if file.size > max_size {
                return Err(pick(&options.messages.max_size, || {
                    format!(
                        "O arquivo no campo '{}' deve ter no máximo {}.",
                        field,
                        format_size(max_size)
                    )
                }));
            }
        }

        if let Some(allowed) = &options.allowed_extensions {
            if !extension_allowed(&file.extension(), allowed) {
                return Err(pick(&options.messages.extension, || {
                    format!(
                        "O arquivo no campo '{}' deve ter uma das seguintes extensões: {}.",
                        field,
                        allowed.join(", ")
                    )
                }));
            }
        }

        if let Some(allowed) = &options.allowed_mime_types {
            let sniffed = mime::sniff_file(&file.temp_path).unwrap_or_else(|e| {
                warn!(path = ?file.temp_path, error = %e, "Could not read upload for MIME sniffing");
                String::new()
            });
            if !allowed.iter().any(|m| m.eq_ignore_ascii_case(&sniffed)) {
                return Err(pick(&options.messages.mime_type, || {
                    format!(
                        "O arquivo no campo '{}' deve ser de um dos seguintes tipos: {}.",
                        field,
                        allowed.join(", ")
                    )
                }));
            }
        }

        Ok(ValidatedValue::File(file.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::upload::{UploadStatus, UploadedFile};
    use serde_json::json;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn check(value: impl Into<RawValue>, ty: FieldType, options: ValidationOptions) -> ValidationResult {
        let raw = value.into();
        FieldValidator::validate_value(Some(&raw), "f", &ty, &options)
    }

    #[test]
    fn test_required_field_missing() {
        let empty: HashMap<String, String> = HashMap::new();
        let result = FieldValidator::validate(
            &empty,
            "email",
            &FieldType::Email,
            &ValidationOptions::required(),
        );

        assert!(!result.is_valid());
        assert_eq!(
            result.errors().get("email"),
            Some(&vec!["O campo 'email' é obrigatório.".to_string()])
        );
    }

    #[test]
    fn test_required_field_empty_string() {
        let src = source(&[("name", "")]);
        let result = FieldValidator::validate(
            &src,
            "name",
            &FieldType::String,
            &ValidationOptions::required(),
        );
        assert!(!result.is_valid());
    }

    #[test]
    fn test_optional_absent_returns_default() {
        let empty: HashMap<String, String> = HashMap::new();
        let result = FieldValidator::validate(
            &empty,
            "page",
            &FieldType::Int,
            &ValidationOptions::default().with_default(1i64),
        );
        assert!(result.is_valid());
        assert_eq!(result.value(), Some(&ValidatedValue::Int(1)));

        let result =
            FieldValidator::validate(&empty, "page", &FieldType::Int, &ValidationOptions::default());
        assert!(result.is_valid());
        assert_eq!(result.value(), None);
    }

    #[test]
    fn test_string_length_and_pattern() {
        let options = ValidationOptions::default().with_length(Some(3), Some(5));
        assert_eq!(
            check("ab", FieldType::String, options.clone()).first_error("f"),
            Some("O campo 'f' deve ter pelo menos 3 caracteres.")
        );
        assert_eq!(
            check("abcdef", FieldType::String, options.clone()).first_error("f"),
            Some("O campo 'f' deve ter no máximo 5 caracteres.")
        );
        assert!(check("  abc  ", FieldType::String, options).is_valid());

        let options = ValidationOptions::default().with_pattern(r"^[A-Z]{2}$");
        assert_eq!(
            check("abc", FieldType::String, options.clone()).first_error("f"),
            Some("O campo 'f' não está no formato esperado.")
        );
        assert!(check("SP", FieldType::String, options).is_valid());
    }

    #[test]
    fn test_string_sanitized_unless_disabled() {
        let result = check("<b onclick=\"x()\">hi</b>", FieldType::String, ValidationOptions::default());
        let value = result.value().and_then(ValidatedValue::as_str).unwrap();
        assert!(value.starts_with("&lt;b"));
        assert!(!value.contains("onclick"));

        let src = source(&[("q", "O'Reilly & <Sons>")]);
        let raw = FieldValidator::validate_for_database(
            &src,
            "q",
            &FieldType::String,
            &ValidationOptions::default(),
        );
        assert_eq!(
            raw.value().and_then(ValidatedValue::as_str),
            Some("O'Reilly & <Sons>")
        );
    }

    #[test]
    fn test_int_requires_canonical_form() {
        let options = ValidationOptions::default();
        assert_eq!(check("42", FieldType::Int, options.clone()).value(), Some(&ValidatedValue::Int(42)));
        assert_eq!(check("-7", FieldType::Int, options.clone()).value(), Some(&ValidatedValue::Int(-7)));
        for bad in ["007", "4.0", "+4", " 4", "abc", "1e3"] {
            assert_eq!(
                check(bad, FieldType::Int, options.clone()).first_error("f"),
                Some("O campo 'f' deve ser um número inteiro."),
                "{} should be rejected",
                bad
            );
        }
        assert!(check(RawValue::Float(3.0), FieldType::Int, options.clone()).is_valid());
        assert!(!check(RawValue::Float(3.5), FieldType::Int, options).is_valid());
    }

    #[test]
    fn test_int_range() {
        let options = ValidationOptions::default().with_range(Some(1.0), Some(10.0));
        assert_eq!(
            check("0", FieldType::Int, options.clone()).first_error("f"),
            Some("O campo 'f' deve ser maior ou igual a 1.")
        );
        assert_eq!(
            check("11", FieldType::Int, options.clone()).first_error("f"),
            Some("O campo 'f' deve ser menor ou igual a 10.")
        );
        assert!(check("10", FieldType::Int, options).is_valid());
    }

    #[test]
    fn test_float() {
        let options = ValidationOptions::default().with_range(Some(0.5), None);
        assert_eq!(
            check("1.25", FieldType::Float, options.clone()).value(),
            Some(&ValidatedValue::Float(1.25))
        );
        assert!(!check("0.1", FieldType::Float, options.clone()).is_valid());
        assert_eq!(
            check("NaN", FieldType::Float, options.clone()).first_error("f"),
            Some("O campo 'f' deve ser um número decimal.")
        );
        assert!(!check("inf", FieldType::Float, options).is_valid());
    }

    #[test]
    fn test_email_domains() {
        let options = ValidationOptions {
            blocked_domains: Some(vec!["mailinator.com".to_string()]),
            ..Default::default()
        };
        assert!(check(" user@example.com ", FieldType::Email, options.clone()).is_valid());
        assert_eq!(
            check("user@mailinator.com", FieldType::Email, options.clone()).first_error("f"),
            Some("O domínio de e-mail 'mailinator.com' não é permitido.")
        );
        assert_eq!(
            check("not-an-email", FieldType::Email, options).first_error("f"),
            Some("O campo 'f' deve conter um endereço de e-mail válido.")
        );

        let options = ValidationOptions {
            allowed_domains: Some(vec!["corp.com".to_string()]),
            ..Default::default()
        };
        assert!(check("a@corp.com", FieldType::Email, options.clone()).is_valid());
        assert!(!check("a@other.com", FieldType::Email, options).is_valid());
    }

    #[test]
    fn test_url_protocols() {
        let options = ValidationOptions {
            protocols: Some(vec!["https".to_string()]),
            ..Default::default()
        };
        assert!(check("https://example.com/a?b=1", FieldType::Url, options.clone()).is_valid());
        assert_eq!(
            check("ftp://example.com", FieldType::Url, options.clone()).first_error("f"),
            Some("O protocolo da URL deve ser um dos seguintes: https.")
        );
        assert_eq!(
            check("not a url", FieldType::Url, options).first_error("f"),
            Some("O campo 'f' deve conter uma URL válida.")
        );
    }

    #[test]
    fn test_date_strict_round_trip() {
        let options = ValidationOptions::default();
        assert!(check("2024-02-29", FieldType::Date, options.clone()).is_valid());
        assert!(!check("2024-02-30", FieldType::Date, options.clone()).is_valid());
        assert!(!check("2023-02-29", FieldType::Date, options.clone()).is_valid());
        assert!(!check("2024-2-5", FieldType::Date, options.clone()).is_valid());
        assert_eq!(
            check("31/12/2024", FieldType::Date, options).first_error("f"),
            Some("O campo 'f' deve conter uma data válida no formato %Y-%m-%d.")
        );

        let options = ValidationOptions {
            format: Some("%d/%m/%Y".to_string()),
            ..Default::default()
        };
        assert!(check("31/12/2024", FieldType::Date, options).is_valid());
    }

    #[test]
    fn test_date_bounds() {
        let options = ValidationOptions {
            min_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            max_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            ..Default::default()
        };
        assert_eq!(
            check("2023-12-31", FieldType::Date, options.clone()).first_error("f"),
            Some("A data no campo 'f' deve ser maior ou igual a 2024-01-01.")
        );
        assert_eq!(
            check("2025-01-01", FieldType::Date, options.clone()).first_error("f"),
            Some("A data no campo 'f' deve ser menor ou igual a 2024-12-31.")
        );
        assert!(check("2024-06-15", FieldType::Date, options).is_valid());
    }

    #[test]
    fn test_datetime() {
        let options = ValidationOptions::default();
        assert!(check("2024-06-15 13:45:00", FieldType::DateTime, options.clone()).is_valid());
        assert!(!check("2024-06-15 25:00:00", FieldType::DateTime, options.clone()).is_valid());
        assert!(!check("2024-06-15", FieldType::DateTime, options).is_valid());
    }

    #[test]
    fn test_bool_tokens_and_default() {
        let options = ValidationOptions::default();
        for token in ["true", "YES", "1", "on", "y"] {
            assert_eq!(
                check(token, FieldType::Bool, options.clone()).value(),
                Some(&ValidatedValue::Bool(true)),
                "{}",
                token
            );
        }
        for token in ["false", "No", "0", "off"] {
            assert_eq!(
                check(token, FieldType::Bool, options.clone()).value(),
                Some(&ValidatedValue::Bool(false))
            );
        }
        assert_eq!(
            check(RawValue::Int(1), FieldType::Bool, options.clone()).value(),
            Some(&ValidatedValue::Bool(true))
        );
        assert_eq!(
            check("maybe", FieldType::Bool, options).value(),
            Some(&ValidatedValue::Bool(false))
        );
        assert_eq!(
            check("maybe", FieldType::Bool, ValidationOptions::default().with_default(true)).value(),
            Some(&ValidatedValue::Bool(true))
        );
    }

    #[test]
    fn test_enum() {
        let options = ValidationOptions::default().with_allowed_values(["pla", "abs"]);
        assert!(check("pla", FieldType::Enum, options.clone()).is_valid());
        assert_eq!(
            check("petg", FieldType::Enum, options).first_error("f"),
            Some("O valor do campo 'f' deve ser um dos seguintes: pla, abs.")
        );
    }

    #[test]
    #[should_panic(expected = "without allowed_values")]
    fn test_enum_without_allow_list_panics() {
        check("x", FieldType::Enum, ValidationOptions::default());
    }

    #[test]
    fn test_national_ids() {
        let options = ValidationOptions::default();
        assert_eq!(
            check("529.982.247-25", FieldType::Cpf, options.clone()).value(),
            Some(&ValidatedValue::Text("52998224725".into()))
        );
        assert_eq!(
            check("111.111.111-11", FieldType::Cpf, options.clone()).first_error("f"),
            Some("O campo 'f' deve conter um CPF válido.")
        );
        assert!(check("11.222.333/0001-81", FieldType::Cnpj, options.clone()).is_valid());
        assert_eq!(
            check("01310-100", FieldType::Cep, options.clone()).value(),
            Some(&ValidatedValue::Text("01310100".into()))
        );
        assert_eq!(
            check("0131-10", FieldType::Cep, options.clone()).first_error("f"),
            Some("O campo 'f' deve conter um CEP válido.")
        );
        assert!(check("(11) 98765-4321", FieldType::Phone, options.clone()).is_valid());
        assert!(!check("98765", FieldType::Phone, options).is_valid());
    }

    #[test]
    fn test_slug() {
        let options = ValidationOptions::default();
        assert!(check("my-model-01", FieldType::Slug, options.clone()).is_valid());
        assert!(!check("My Model", FieldType::Slug, options).is_valid());
    }

    #[test]
    fn test_array_from_delimited_string() {
        let options = ValidationOptions::default().with_delimiter(",");
        let result = check("1,2,3", FieldType::array_of(FieldType::Int), options);
        assert_eq!(
            result.value(),
            Some(&ValidatedValue::List(vec![
                ValidatedValue::Int(1),
                ValidatedValue::Int(2),
                ValidatedValue::Int(3)
            ]))
        );
    }

    #[test]
    fn test_array_item_errors_are_indexed() {
        let raw = RawValue::from(json!(["1", "x", "3", "y"]));
        let result = FieldValidator::validate_value(
            Some(&raw),
            "ids",
            &FieldType::array_of(FieldType::Int),
            &ValidationOptions::default(),
        );
        assert!(!result.is_valid());
        assert_eq!(
            result.first_error("ids[1]"),
            Some("O campo 'ids[1]' deve ser um número inteiro.")
        );
        assert!(result.errors().contains_key("ids[3]"));
        assert!(!result.errors().contains_key("ids[0]"));
    }

    #[test]
    fn test_array_item_count_and_shape() {
        let options = ValidationOptions {
            min_items: Some(2),
            max_items: Some(3),
            ..Default::default()
        };
        let ty = FieldType::Array { item: None };
        assert_eq!(
            check(vec!["a"], ty.clone(), options.clone()).first_error("f"),
            Some("O campo 'f' deve conter pelo menos 2 itens.")
        );
        assert_eq!(
            check(vec!["a", "b", "c", "d"], ty.clone(), options.clone()).first_error("f"),
            Some("O campo 'f' deve conter no máximo 3 itens.")
        );
        assert_eq!(
            check("a,b", ty, options).first_error("f"),
            Some("O campo 'f' deve ser um array.")
        );
    }

    #[test]
    fn test_file_checks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.tmp");
        std::fs::write(&path, b"plain text body").unwrap();

        let file = UploadedFile::new("notes.txt", &path, 15);
        let options = ValidationOptions {
            max_size: Some(1024),
            allowed_extensions: Some(vec!["txt".to_string()]),
            allowed_mime_types: Some(vec!["text/plain".to_string()]),
            ..Default::default()
        };
        assert!(check(file.clone(), FieldType::File, options.clone()).is_valid());

        let renamed = UploadedFile::new("notes.exe", &path, 15);
        assert_eq!(
            check(renamed, FieldType::File, options.clone()).first_error("f"),
            Some("O arquivo no campo 'f' deve ter uma das seguintes extensões: txt.")
        );

        let big = UploadedFile::new("notes.txt", &path, 4096);
        assert_eq!(
            check(big, FieldType::File, options.clone()).first_error("f"),
            Some("O arquivo no campo 'f' deve ter no máximo 1 KB.")
        );

        let partial = file.clone().with_status(UploadStatus::Partial);
        assert_eq!(
            check(partial.clone(), FieldType::File, options.clone()).first_error("f"),
            Some("O arquivo no campo 'f' foi enviado apenas parcialmente.")
        );

        let mut custom = options;
        custom
            .messages
            .upload_errors
            .insert(UploadStatus::Partial, "Tente novamente".to_string());
        assert_eq!(
            check(partial, FieldType::File, custom).first_error("f"),
            Some("Tente novamente")
        );

        assert_eq!(
            check("not a file", FieldType::File, ValidationOptions::default()).first_error("f"),
            Some("O campo 'f' deve ser um arquivo.")
        );
    }

    #[test]
    fn test_validate_named_unknown_type() {
        let src = source(&[("x", "1")]);
        let result = FieldValidator::validate_named(&src, "x", "uuid", &ValidationOptions::default());
        assert_eq!(result.first_error("x"), Some("Tipo de validação 'uuid' não suportado."));

        let result = FieldValidator::validate_named(&src, "y", "uuid", &ValidationOptions::default());
        assert!(result.is_valid());

        let result = FieldValidator::validate_named(&src, "x", "INT", &ValidationOptions::default());
        assert_eq!(result.value(), Some(&ValidatedValue::Int(1)));
    }

    #[test]
    fn test_validate_all_accumulates_into_context() {
        let body = json!({"name": "Ana", "age": "abc", "email": ""});
        let specs = vec![
            FieldSpec::new("name", FieldType::String, ValidationOptions::required()),
            FieldSpec::new("age", FieldType::Int, ValidationOptions::default()),
            FieldSpec::new("email", FieldType::Email, ValidationOptions::required()),
        ];
        let mut ctx = ValidationContext::new();

        let values = FieldValidator::validate_all(&body, &specs, &mut ctx);

        assert_eq!(values["name"], Some(ValidatedValue::Text("Ana".into())));
        assert_eq!(values["age"], None);
        assert_eq!(ctx.errors().len(), 2);
        assert!(ctx.errors().contains_key("age"));
        assert!(ctx.errors().contains_key("email"));
    }

    #[test]
    fn test_custom_messages() {
        let mut options = ValidationOptions::required();
        options.messages.required = Some("Informe o nome".to_string());
        let empty: HashMap<String, String> = HashMap::new();
        let result = FieldValidator::validate(&empty, "name", &FieldType::String, &options);
        assert_eq!(result.first_error("name"), Some("Informe o nome"));
    }
}
