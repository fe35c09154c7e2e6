//! Field validation: type-directed checks of untyped request input
//!
//! [`FieldValidator`] is stateless. Each call returns a fresh
//! [`ValidationResult`]; callers that validate several fields for one request
//! collect errors in a [`ValidationContext`] they own.

mod field_type;
pub mod national_id;
mod options;
mod result;
mod source;
mod validator;
mod value;

pub use field_type::{FieldType, UnsupportedFieldType};
pub use options::{
    MessageOverrides, ValidationOptions, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT,
    DEFAULT_FALSE_TOKENS, DEFAULT_TRUE_TOKENS,
};
pub use result::{FieldErrors, ValidationContext, ValidationResult};
pub use source::InputSource;
pub use validator::{FieldSpec, FieldValidator};
pub use value::{RawValue, ValidatedValue};
