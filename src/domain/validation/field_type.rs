use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of field types understood by the field validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Float,
    Email,
    Url,
    Date,
    DateTime,
    Bool,
    /// List value; items are validated against `item` when present
    Array { item: Option<Box<FieldType>> },
    File,
    Slug,
    Enum,
    Phone,
    Cpf,
    Cnpj,
    Cep,
}

impl FieldType {
    pub fn array_of(item: FieldType) -> Self {
        Self::Array {
            item: Some(Box::new(item)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Email => "email",
            Self::Url => "url",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Bool => "bool",
            Self::Array { .. } => "array",
            Self::File => "file",
            Self::Slug => "slug",
            Self::Enum => "enum",
            Self::Phone => "phone",
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
            Self::Cep => "cep",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array { item: Some(item) } => write!(f, "array<{}>", item),
            other => f.write_str(other.name()),
        }
    }
}

/// Name that does not correspond to any [`FieldType`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Tipo de validação '{0}' não suportado.")]
pub struct UnsupportedFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnsupportedFieldType;

    /// Parse `string`, `int`, ..., `array` or `array<item>` (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();

        if let Some(inner) = name
            .strip_prefix("array<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            let item: FieldType = inner.parse().map_err(|_| UnsupportedFieldType(name.clone()))?;
            return Ok(Self::array_of(item));
        }

        match name.as_str() {
            "string" => Ok(Self::String),
            "int" | "integer" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "email" => Ok(Self::Email),
            "url" => Ok(Self::Url),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "bool" | "boolean" => Ok(Self::Bool),
            "array" => Ok(Self::Array { item: None }),
            "file" => Ok(Self::File),
            "slug" => Ok(Self::Slug),
            "enum" => Ok(Self::Enum),
            "phone" => Ok(Self::Phone),
            "cpf" => Ok(Self::Cpf),
            "cnpj" => Ok(Self::Cnpj),
            "cep" => Ok(Self::Cep),
            _ => Err(UnsupportedFieldType(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        assert_eq!("EMAIL".parse::<FieldType>(), Ok(FieldType::Email));
        assert_eq!("datetime".parse::<FieldType>(), Ok(FieldType::DateTime));
        assert_eq!(
            "array".parse::<FieldType>(),
            Ok(FieldType::Array { item: None })
        );
        assert_eq!(
            "array<int>".parse::<FieldType>(),
            Ok(FieldType::array_of(FieldType::Int))
        );
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = "uuid".parse::<FieldType>().unwrap_err();
        assert_eq!(err.to_string(), "Tipo de validação 'uuid' não suportado.");
        assert!("array<uuid>".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let ty = FieldType::array_of(FieldType::Cpf);
        assert_eq!(ty.to_string(), "array<cpf>");
        assert_eq!(ty.to_string().parse::<FieldType>(), Ok(ty));
    }
}
