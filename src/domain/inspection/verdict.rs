use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::upload::format_size;

/// Concrete model format established by inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelFormat {
    StlBinary,
    StlAscii,
    Obj,
    #[serde(rename = "THREEMF")]
    ThreeMf,
}

impl ModelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::StlBinary => "STL_BINARY",
            ModelFormat::StlAscii => "STL_ASCII",
            ModelFormat::Obj => "OBJ",
            ModelFormat::ThreeMf => "THREEMF",
        }
    }

    /// Heuristic scanning only applies to formats interpreted as text
    pub fn is_text_bearing(&self) -> bool {
        matches!(self, ModelFormat::Obj | ModelFormat::ThreeMf)
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned bounds of the sampled vertices
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

/// Running min/max over finite vertex coordinates
#[derive(Debug, Default)]
pub(crate) struct BoundsAccumulator {
    bounds: Option<([f64; 3], [f64; 3])>,
}

impl BoundsAccumulator {
    pub(crate) fn include(&mut self, x: f64, y: f64, z: f64) {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return;
        }
        let point = [x, y, z];
        match &mut self.bounds {
            None => self.bounds = Some((point, point)),
            Some((min, max)) => {
                for axis in 0..3 {
                    min[axis] = min[axis].min(point[axis]);
                    max[axis] = max[axis].max(point[axis]);
                }
            }
        }
    }

    pub(crate) fn finish(self) -> Option<BoundingBox> {
        self.bounds.map(|(min, max)| BoundingBox {
            min_x: min[0],
            max_x: max[0],
            min_y: min[1],
            max_y: max[1],
            min_z: min[2],
            max_z: max[2],
            width: max[0] - min[0],
            height: max[1] - min[1],
            depth: max[2] - min[2],
        })
    }
}

/// Everything extracted about the model; absent facts are `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelMetadata {
    pub file_size: u64,
    pub file_size_formatted: String,
    pub file_extension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triangles: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertices: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faces: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_relationships: Option<bool>,
}

impl ModelMetadata {
    pub(crate) fn for_file(size: u64, extension: &str) -> Self {
        Self {
            file_size: size,
            file_size_formatted: format_size(size),
            file_extension: extension.to_string(),
            ..Default::default()
        }
    }

    /// Copy every fact `other` knows into `self`
    pub(crate) fn merge(&mut self, other: ModelMetadata) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            triangles,
            vertices,
            faces,
            bounding_box,
            model_name,
            header,
            title,
            description,
            designer,
            has_relationships
        );
    }
}

/// Security check identifiers, ordered as they are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    CodeInjection,
    FileCorruption,
    StructuralIntegrity,
    MaliciousContent,
}

impl CheckName {
    pub const ALL: [CheckName; 4] = [
        CheckName::CodeInjection,
        CheckName::FileCorruption,
        CheckName::StructuralIntegrity,
        CheckName::MaliciousContent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::CodeInjection => "code_injection",
            CheckName::FileCorruption => "file_corruption",
            CheckName::StructuralIntegrity => "structural_integrity",
            CheckName::MaliciousContent => "malicious_content",
        }
    }

    pub(crate) fn passing_message(&self) -> &'static str {
        match self {
            CheckName::CodeInjection => "Nenhum código malicioso detectado",
            CheckName::FileCorruption => "Arquivo não está corrompido",
            CheckName::StructuralIntegrity => "Estrutura do arquivo íntegra",
            CheckName::MaliciousContent => "Nenhum conteúdo malicioso detectado",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityCheck {
    pub passed: bool,
    pub message: String,
}

impl SecurityCheck {
    pub fn passed(name: CheckName) -> Self {
        Self {
            passed: true,
            message: name.passing_message().to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

pub type SecurityChecks = BTreeMap<CheckName, SecurityCheck>;

/// Why a verdict is negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionFailure {
    /// The bytes themselves were judged unacceptable
    Content,
    /// The file could not be read or decoded by a library; nothing was proven
    Infrastructure,
}

/// Error raised inside a single inspection stage
#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("{0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl InspectionError {
    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        InspectionError::Rejected(message.into())
    }

    pub fn failure(&self) -> InspectionFailure {
        match self {
            InspectionError::Rejected(_) => InspectionFailure::Content,
            InspectionError::Io(_) | InspectionError::Archive(_) => {
                InspectionFailure::Infrastructure
            }
        }
    }

    /// Text safe to show to the uploader
    pub fn public_message(&self) -> String {
        match self {
            InspectionError::Rejected(message) => message.clone(),
            _ => UNVERIFIABLE_MESSAGE.to_string(),
        }
    }
}

pub(crate) const UNVERIFIABLE_MESSAGE: &str = "Não foi possível verificar o arquivo";

/// Outcome of one inspection. Built once and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct FileVerdict {
    valid: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<ModelFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    metadata: ModelMetadata,
    security_checks: SecurityChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<InspectionFailure>,
}

impl FileVerdict {
    pub(crate) fn accepted(
        format: ModelFormat,
        mime_type: String,
        metadata: ModelMetadata,
        security_checks: SecurityChecks,
    ) -> Self {
        Self {
            valid: true,
            message: "Arquivo válido".to_string(),
            format: Some(format),
            mime_type: Some(mime_type),
            metadata,
            security_checks,
            failure: None,
        }
    }

    pub(crate) fn rejected(
        message: impl Into<String>,
        failure: InspectionFailure,
        metadata: ModelMetadata,
        security_checks: SecurityChecks,
    ) -> Self {
        Self {
            valid: false,
            message: message.into(),
            format: None,
            mime_type: None,
            metadata,
            security_checks,
            failure: Some(failure),
        }
    }

    pub(crate) fn with_format(mut self, format: Option<ModelFormat>) -> Self {
        self.format = format;
        self
    }

    pub(crate) fn with_mime_type(mut self, mime_type: Option<String>) -> Self {
        self.mime_type = mime_type;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn format(&self) -> Option<ModelFormat> {
        self.format
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn security_checks(&self) -> &SecurityChecks {
        &self.security_checks
    }

    pub fn failure(&self) -> Option<InspectionFailure> {
        self.failure
    }

    pub fn check(&self, name: CheckName) -> Option<&SecurityCheck> {
        self.security_checks.get(&name)
    }
}
