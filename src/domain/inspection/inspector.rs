use std::fs::File;
use std::path::Path;

use tracing::{debug, error, warn};

use super::byte_source::{read_prefix, ByteSource};
use super::config::InspectorConfig;
use super::heuristics::HeuristicScanner;
use super::mime::{self, OCTET_STREAM};
use super::verdict::{
    CheckName, FileVerdict, InspectionError, ModelFormat, ModelMetadata, SecurityCheck,
    SecurityChecks,
};
use super::{obj, stl, three_mf};

pub const MODEL_EXTENSIONS: &[&str] = &["stl", "obj", "3mf"];

const STL_MIME_TYPES: &[&str] = &[
    "application/sla",
    "model/stl",
    "application/vnd.ms-pki.stl",
    "text/plain",
];
const OBJ_MIME_TYPES: &[&str] = &["application/object", "model/obj", "text/plain"];
const THREE_MF_MIME_TYPES: &[&str] = &[
    "application/vnd.ms-package.3dmanufacturing-3dmodel+xml",
    "application/3mf",
    "application/zip",
];

/// Bytes needed to tell the STL variants apart and to spot a ZIP
const SIGNATURE_PREFIX_LEN: u64 = 5;

pub fn allowed_mime_types(format: ModelFormat) -> &'static [&'static str] {
    match format {
        ModelFormat::StlBinary | ModelFormat::StlAscii => STL_MIME_TYPES,
        ModelFormat::Obj => OBJ_MIME_TYPES,
        ModelFormat::ThreeMf => THREE_MF_MIME_TYPES,
    }
}

/// Facts established by the structural validators
struct Structure {
    metadata: ModelMetadata,
    scan_sample: Option<Vec<u8>>,
}

/// Format-aware validator for uploaded 3D models (STL, OBJ, 3MF).
///
/// Stages run in order: extension, signature, MIME cross-check, structure,
/// security checks. The first failing stage names the verdict; the security
/// check breakdown is always filled in.
///
/// Stateless apart from its configuration; one instance can serve concurrent
/// inspections, each owning its byte source.
#[derive(Debug, Clone, Default)]
pub struct ModelInspector {
    config: InspectorConfig,
}

impl ModelInspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn inspect_path(&self, path: &Path, extension_hint: &str) -> FileVerdict {
        match File::open(path) {
            Ok(mut file) => self.inspect(&mut file, extension_hint),
            Err(e) => self.reject(
                InspectionError::from(e),
                None,
                ModelMetadata::for_file(0, &normalize_extension(extension_hint)),
                SecurityChecks::new(),
            ),
        }
    }

    pub fn inspect<S: ByteSource>(&self, source: &mut S, extension_hint: &str) -> FileVerdict {
        let extension = normalize_extension(extension_hint);
        let size = match source.size() {
            Ok(size) => size,
            Err(e) => {
                return self.reject(
                    InspectionError::from(e),
                    None,
                    ModelMetadata::for_file(0, &extension),
                    SecurityChecks::new(),
                )
            }
        };
        let metadata = ModelMetadata::for_file(size, &extension);
        let checks = self.baseline_checks(size);

        if !MODEL_EXTENSIONS.contains(&extension.as_str()) {
            return self.reject(
                InspectionError::rejected(format!(
                    "Extensão de arquivo não permitida. Extensões permitidas: {}",
                    MODEL_EXTENSIONS.join(", ")
                )),
                None,
                metadata,
                checks,
            );
        }

        let verdict = self.inspect_model(source, &extension, size, metadata, checks);
        debug!(
            extension = %extension,
            size,
            valid = verdict.is_valid(),
            format = ?verdict.format(),
            "Model inspection finished"
        );
        verdict
    }

    fn inspect_model<S: ByteSource>(
        &self,
        source: &mut S,
        extension: &str,
        size: u64,
        mut metadata: ModelMetadata,
        mut checks: SecurityChecks,
    ) -> FileVerdict {
        let format = match self.signature(source, extension, size) {
            Ok(format) => format,
            Err(err) => {
                checks.insert(
                    CheckName::StructuralIntegrity,
                    SecurityCheck::failed(err.public_message()),
                );
                return self.reject(err, None, metadata, checks);
            }
        };

        let structure = self.structure(source, format, size);
        if let Err(err) = &structure {
            checks.insert(
                CheckName::StructuralIntegrity,
                SecurityCheck::failed(err.public_message()),
            );
        }

        match self.scan(source, format, structure.as_ref().ok()) {
            Ok(Some(rule)) => {
                warn!(format = %format, rule, "Heuristic scan matched model content");
                checks.insert(
                    CheckName::CodeInjection,
                    SecurityCheck::failed("Detectado conteúdo potencialmente malicioso"),
                );
            }
            Ok(None) => {}
            Err(err) => return self.reject(err, Some(format), metadata, checks),
        }

        let mime_type = match mime::sniff_source(source) {
            Ok(mime_type) => mime_type,
            Err(e) => return self.reject(e.into(), Some(format), metadata, checks),
        };
        if self.config.strict_validation
            && !mime_allowed(format, &mime_type, structure.is_ok())
        {
            let err = InspectionError::rejected(format!(
                "Tipo MIME inválido: {}. Tipos permitidos: {}",
                mime_type,
                allowed_mime_types(format).join(", ")
            ));
            return self
                .reject(err, Some(format), metadata, checks)
                .with_mime_type(Some(mime_type));
        }

        let structure = match structure {
            Ok(structure) => structure,
            Err(err) => {
                return self
                    .reject(err, Some(format), metadata, checks)
                    .with_mime_type(Some(mime_type))
            }
        };
        metadata.merge(structure.metadata);

        for (name, check) in &checks {
            debug!(check = %name, passed = check.passed, "Security check");
        }
        let first_failure = checks
            .values()
            .find(|check| !check.passed)
            .map(|check| check.message.clone());
        if let Some(reason) = first_failure {
            let err = InspectionError::rejected(format!(
                "Falha na verificação de segurança: {}",
                reason
            ));
            return self
                .reject(err, Some(format), metadata, checks)
                .with_mime_type(Some(mime_type));
        }

        FileVerdict::accepted(format, mime_type, metadata, checks)
    }

    /// Resolve the concrete format; a mismatch is reported as an invalid signature
    fn signature<S: ByteSource>(
        &self,
        source: &mut S,
        extension: &str,
        size: u64,
    ) -> Result<ModelFormat, InspectionError> {
        let prefix = read_prefix(source, SIGNATURE_PREFIX_LEN)?;
        let matched = match extension {
            "stl" if stl::has_ascii_signature(&prefix) => Some(ModelFormat::StlAscii),
            "stl" => match stl::check_binary_consistency(source, size, &self.config) {
                Ok(_) => Some(ModelFormat::StlBinary),
                Err(InspectionError::Rejected(reason)) => {
                    debug!(reason = %reason, "Binary STL consistency check failed");
                    None
                }
                Err(e) => return Err(e),
            },
            "obj" => obj::has_signature(source, self.config.scan_cap)?.then_some(ModelFormat::Obj),
            "3mf" => three_mf::has_signature(&prefix).then_some(ModelFormat::ThreeMf),
            _ => None,
        };
        matched.ok_or_else(|| {
            InspectionError::rejected(format!(
                "Tipo de arquivo inválido: Assinatura de arquivo inválida para {}",
                extension
            ))
        })
    }

    fn structure<S: ByteSource>(
        &self,
        source: &mut S,
        format: ModelFormat,
        size: u64,
    ) -> Result<Structure, InspectionError> {
        let plain = |metadata| Structure {
            metadata,
            scan_sample: None,
        };
        match format {
            ModelFormat::StlBinary => stl::validate_binary(source, size, &self.config).map(plain),
            ModelFormat::StlAscii => stl::validate_ascii(source, &self.config).map(plain),
            ModelFormat::Obj => obj::validate(source).map(plain),
            ModelFormat::ThreeMf => three_mf::validate(
                source,
                self.config.max_3mf_model_entry,
                self.config.scan_cap,
            )
            .map(|report| Structure {
                metadata: report.metadata,
                scan_sample: Some(report.scan_sample),
            }),
        }
    }

    /// OBJ is scanned as stored; 3MF through its decompressed model part
    fn scan<S: ByteSource>(
        &self,
        source: &mut S,
        format: ModelFormat,
        structure: Option<&Structure>,
    ) -> Result<Option<&'static str>, InspectionError> {
        match format {
            ModelFormat::Obj => {
                let content = read_prefix(source, self.config.scan_cap)?;
                Ok(HeuristicScanner::scan(&content, format))
            }
            ModelFormat::ThreeMf => Ok(structure
                .and_then(|s| s.scan_sample.as_deref())
                .and_then(|sample| HeuristicScanner::scan(sample, format))),
            ModelFormat::StlBinary | ModelFormat::StlAscii => Ok(None),
        }
    }

    fn baseline_checks(&self, size: u64) -> SecurityChecks {
        let mut checks: SecurityChecks = CheckName::ALL
            .iter()
            .map(|name| (*name, SecurityCheck::passed(*name)))
            .collect();
        if size == 0 {
            checks.insert(CheckName::FileCorruption, SecurityCheck::failed("Arquivo vazio"));
        } else if size < self.config.min_model_size {
            checks.insert(
                CheckName::FileCorruption,
                SecurityCheck::failed("Arquivo muito pequeno para ser um modelo 3D válido"),
            );
        }
        if size > self.config.max_model_size {
            checks.insert(
                CheckName::MaliciousContent,
                SecurityCheck::failed("Arquivo excede o tamanho máximo razoável para um modelo 3D"),
            );
        }
        checks
    }

    fn reject(
        &self,
        err: InspectionError,
        format: Option<ModelFormat>,
        metadata: ModelMetadata,
        checks: SecurityChecks,
    ) -> FileVerdict {
        match &err {
            InspectionError::Rejected(reason) => {
                warn!(extension = %metadata.file_extension, reason = %reason, "Model rejected");
            }
            other => {
                error!(extension = %metadata.file_extension, error = %other, "Model inspection could not complete");
            }
        }
        FileVerdict::rejected(err.public_message(), err.failure(), metadata, checks)
            .with_format(format)
    }
}

fn mime_allowed(format: ModelFormat, mime_type: &str, structure_valid: bool) -> bool {
    if allowed_mime_types(format).contains(&mime_type) {
        return true;
    }
    let is_stl = matches!(format, ModelFormat::StlBinary | ModelFormat::StlAscii);
    is_stl && mime_type == OCTET_STREAM && structure_valid
}

fn normalize_extension(hint: &str) -> String {
    hint.trim().trim_start_matches('.').to_ascii_lowercase()
}
