//! Uploaded-file descriptor and helpers shared by the `file` field type and the upload gate

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raster formats the upload gate may decode and re-encode
pub const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Status reported by the transport for a received file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Ok,
    /// Exceeded the server-wide size limit
    IniSize,
    /// Exceeded the size declared by the form
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    /// Aborted by a server extension
    Extension,
    Unknown(i32),
}

impl UploadStatus {
    /// Map a numeric transport code (0 = OK)
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::IniSize => 1,
            Self::FormSize => 2,
            Self::Partial => 3,
            Self::NoFile => 4,
            Self::NoTmpDir => 6,
            Self::CantWrite => 7,
            Self::Extension => 8,
            Self::Unknown(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// User-facing message for a failed upload
    pub fn message(&self) -> String {
        match self {
            Self::Ok => "Upload concluído".to_string(),
            Self::IniSize => "O arquivo excede o tamanho máximo permitido pelo servidor".to_string(),
            Self::FormSize => {
                "O arquivo excede o tamanho máximo permitido pelo formulário".to_string()
            }
            Self::Partial => "O arquivo foi enviado parcialmente".to_string(),
            Self::NoFile => "Nenhum arquivo foi enviado".to_string(),
            Self::NoTmpDir => "Falta uma pasta temporária no servidor".to_string(),
            Self::CantWrite => "Falha ao gravar arquivo no disco".to_string(),
            Self::Extension => "Uma extensão do servidor interrompeu o upload do arquivo".to_string(),
            Self::Unknown(_) => "Erro desconhecido no upload".to_string(),
        }
    }

    /// Field-scoped variant of [`UploadStatus::message`]
    pub fn field_message(&self, field: &str) -> String {
        match self {
            Self::IniSize => format!(
                "O arquivo no campo '{}' excede o tamanho máximo permitido pelo servidor.",
                field
            ),
            Self::FormSize => format!(
                "O arquivo no campo '{}' excede o tamanho máximo permitido pelo formulário.",
                field
            ),
            Self::Partial => format!(
                "O arquivo no campo '{}' foi enviado apenas parcialmente.",
                field
            ),
            Self::NoFile => format!("Nenhum arquivo foi enviado no campo '{}'.", field),
            Self::NoTmpDir => {
                "Erro no servidor: diretório temporário não encontrado.".to_string()
            }
            Self::CantWrite => "Erro no servidor: falha ao escrever o arquivo no disco.".to_string(),
            Self::Extension => {
                "Erro no servidor: upload interrompido por uma extensão do servidor.".to_string()
            }
            Self::Ok | Self::Unknown(_) => format!(
                "Erro desconhecido no upload do arquivo no campo '{}'.",
                field
            ),
        }
    }
}

/// A file received by the transport layer and parked at a temporary location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Client-supplied name, untrusted
    pub original_name: String,
    pub temp_path: PathBuf,
    pub size: u64,
    pub status: UploadStatus,
    /// Client-declared content type, untrusted
    pub declared_mime: Option<String>,
}

impl UploadedFile {
    pub fn new(original_name: impl Into<String>, temp_path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            original_name: original_name.into(),
            temp_path: temp_path.into(),
            size,
            status: UploadStatus::Ok,
            declared_mime: None,
        }
    }

    /// Describe a file already on disk, taking its size from the filesystem
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(original_name, path, size))
    }

    pub fn with_status(mut self, status: UploadStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_declared_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Lowercased extension of the original name
    pub fn extension(&self) -> String {
        extension_of(&self.original_name)
    }

    pub fn is_raster_image(&self) -> bool {
        RASTER_EXTENSIONS.contains(&self.extension().as_str())
    }
}

/// Lowercased extension of a file name, empty when there is none
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Whether `extension` appears in `allowed`, ignoring case
pub fn extension_allowed(extension: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|a| a.eq_ignore_ascii_case(extension))
}

/// Human readable byte count, two decimal places at most ("5 MB", "1.5 KB")
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_size(50 * 1024 * 1024), "50 MB");
        assert_eq!(format_size(1263), "1.23 KB");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Model.STL"), "stl");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn test_extension_allowed_ignores_case() {
        let allowed = vec!["STL".to_string(), "obj".to_string()];
        assert!(extension_allowed("stl", &allowed));
        assert!(!extension_allowed("3mf", &allowed));
    }

    #[test]
    fn test_upload_status_codes() {
        assert_eq!(UploadStatus::from_code(0), UploadStatus::Ok);
        assert_eq!(UploadStatus::from_code(3), UploadStatus::Partial);
        assert_eq!(UploadStatus::from_code(42), UploadStatus::Unknown(42));
        assert_eq!(UploadStatus::Partial.code(), 3);
        assert!(UploadStatus::from_code(0).is_ok());
    }

    #[test]
    fn test_field_message_names_field() {
        assert_eq!(
            UploadStatus::Partial.field_message("avatar"),
            "O arquivo no campo 'avatar' foi enviado apenas parcialmente."
        );
    }

    #[test]
    fn test_is_raster_image() {
        assert!(UploadedFile::new("photo.JPG", "/tmp/x", 10).is_raster_image());
        assert!(!UploadedFile::new("doc.pdf", "/tmp/x", 10).is_raster_image());
    }
}
