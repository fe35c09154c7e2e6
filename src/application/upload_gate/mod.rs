//! Accept-or-reject pipeline for uploaded files, ending in storage under the upload root

mod filename;
mod raster;

pub use raster::{
    fit_dimensions, is_valid_image, process_image, ImageProcessing, ImageProcessingError,
    ResizeOptions, DEFAULT_QUALITY,
};
pub use filename::{secure_filename, with_unique_suffix};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::ports::{Clock, StorageError, StoredUpload, UploadStore};
use crate::domain::inspection::{mime, FileVerdict, ModelInspector, MODEL_EXTENSIONS};
use crate::domain::upload::{extension_allowed, format_size, UploadedFile};
use crate::domain::value_objects::ContentHash;

pub const GENERIC_MAX_SIZE: u64 = 5 * 1024 * 1024;
pub const MODEL_MAX_SIZE: u64 = 50 * 1024 * 1024;

pub const GENERIC_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "pdf", "doc", "docx", "xls", "xlsx", "txt",
];

pub const GENERIC_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
];

/// Names tried before giving up on a taken destination
const PERSIST_ATTEMPTS: usize = 3;

/// Extensions whose content must decode as an image before storage
const CHECKED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    /// Message safe to show to the uploader
    pub fn public_message(&self) -> &'static str {
        match self {
            UploadError::Storage(StorageError::CreateDirectory(_)) => {
                "Erro ao criar diretório de destino"
            }
            UploadError::Storage(StorageError::Move(_) | StorageError::AlreadyExists(_)) => {
                "Erro ao mover arquivo para destino"
            }
            UploadError::Storage(StorageError::OutsideRoot(_)) => "Diretório de destino inválido",
            _ => "Não foi possível processar o arquivo",
        }
    }
}

/// Per-call knobs for [`UploadGate::process`]
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub max_size: u64,
    pub allowed_extensions: Vec<String>,
    /// Sniffed content type allow-list; `None` leaves MIME checks to the inspector
    pub allowed_mime_types: Option<Vec<String>>,
    /// Run 3D model uploads through the model inspector
    pub inspect_models: bool,
    pub preserve_original_name: bool,
    /// Resize pass for raster images after storage
    pub resize: Option<ResizeOptions>,
}

impl UploadOptions {
    /// Images and office documents up to 5 MB
    pub fn generic() -> Self {
        Self {
            max_size: GENERIC_MAX_SIZE,
            allowed_extensions: GENERIC_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            allowed_mime_types: Some(GENERIC_MIME_TYPES.iter().map(|m| m.to_string()).collect()),
            inspect_models: false,
            preserve_original_name: false,
            resize: None,
        }
    }

    /// STL, OBJ and 3MF up to 50 MB, inspected before storage
    pub fn models() -> Self {
        Self {
            max_size: MODEL_MAX_SIZE,
            allowed_extensions: MODEL_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            allowed_mime_types: None,
            inspect_models: true,
            preserve_original_name: false,
            resize: None,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn preserving_original_name(mut self) -> Self {
        self.preserve_original_name = true;
        self
    }

    pub fn with_resize(mut self, resize: ResizeOptions) -> Self {
        self.resize = Some(resize);
        self
    }
}

/// A file that made it into the upload root
#[derive(Debug, Clone, Serialize)]
pub struct StoredFileInfo {
    /// Generated storage name
    pub name: String,
    pub original_name: String,
    /// Relative to the upload root
    pub path: PathBuf,
    pub full_path: PathBuf,
    pub size: u64,
    pub declared_mime: Option<String>,
    /// Extension as written in the original name
    pub extension: String,
    pub checksum: ContentHash,
    /// Present for inspected 3D models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<FileVerdict>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadRejection {
    pub message: String,
    /// Inspection breakdown when a 3D model was refused
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<FileVerdict>,
}

impl UploadRejection {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            verdict: None,
        }
    }
}

/// Result of the pre-storage checks
#[derive(Debug, Clone)]
pub enum Screening {
    Accepted { verdict: Option<FileVerdict> },
    Rejected(UploadRejection),
}

#[derive(Debug, Clone)]
pub enum UploadOutcome {
    Stored(StoredFileInfo),
    Rejected(UploadRejection),
}

impl UploadOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, UploadOutcome::Stored(_))
    }

    pub fn message(&self) -> &str {
        match self {
            UploadOutcome::Stored(_) => "Arquivo enviado com sucesso",
            UploadOutcome::Rejected(rejection) => &rejection.message,
        }
    }
}

/// Validates uploads and moves accepted ones under the upload root.
///
/// Nothing is written before every content check has passed. When the
/// post-storage image pass fails the stored file is removed again.
pub struct UploadGate {
    store: Arc<dyn UploadStore>,
    inspector: ModelInspector,
    clock: Arc<dyn Clock>,
}

impl UploadGate {
    pub fn new(store: Arc<dyn UploadStore>, inspector: ModelInspector, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            inspector,
            clock,
        }
    }

    /// Checks that need no storage: transport status, size, extension,
    /// sniffed content type, image decodability and model inspection
    pub async fn screen(
        &self,
        file: &UploadedFile,
        options: &UploadOptions,
    ) -> Result<Screening, UploadError> {
        let reject = |message: String| Ok(Screening::Rejected(UploadRejection::new(message)));

        if file.temp_path.as_os_str().is_empty() {
            return reject("Nenhum arquivo enviado ou falha no upload".to_string());
        }
        if !file.status.is_ok() {
            return reject(file.status.message());
        }
        if file.size > options.max_size {
            return reject(format!(
                "O arquivo excede o tamanho máximo permitido de {}",
                format_size(options.max_size)
            ));
        }

        let extension = file.extension();
        if !extension_allowed(&extension, &options.allowed_extensions) {
            return reject(format!(
                "Extensão de arquivo não permitida. Extensões permitidas: {}",
                options.allowed_extensions.join(", ")
            ));
        }

        if let Some(allowed) = &options.allowed_mime_types {
            let sniffed = blocking({
                let path = file.temp_path.clone();
                move || mime::sniff_file(&path)
            })
            .await??;
            if !allowed.iter().any(|m| *m == sniffed) {
                warn!(file = %file.original_name, mime = %sniffed, "Upload content type not allowed");
                return reject("Tipo de arquivo não permitido".to_string());
            }
        }

        if CHECKED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            let path = file.temp_path.clone();
            if !blocking(move || is_valid_image(&path)).await? {
                return reject("O arquivo não é uma imagem válida".to_string());
            }
        }

        if options.inspect_models && MODEL_EXTENSIONS.contains(&extension.as_str()) {
            let inspector = self.inspector.clone();
            let path = file.temp_path.clone();
            let ext = extension.clone();
            let verdict = blocking(move || inspector.inspect_path(&path, &ext)).await?;
            if !verdict.is_valid() {
                return Ok(Screening::Rejected(UploadRejection {
                    message: verdict.message().to_string(),
                    verdict: Some(verdict),
                }));
            }
            return Ok(Screening::Accepted {
                verdict: Some(verdict),
            });
        }

        Ok(Screening::Accepted { verdict: None })
    }

    /// Screen the file, store it under `destination` and run the optional
    /// image pass
    pub async fn process(
        &self,
        file: &UploadedFile,
        destination: &str,
        options: &UploadOptions,
    ) -> Result<UploadOutcome, UploadError> {
        let verdict = match self.screen(file, options).await? {
            Screening::Accepted { verdict } => verdict,
            Screening::Rejected(rejection) => {
                warn!(file = %file.original_name, reason = %rejection.message, "Upload rejected");
                return Ok(UploadOutcome::Rejected(rejection));
            }
        };

        let directory = Path::new(destination.trim_matches(|c| c == '/' || c == '\\'));
        let (mut stored, filename) = self
            .persist_unique(file, directory, options)
            .await
            .inspect_err(|e| error!(file = %file.original_name, error = %e, "Failed to store upload"))?;

        if let Some(resize) = options.resize.filter(|_| file.is_raster_image()) {
            // Nothing may stay in the root unless the whole pass succeeded
            let rejection = match self.post_process(&mut stored, &filename, resize).await {
                Ok(rejection) => rejection,
                Err(e) => {
                    error!(file = %filename, error = %e, "Post-processing failed, removing stored file");
                    self.discard(&stored.path).await;
                    return Err(e);
                }
            };
            if let Some(rejection) = rejection {
                self.discard(&stored.path).await;
                return Ok(UploadOutcome::Rejected(rejection));
            }
        }

        info!(
            file = %filename,
            original = %file.original_name,
            size = stored.size,
            checksum = %stored.checksum,
            "Upload stored"
        );
        Ok(UploadOutcome::Stored(StoredFileInfo {
            name: filename,
            original_name: file.original_name.clone(),
            path: stored.relative_path,
            full_path: stored.path,
            size: stored.size,
            declared_mime: file.declared_mime.clone(),
            extension: Path::new(&file.original_name)
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            checksum: stored.checksum,
            verdict,
        }))
    }

    /// Persist under a fresh name, adding a random suffix when the name is taken
    async fn persist_unique(
        &self,
        file: &UploadedFile,
        directory: &Path,
        options: &UploadOptions,
    ) -> Result<(StoredUpload, String), UploadError> {
        let base = secure_filename(
            &file.original_name,
            options.preserve_original_name,
            self.clock.now().timestamp(),
        );
        let mut filename = base.clone();
        let mut attempt = 1;
        loop {
            match self.store.persist(&file.temp_path, directory, &filename).await {
                Ok(stored) => return Ok((stored, filename)),
                Err(StorageError::AlreadyExists(path)) if attempt < PERSIST_ATTEMPTS => {
                    debug!(path = %path.display(), "Storage name taken, retrying with a suffix");
                    filename = with_unique_suffix(&base);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Resize a stored image in place and refresh its size and checksum.
    /// Returns a rejection when the image cannot be processed.
    async fn post_process(
        &self,
        stored: &mut StoredUpload,
        filename: &str,
        resize: ResizeOptions,
    ) -> Result<Option<UploadRejection>, UploadError> {
        let path = stored.path.clone();
        match blocking(move || process_image(&path, &resize)).await? {
            Ok(ImageProcessing::Resized { width, height }) => {
                stored.size = tokio::fs::metadata(&stored.path).await?.len();
                stored.checksum = self.store.checksum(&stored.path).await?;
                info!(file = %filename, width, height, "Stored image resized");
                Ok(None)
            }
            Ok(ImageProcessing::Unchanged { .. }) => Ok(None),
            Err(e) => {
                warn!(file = %filename, error = %e, "Image processing failed, removing stored file");
                Ok(Some(UploadRejection::new(e.to_string())))
            }
        }
    }

    async fn discard(&self, path: &Path) {
        if let Err(e) = self.store.delete(path).await {
            error!(path = %path.display(), error = %e, "Could not remove stored file");
        }
    }

    /// Delete a stored file by its path relative to the upload root.
    /// Returns `false` when it does not exist or lies outside the root.
    pub async fn delete_file(&self, relative_path: &str) -> Result<bool, UploadError> {
        match self.store.delete(Path::new(relative_path)).await {
            Ok(deleted) => Ok(deleted),
            Err(StorageError::OutsideRoot(path)) => {
                warn!(path = %path.display(), "Refusing to delete outside the upload root");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, UploadError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| UploadError::Internal(e.to_string()))
}
