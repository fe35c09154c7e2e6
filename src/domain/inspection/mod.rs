//! Format-aware inspection of uploaded 3D models (STL, OBJ, 3MF)

mod byte_source;
mod config;
mod heuristics;
mod inspector;
pub mod mime;
pub mod obj;
pub mod stl;
pub mod three_mf;
mod verdict;

pub use byte_source::ByteSource;
pub use config::InspectorConfig;
pub use heuristics::HeuristicScanner;
pub use inspector::{allowed_mime_types, ModelInspector, MODEL_EXTENSIONS};
pub use verdict::{
    BoundingBox, CheckName, FileVerdict, InspectionError, InspectionFailure, ModelFormat,
    ModelMetadata, SecurityCheck, SecurityChecks,
};
