//! # modelgate - input hardening for upload and form endpoints
//!
//! Validation, sanitization and abuse controls that sit in front of a web
//! application, built on Clean Architecture principles.
//!
//! ## Architecture Layers
//!
//! - **Domain**: Sanitizer, field validator, 3D model inspector, value objects
//! - **Application**: Rate limiter, brute-force guard, upload gate and their ports
//! - **Infrastructure**: In-memory and Postgres adapters, local upload storage
//!
//! ## Key Features
//!
//! - Structural inspection of STL, OBJ and 3MF uploads
//! - Typed field validation with Brazilian document checks
//! - Fixed-window rate limiting with a violation audit trail
//! - Lockout after repeated failed attempts
//!
//! ## Example Usage
//!
//! ```no_run
//! use modelgate::domain::inspection::ModelInspector;
//!
//! let verdict = ModelInspector::default().inspect_path("part.stl".as_ref(), "stl");
//! if !verdict.is_valid() {
//!     eprintln!("{}", verdict.message());
//! }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export key types explicitly to avoid ambiguity
pub use application::brute_force::{BruteForceGuard, BruteForceSettings};
pub use application::ports;
pub use application::rate_limiting::{FailurePolicy, RateLimiter, RateLimitSettings};
pub use application::upload_gate::{UploadGate, UploadOptions, UploadOutcome};
pub use config::Config;
pub use domain::errors as domain_errors;
pub use domain::inspection::{FileVerdict, InspectorConfig, ModelInspector};
pub use domain::sanitization::{SanitizeKind, Sanitizer};
pub use domain::validation::{FieldType, FieldValidator, ValidationOptions};
pub use domain::{entities, value_objects};
