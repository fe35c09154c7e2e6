mod content_hasher;
mod local_upload_store;
mod path_builder;

pub use content_hasher::ContentHasher;
pub use local_upload_store::LocalUploadStore;
pub use path_builder::{PathBuilder, TEMP_DIR};
