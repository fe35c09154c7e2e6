pub mod entities;
pub mod errors;
pub mod inspection;
pub mod sanitization;
pub mod upload;
pub mod validation;
pub mod value_objects;
