//! Input validation shared by configuration loading and metadata fetching.

pub mod url;

pub use self::url::{UrlValidationError, UrlValidationOptions, validate_metadata_location};
