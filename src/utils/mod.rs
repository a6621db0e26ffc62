pub mod content_scanner;
pub mod file_operations;
pub mod path_matcher;

pub use content_scanner::{contains_tag, contains_tag_with, default_encoding};
pub use file_operations::{copy_into, destination_for, is_valid_directory};
pub use path_matcher::PathMatcher;
