pub mod format;
pub mod summary;
