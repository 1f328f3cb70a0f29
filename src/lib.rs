//! Audio-clip dataset finalization service.
//!
//! Projects ready audio/text bindings out of SQLite, materializes them into a
//! content store as a category-divided dataset (audio copies plus pipe-format
//! transcripts), packages the result as a single zip, and tracks background
//! export jobs.

pub mod api;
pub mod config;
pub mod db;
pub mod domains;
pub mod errors;
pub mod storage;
