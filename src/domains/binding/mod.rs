pub mod repository;
pub mod types;

pub use repository::{BindingRepository, SqliteBindingRepository};
pub use types::{AudioRef, BindingRecord, CategoryRef, TextRef};
