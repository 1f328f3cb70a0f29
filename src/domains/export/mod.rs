pub mod archive;
pub mod category;
pub mod copier;
pub mod layout;
pub mod preview;
pub mod repository;
pub mod service;
pub mod transcript;
pub mod types;

pub use preview::TreeNode;
pub use repository::{ExportJobRepository, SqliteExportJobRepository};
pub use service::{ExportService, ExportServiceImpl};
pub use types::{ExportJob, ExportReport, ExportStatus, FULL_EXPORT_JOB_ID};
