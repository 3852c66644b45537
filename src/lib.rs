//! Procurement file tracking core.
//!
//! Tracks procurement files through named, ordered process steps, each
//! with an SLA deadline. The engine owns file creation (including
//! backdated history), transactional step advancement, overdue
//! notification generation and officer-to-officer transfer. HTTP
//! transport, sessions and rendering live in consuming processes.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod officers;
pub mod sla;
pub mod transfer;
pub mod workflow;

pub use catalog::ProcessCatalog;
pub use db::Db;
pub use error::TrackerError;
pub use officers::OfficerDirectory;
pub use sla::SlaMonitor;
pub use transfer::TransferCoordinator;
pub use workflow::{CreateFileRequest, WorkflowEngine};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a host process. Call once at startup.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
