pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod graph;
pub mod insights;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod orchestrator;
pub mod query;
pub mod sampler;
pub mod synthesis;
pub mod text;
pub mod validator;

pub use context::PlatformContext;
pub use error::{AppError, Result};

use std::path::Path;
use std::sync::Arc;

/// Build a ready-to-use platform context rooted at `data_dir`: opens (or
/// creates) the SQLite database, runs migrations, and wires providers from
/// the environment. This is the one entry point a host binary needs.
pub fn bootstrap(data_dir: &Path) -> Result<Arc<PlatformContext>> {
    logging::init();
    let pool = db::init_db(data_dir)?;
    tracing::info!("database pool ready");
    Ok(Arc::new(PlatformContext::from_env(pool)))
}
