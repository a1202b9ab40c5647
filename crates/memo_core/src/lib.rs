//! Memo persistence core.
//! Validates memo input and delegates storage to a swappable driver.

pub mod config;
pub mod context;
pub mod db;
pub mod driver;
pub mod logging;
pub mod model;
pub mod store;
pub mod uid;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use context::{ContextError, ExecContext};
pub use driver::{DriverError, DriverResult, MemoDriver, SqliteMemoDriver};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::memo::{Memo, MemoId, MemoOrganizer, RowStatus, TagAmount, Visibility};
pub use model::query::{DeleteMemo, FindMemo, UpdateMemo};
pub use store::{Store, StoreError, StoreResult, ValidationError};
pub use uid::{generate_uid, is_valid_uid};

/// Opens the configured database and builds a store over it.
///
/// Starts file logging first when `cfg.logging.dir` is set.
pub fn open_store(cfg: &CoreConfig) -> Result<Store<SqliteMemoDriver>, OpenError> {
    init_logging_from_config(&cfg.logging)?;
    let driver = SqliteMemoDriver::open(&cfg.database)?;
    Ok(Store::new(driver))
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, open_store, CoreConfig, ExecContext, FindMemo};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn default_config_opens_empty_in_memory_store() {
        let store = open_store(&CoreConfig::default()).unwrap();
        let memos = store
            .list_memos(&ExecContext::background(), &FindMemo::default())
            .unwrap();
        assert!(memos.is_empty());
    }
}
