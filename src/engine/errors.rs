use thiserror::Error;
use tracing::{debug, error};

use crate::store::StoreError;

/// Errors surfaced by a report evaluation. Classification happens here so
/// the transport layer can map deterministically: configuration errors are
/// the caller's to fix, everything else is internal.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid report configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("analytics store request failed: {0}")]
    Store(#[from] StoreError),

    #[error("malformed store response: {0}")]
    Response(String),
}

impl EvalError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, EvalError::Config(_))
    }

    pub fn log_error(&self) {
        match self {
            EvalError::Config(e) => {
                debug!("Report rejected: {}", e);
            }
            EvalError::Store(e) => {
                error!("Store request failed: {}", e);
                debug!("Store error details: {:?}", e);
            }
            EvalError::Response(msg) => {
                error!("Store response did not match the issued query: {}", msg);
            }
        }
    }
}

/// User-correctable descriptor problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("report has no view")]
    MissingView,

    #[error("report has no group-by")]
    MissingGroupBy,

    #[error("report has no distributed-by")]
    MissingDistributedBy,

    #[error("unsupported view: {0}")]
    UnsupportedView(String),

    #[error("incompatible dimensions: {0}")]
    IncompatibleDimensions(String),

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}
