use std::path::PathBuf;

use crate::parser::ParseError;

/// Failures inside the record store. They are converted into notices at the
/// store boundary and never reach the caller as an `Err`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed table: {0}")]
    Parse(#[from] ParseError),
    #[error("column `{0}` is missing")]
    MissingColumn(&'static str),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid date `{0}`, expected YYYY-MM-DD or DD/MM/YYYY")]
    InvalidDate(String),
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    #[error("no records loaded in this session; list them first")]
    NoSnapshot,
    #[error("row {row} does not exist ({len} rows loaded)")]
    RowOutOfRange { row: usize, len: usize },
}

impl StoreError {
    /// Validation failures leave the medium untouched and are reported as
    /// rejections rather than failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDate(_)
                | Self::UnknownCategory(_)
                | Self::NoSnapshot
                | Self::RowOutOfRange { .. }
        )
    }
}
