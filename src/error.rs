use thiserror::Error;

/// Error taxonomy for the inventory pipeline.
///
/// Every variant is local to one failing operation: callers keep their
/// previously committed table because each stage computes its replacement
/// table in full before the shared reference is overwritten.
#[derive(Debug, Error)]
pub enum SheetError {
    /// A required column was absent from the loaded schema.
    #[error("missing required column: {0}")]
    Schema(String),

    /// A sort or grouping key does not exist in the table schema.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// The seed asset code has no trailing numeric suffix.
    #[error("invalid seed code: {0}")]
    InvalidSeedCode(String),

    /// The uploaded file extension is not one we know how to parse.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The underlying decoder rejected the file contents.
    #[error("there was an error processing this file: {0}")]
    Parse(String),

    /// Serializing the table for download failed.
    #[error("export failed: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SheetResult<T> = Result<T, SheetError>;
