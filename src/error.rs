use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Workbook could not be opened: {0}")]
    WorkbookOpen(#[from] calamine::Error),

    #[error("Worksheet '{sheet}' could not be read: {details}")]
    SheetRead { sheet: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
