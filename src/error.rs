use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Could not open workbook '{path}': {details}")]
    WorkbookOpen { path: String, details: String },

    #[error("Could not write workbook '{path}': {details}")]
    WorkbookWrite { path: String, details: String },

    #[error("No valid style sheets found in the plan workbook")]
    NoPlanStyles,

    #[error("No production data extracted from the daily production workbook")]
    NoActualData,

    #[error("No style produced any matched rows; nothing to report")]
    NoMatchedData,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
