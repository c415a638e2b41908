use thiserror::Error;

/// Failures that stop an analysis outright instead of being reported in the result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("Hugging Face API token not found. Please set HUGGINGFACE_API_TOKEN in .env file")]
    MissingToken,
}

/// Uploaded content that cannot be turned into texts to analyze.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File is not valid UTF-8 text")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("Column not found in CSV: {0}")]
    ColumnNotFound(String),

    #[error("No text columns found in the CSV file")]
    NoTextColumn,

    #[error("No texts to analyze")]
    Empty,

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("CSV writer error: {0}")]
    Writer(String),
}
