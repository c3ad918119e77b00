use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ChebiError {
    #[error("invalid ChEBI id: {0}")]
    InvalidId(String),

    #[error("no name resolves for {0}; the id does not exist in this release")]
    UnknownId(String),

    #[error("download of {name} failed: {message}")]
    Download { name: String, message: String },

    #[error("EBI returned status {status} for {name}")]
    DownloadStatus { name: String, status: u16 },

    #[error("search request failed: {0}")]
    SearchHttp(String),

    #[error("search service returned status {status}: {message}")]
    SearchStatus { status: u16, message: String },

    #[error("malformed row in {file} at line {line}: {detail}")]
    MalformedRow {
        file: String,
        line: usize,
        detail: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
