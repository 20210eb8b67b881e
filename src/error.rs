use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WatchError {
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("search request failed: {0}")]
    SearchHttp(String),

    #[error("search returned status {status}: {message}")]
    SearchStatus { status: u16, message: String },

    #[error("malformed search response: {0}")]
    MalformedResponse(String),

    #[error("search response missing 'response' key")]
    MissingResponseKey,

    #[error("mail request failed: {0}")]
    MailHttp(String),

    #[error("mail provider returned status {status}: {message}")]
    MailStatus { status: u16, message: String },

    #[error("invalid mail region: {0}")]
    InvalidRegion(String),

    #[error("invalid sender address: {0}")]
    InvalidSender(String),

    #[error("sheets request failed: {0}")]
    SheetsHttp(String),

    #[error("sheets API returned status {status}: {message}")]
    SheetsStatus { status: u16, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
