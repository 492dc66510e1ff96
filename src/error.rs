/// Error types shared by the summarizing core
use thiserror::Error;

/// Reasons a single HSP cannot be normalized.
///
/// These are isolated per HSP: the plot pass skips the HSP and counts it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HspError {
    #[error("HSP has a zero {side} frame")]
    ZeroFrame { side: &'static str },

    #[error("HSP {side} offsets must be 1-based, got {start}..{end}")]
    ZeroOffset {
        side: &'static str,
        start: u64,
        end: u64,
    },

    #[error("HSP {side} offsets {start}..{end} disagree with frame {frame}")]
    OrientationMismatch {
        side: &'static str,
        start: u64,
        end: u64,
        frame: i8,
    },

    #[error("HSP query offsets {start}..{end} exceed query length {query_length}")]
    BeyondQuery {
        start: u64,
        end: u64,
        query_length: usize,
    },
}

/// Errors returned by aggregation and plot computation.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Bad parameter, sort key or filter setting.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid title regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid HSP: {0}")]
    Hsp(#[from] HspError),

    /// The two passes over the record source disagree.
    #[error("Record source changed between passes: expected {expected} records, found {found}")]
    RecordCountMismatch { expected: usize, found: usize },

    /// A query length reference does not line up with the records.
    #[error("Query lengths do not match records: {records} records but {lengths} query lengths")]
    LengthCountMismatch { records: usize, lengths: usize },

    #[error("No length known for query {0:?}")]
    MissingQueryLength(String),

    #[error("Title {0:?} already present")]
    DuplicateTitle(String),

    #[error("Score {score} for title {title:?} is outside [0, 1]")]
    ScoreOutOfRange { title: String, score: f64 },

    /// Failure while decoding records.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SummaryError>;
