use thiserror::Error;

/// Argument faults and level-codec resolution failures.
///
/// Domain outcomes (`PlacementStatus`, `ShapeSelectResult`, DLX's zero-solution case) and
/// deadline expiry (`timed_out` flags) are never wrapped in this type — they're values, not
/// faults, and are returned directly by the functions that produce them.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("shape matrix must have at least one row and one column")]
    EmptyShapeMatrix,

    #[error("anchor ({row}, {col}) is out of bounds for a {rows}x{cols} shape")]
    InvalidAnchor {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("coordinate ({row}, {col}) is out of bounds for a {rows}x{cols} board")]
    InvalidCoordinate {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("shape instance id must be positive, got {0}")]
    InvalidId(i64),

    #[error("board's target mask dimensions ({t_rows}x{t_cols}) do not match the grid ({rows}x{cols})")]
    TargetDimensionMismatch {
        rows: usize,
        cols: usize,
        t_rows: usize,
        t_cols: usize,
    },

    #[error("cover matrix has zero rows or zero columns and cannot be solved")]
    EmptyCoverMatrix,

    #[error("zip archive is missing required member '{0}'")]
    MissingMember(String),

    #[error("malformed JSON in member '{member}': {source}")]
    MalformedJson {
        member: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("shapeIds entry '{0}' does not resolve to any key of metadata.shapeIndex")]
    UnresolvedShapeId(String),

    #[error("shape source '{0}' could not be resolved (missing builtin or custom shape file)")]
    UnresolvedShapeSource(String),

    #[error("level.json target row {index} has length {actual}, expected {expected}")]
    TargetRowLengthMismatch {
        index: usize,
        actual: usize,
        expected: usize,
    },

    #[error("level.json target has {actual} rows, expected {expected}")]
    TargetRowCountMismatch { actual: usize, expected: usize },

    #[error("shape file row {index} has length {actual}, expected {expected} (matrix rows must share a common width)")]
    ShapeRowLengthMismatch {
        index: usize,
        actual: usize,
        expected: usize,
    },

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
