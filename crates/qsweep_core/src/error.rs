use std::fmt;

/// Errors raised while building, running or reading a parameter sweep
#[derive(Debug, Clone, PartialEq)]
pub enum SweepError {
    /// No axis with this name exists in the parameter set
    UnknownAxis(String),
    /// Positional axis lookup past the last axis
    AxisIndexOutOfRange { index: usize, count: usize },
    /// Reorder argument is neither a permutation of names nor of indices
    InvalidOrdering(String),
    /// Index tuple or selector has the wrong number of entries
    DimensionMismatch { expected: usize, found: usize },
    /// Index along one axis exceeds that axis' length
    PointIndexOutOfRange {
        axis: String,
        index: usize,
        count: usize,
    },
    /// Selection leaves a different number of free axes than the operation needs
    AmbiguousSelection { expected: usize, free_axes: usize },
    /// No subsystem with this name exists in the system
    UnknownSubsystem(String),
    /// Product-state label does not fit the subsystem dimensions
    InvalidLabel(Vec<usize>),
    /// Result store has no entry under this name
    MissingResult(String),
    /// Result store entry exists but holds a different kind of data
    ResultKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Data length does not match the shape implied by the dimensions
    ShapeMismatch { expected: usize, found: usize },
    /// The update function rejected a parameter point
    Update(String),
    /// A subsystem or composite eigen-solve failed
    Eigensolve {
        subsystem: Option<usize>,
        reason: String,
    },
    /// The worker pool could not be set up
    WorkerPool(String),
    /// Configuration error
    Config(String),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::UnknownAxis(name) => write!(f, "unknown axis '{name}'"),
            SweepError::AxisIndexOutOfRange { index, count } => {
                write!(f, "axis index {index} out of range for {count} axes")
            }
            SweepError::InvalidOrdering(detail) => {
                write!(f, "not a valid ordering for parameters: {detail}")
            }
            SweepError::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected} entries, got {found}")
            }
            SweepError::PointIndexOutOfRange { axis, index, count } => {
                write!(
                    f,
                    "index {index} out of range for axis '{axis}' with {count} values"
                )
            }
            SweepError::AmbiguousSelection {
                expected,
                free_axes,
            } => write!(
                f,
                "selection must leave {expected} free axes, found {free_axes}"
            ),
            SweepError::UnknownSubsystem(name) => write!(f, "unknown subsystem '{name}'"),
            SweepError::InvalidLabel(label) => {
                write!(f, "product-state label {label:?} does not fit the subsystems")
            }
            SweepError::MissingResult(name) => write!(f, "no sweep result named '{name}'"),
            SweepError::ResultKind {
                name,
                expected,
                found,
            } => write!(
                f,
                "sweep result '{name}' holds {found} data, expected {expected}"
            ),
            SweepError::ShapeMismatch { expected, found } => {
                write!(f, "shape mismatch: expected {expected} elements, got {found}")
            }
            SweepError::Update(msg) => write!(f, "system update failed: {msg}"),
            SweepError::Eigensolve {
                subsystem: Some(index),
                reason,
            } => write!(f, "eigensolve failed for subsystem {index}: {reason}"),
            SweepError::Eigensolve {
                subsystem: None,
                reason,
            } => write!(f, "eigensolve failed for composite system: {reason}"),
            SweepError::WorkerPool(msg) => write!(f, "worker pool error: {msg}"),
            SweepError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for SweepError {}

pub type Result<T> = std::result::Result<T, SweepError>;
