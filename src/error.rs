use thiserror::Error;

// Unified error type for jacsolv

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("resource error: {0}")]
    Resource(String),
    #[error("device execution error while {op}: {detail}")]
    DeviceExecution { op: &'static str, detail: String },
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid device index {index} ({available} available, try '--list')")]
    InvalidDevice { index: usize, available: usize },
}

impl SolveError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SolveError::Configuration(msg.into())
    }

    pub(crate) fn device(op: &'static str, detail: impl ToString) -> Self {
        SolveError::DeviceExecution { op, detail: detail.to_string() }
    }
}

/// Allocate a zero-filled vector, reporting allocation failure instead of aborting.
pub(crate) fn try_zeroed<T: Copy + Default>(len: usize, what: &str) -> Result<Vec<T>, SolveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|e| {
        SolveError::Resource(format!("allocating {what} ({len} elements): {e}"))
    })?;
    v.resize(len, T::default());
    Ok(v)
}

/// Fallible `to_vec`.
pub(crate) fn try_copied<T: Copy + Default>(src: &[T], what: &str) -> Result<Vec<T>, SolveError> {
    let mut v = try_zeroed(src.len(), what)?;
    v.copy_from_slice(src);
    Ok(v)
}
