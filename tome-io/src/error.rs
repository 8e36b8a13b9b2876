use thiserror::Error;

/// Error type for tome-io operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TomeError {
    /// The tome file could not be opened, or is not a valid container.
    #[error("Can't open tome file {path}: {reason}")]
    StoreOpen { path: String, reason: String },

    /// An expected dataset is missing, or its shape disagrees with its siblings.
    #[error("Invalid tome layout: {0}")]
    Schema(String),

    /// A dataset could not be decoded into the requested element type.
    #[error("Can't decode dataset '{path}': {reason}")]
    Decode { path: String, reason: String },

    /// A numeric index fell outside the bounds of a catalog.
    #[error("{kind} index {index} is out of range for a catalog of {len} entries")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// Any other read failure reported by the backing store.
    #[error("Backing store error: {0}")]
    Backend(String),
}

/// Result type alias for tome-io operations.
pub type Result<T> = std::result::Result<T, TomeError>;

#[cfg(feature = "hdf5")]
impl From<hdf5::Error> for TomeError {
    fn from(err: hdf5::Error) -> Self {
        TomeError::Backend(err.to_string())
    }
}
