use std::result;

use crate::label::Label;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("label {label} not found on dimension {dim}")]
    LabelNotFound { dim: String, label: Label },

    #[error("dimension {dim} is not sorted; label ranges require a monotonic axis")]
    UnorderedSlice { dim: String },

    #[error(
        "nearest match for {label} on dimension {dim} is {distance} away, \
         beyond tolerance {tolerance}"
    )]
    ToleranceExceeded {
        dim: String,
        label: Label,
        distance: f64,
        tolerance: f64,
    },

    #[error("cannot align dimension {dim}: {reason}")]
    Alignment { dim: String, reason: String },

    #[error("duplicate labels on dimension {dim} make alignment ambiguous")]
    AmbiguousAlignment { dim: String },

    #[error("conflicting sizes for dimension {dim}: {expected} != {actual}")]
    DimensionSizeMismatch {
        dim: String,
        expected: usize,
        actual: usize,
    },

    #[error("no dimension named {dim}")]
    DimensionNotFound { dim: String },

    #[error("dimension {dim} has no coordinate labels; only positional indexing is supported")]
    UnlabeledDimension { dim: String },

    #[error("position {position} out of bounds for dimension {dim} of size {len}")]
    PositionOutOfBounds {
        dim: String,
        position: usize,
        len: usize,
    },

    #[error(
        "alignment on dimension {dim} requires a fill value and the element \
         type has no missing sentinel"
    )]
    MissingFillValue { dim: String },

    #[error("variable {name} already exists in dataset")]
    DuplicateVariable { name: String },

    #[error("no variable named {name} in dataset")]
    VariableNotFound { name: String },

    #[error("dimension {dim} already exists")]
    DuplicateDimension { dim: String },

    #[error("data has {actual} axes but {expected} dimension names were given")]
    ShapeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = result::Result<T, Error>;
