use std::fmt::Debug;

use num_traits::Num;

use crate::errors::{Error, Result};

/// Scalar types a labeled array can hold.
///
/// `MISSING` is the sentinel substituted for positions introduced by
/// alignment that had no source data: NaN for floats, absent for integers.
/// Integer alignment that actually needs a fill must supply one explicitly
/// (or widen to float first); there is no silent int-to-float promotion.
///
pub trait Element: Num + Copy + PartialOrd + Debug + 'static {
    const MISSING: Option<Self>;
}

impl Element for i32 {
    const MISSING: Option<Self> = None;
}

impl Element for i64 {
    const MISSING: Option<Self> = None;
}

impl Element for f32 {
    const MISSING: Option<Self> = Some(f32::NAN);
}

impl Element for f64 {
    const MISSING: Option<Self> = Some(f64::NAN);
}

/// Fill policy for positions introduced by alignment.
///
#[derive(Clone, Copy, Debug)]
pub enum FillValue<N> {
    /// Use the element type's missing sentinel. Fails at fill time for
    /// element types that have none.
    Sentinel,

    /// Use an explicit value.
    Value(N),
}

impl<N: Element> FillValue<N> {
    /// Resolve to a concrete value, or fail if the element type cannot
    /// represent a missing position. `dim` names the dimension being
    /// filled, for the error message.
    ///
    pub fn resolve(&self, dim: &str) -> Result<N> {
        match self {
            FillValue::Value(value) => Ok(*value),
            FillValue::Sentinel => N::MISSING.ok_or_else(|| Error::MissingFillValue {
                dim: dim.to_string(),
            }),
        }
    }
}
