use std::collections::HashMap;
use std::ops::Range;

use crate::axis::CoordinateAxis;
use crate::errors::{Error, Result};
use crate::label::Label;

/// A per-dimension indexing request: by label or by position.
///
#[derive(Clone, Debug)]
pub enum IndexRequest {
    /// One label. On an axis with duplicate labels this selects every
    /// matching position, so the dimension survives selection.
    Scalar(Label),

    /// A list of labels; resolved positions preserve the request order,
    /// not the axis order, so a selection can also reorder.
    Labels(Vec<Label>),

    /// An inclusive label range. Requires a monotonic axis.
    LabelRange(Label, Label),

    /// An inclusive label range taking every `step`-th position of the
    /// resolved range. Requires a monotonic axis.
    LabelRangeStep(Label, Label, usize),

    /// A single integer position.
    Position(usize),

    /// A list of integer positions, in request order.
    Positions(Vec<usize>),

    /// A half-open position range.
    PositionRange(Range<usize>),
}

/// How to treat a requested label that is absent from the axis.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Method {
    /// Absent labels are an error.
    Exact,

    /// Use the last position at or before the label.
    Pad,

    /// Use the first position at or after the label.
    Backfill,

    /// Use the closest position by absolute distance.
    Nearest { tolerance: Option<f64> },
}

/// Concrete integer positions for one dimension, ready for buffer
/// extraction: either a contiguous range or an explicit list.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Range(Range<usize>),
    List(Vec<usize>),
}

impl Resolved {
    pub fn len(&self) -> usize {
        match self {
            Resolved::Range(range) => range.len(),
            Resolved::List(positions) => positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn positions(&self) -> Vec<usize> {
        match self {
            Resolved::Range(range) => range.clone().collect(),
            Resolved::List(positions) => positions.clone(),
        }
    }
}

/// Translate a labeled request into integer positions on one axis.
///
/// Exact scalar lookups on a duplicate-label axis return every matching
/// position. A label absent from the axis resolves through `method`; with
/// `Method::Exact` it is a `LabelNotFound` error.
///
pub fn resolve(axis: &CoordinateAxis, request: &IndexRequest, method: Method) -> Result<Resolved> {
    match request {
        IndexRequest::Scalar(label) => {
            Ok(Resolved::List(lookup_one(axis, label, method)?))
        }
        IndexRequest::Labels(labels) => {
            let mut positions = Vec::with_capacity(labels.len());
            for label in labels {
                positions.extend(lookup_one(axis, label, method)?);
            }
            Ok(Resolved::List(positions))
        }
        IndexRequest::LabelRange(start, stop) => {
            Ok(Resolved::Range(axis.slice_between(start, stop)?))
        }
        IndexRequest::LabelRangeStep(start, stop, step) => {
            Ok(Resolved::List(axis.slice_between_step(start, stop, *step)?))
        }
        IndexRequest::Position(_)
        | IndexRequest::Positions(_)
        | IndexRequest::PositionRange(_) => resolve_positional(axis.len(), axis.name(), request),
    }
}

/// Translate a positional request for a dimension of size `len`. The only
/// resolution available to unlabeled dimensions; label requests fail with
/// `UnlabeledDimension`.
///
pub fn resolve_positional(len: usize, dim: &str, request: &IndexRequest) -> Result<Resolved> {
    let check = |position: usize| -> Result<usize> {
        if position < len {
            Ok(position)
        } else {
            Err(Error::PositionOutOfBounds {
                dim: dim.to_string(),
                position,
                len,
            })
        }
    };
    match request {
        IndexRequest::Position(position) => Ok(Resolved::List(vec![check(*position)?])),
        IndexRequest::Positions(positions) => {
            let positions = positions
                .iter()
                .map(|&position| check(position))
                .collect::<Result<Vec<_>>>()?;
            Ok(Resolved::List(positions))
        }
        IndexRequest::PositionRange(range) => {
            if range.end > len {
                return Err(Error::PositionOutOfBounds {
                    dim: dim.to_string(),
                    position: range.end,
                    len,
                });
            }
            Ok(Resolved::Range(range.clone()))
        }
        _ => Err(Error::UnlabeledDimension {
            dim: dim.to_string(),
        }),
    }
}

fn lookup_one(axis: &CoordinateAxis, label: &Label, method: Method) -> Result<Vec<usize>> {
    let positions = axis.positions_of(label);
    if !positions.is_empty() {
        return Ok(positions.to_vec());
    }
    match method {
        Method::Exact => Err(Error::LabelNotFound {
            dim: axis.name().to_string(),
            label: label.clone(),
        }),
        Method::Pad => Ok(vec![axis.pad(label)?]),
        Method::Backfill => Ok(vec![axis.backfill(label)?]),
        Method::Nearest { tolerance } => Ok(vec![axis.nearest(label, tolerance)?]),
    }
}

/// Partition an axis into groups by label equality, in first-seen order.
/// The grouping hook for split-apply-combine layers.
///
pub fn group_positions(axis: &CoordinateAxis) -> Vec<(Label, Vec<usize>)> {
    let mut groups: Vec<(Label, Vec<usize>)> = Vec::new();
    let mut seen: HashMap<Label, usize> = HashMap::new();
    for (position, label) in axis.labels().iter().enumerate() {
        match seen.get(label) {
            Some(&slot) => groups[slot].1.push(position),
            None => {
                seen.insert(label.clone(), groups.len());
                groups.push((label.clone(), vec![position]));
            }
        }
    }
    groups
}
