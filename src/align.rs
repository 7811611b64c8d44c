use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use ndarray::{ArrayD, Axis, IxDyn};

use crate::array::LabeledArray;
use crate::axis::CoordinateAxis;
use crate::element::{Element, FillValue};
use crate::errors::{Error, Result};
use crate::label::Label;

/// Which labels survive alignment along a shared dimension.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Join {
    /// Union of labels.
    Outer,
    /// Intersection of labels.
    Inner,
    /// The first input's labels.
    Left,
    /// The last input's labels.
    Right,
    /// All inputs must already carry identical labels; no reindexing.
    Exact,
}

/// Reconcile coordinate labels along every dimension shared by two or more
/// inputs, reindexing each input onto one common axis per shared dimension.
///
/// Dimensions present in only one input, and unlabeled dimensions, are
/// left untouched. Inputs that already share identical labels are
/// short-circuited onto one axis handle without touching data. Outputs
/// sharing a dimension hold the same `Arc` axis, so downstream
/// broadcasting compares handles cheaply.
///
pub fn align<N: Element>(
    inputs: &[&LabeledArray<N>],
    join: Join,
    fill: FillValue<N>,
) -> Result<Vec<LabeledArray<N>>> {
    let mut outputs: Vec<LabeledArray<N>> = inputs.iter().map(|a| (*a).clone()).collect();

    // Shared dimensions in first-seen order scanning inputs left to right.
    let mut shared: Vec<String> = Vec::new();
    for array in inputs {
        for dim in array.dims() {
            if shared.iter().any(|d| d == dim) {
                continue;
            }
            let labeled = inputs.iter().filter(|a| a.coord(dim).is_some()).count();
            if labeled >= 2 {
                shared.push(dim.clone());
            }
        }
    }

    for dim in &shared {
        let axes: Vec<Arc<CoordinateAxis>> = outputs
            .iter()
            .filter_map(|a| a.coord(dim).cloned())
            .collect();

        if axes[1..].iter().all(|axis| axis.same_labels(&axes[0])) {
            let canonical = Arc::clone(&axes[0]);
            for out in outputs.iter_mut() {
                if let Some(ax) = out.axis_index(dim) {
                    if out.coord(dim).is_some() {
                        *out = out.replace_axis_handle(ax, Arc::clone(&canonical));
                    }
                }
            }
            continue;
        }

        if join == Join::Exact {
            return Err(Error::Alignment {
                dim: dim.clone(),
                reason: "exact join requires identical labels in identical order".to_string(),
            });
        }

        let refs: Vec<&CoordinateAxis> = axes.iter().map(|axis| axis.as_ref()).collect();
        let target = Arc::new(CoordinateAxis::new(dim.clone(), target_labels(&refs, join)?));
        for out in outputs.iter_mut() {
            if out.coord(dim).is_some() {
                *out = reindex(out, &target, fill)?;
            }
        }
    }

    Ok(outputs)
}

/// Compute the target label sequence for one shared dimension.
///
/// For outer and inner joins every input axis must be duplicate-free. The
/// target is sorted when every input is monotonic ascending; otherwise it
/// keeps first-seen order over the determining inputs, which is
/// deterministic for identical inputs.
///
pub fn target_labels(axes: &[&CoordinateAxis], join: Join) -> Result<Vec<Label>> {
    let dim = axes[0].name();
    match join {
        Join::Left => Ok(axes[0].labels().to_vec()),
        Join::Right => Ok(axes[axes.len() - 1].labels().to_vec()),
        Join::Exact => {
            if axes[1..].iter().all(|axis| axis.same_labels(axes[0])) {
                Ok(axes[0].labels().to_vec())
            } else {
                Err(Error::Alignment {
                    dim: dim.to_string(),
                    reason: "exact join requires identical labels in identical order".to_string(),
                })
            }
        }
        Join::Outer | Join::Inner => {
            for axis in axes {
                if !axis.is_unique() {
                    return Err(Error::AmbiguousAlignment {
                        dim: dim.to_string(),
                    });
                }
            }
            let sorted = axes
                .iter()
                .all(|axis| axis.is_monotonic() && axis.is_ascending());
            if join == Join::Outer {
                if sorted {
                    let union: BTreeSet<Label> = axes
                        .iter()
                        .flat_map(|axis| axis.labels().iter().cloned())
                        .collect();
                    Ok(union.into_iter().collect())
                } else {
                    let mut seen = HashSet::new();
                    let mut target = Vec::new();
                    for axis in axes {
                        for label in axis.labels() {
                            if seen.insert(label.clone()) {
                                target.push(label.clone());
                            }
                        }
                    }
                    Ok(target)
                }
            } else {
                // Intersection in the first input's order; already sorted
                // when the first input is.
                Ok(axes[0]
                    .labels()
                    .iter()
                    .filter(|label| axes[1..].iter().all(|axis| axis.contains(label)))
                    .cloned()
                    .collect())
            }
        }
    }
}

/// Reindex one labeled dimension of `array` onto `target`, which names the
/// dimension. Positions present in the source map directly; positions the
/// source lacks are filled. Returns a new array sharing the target axis
/// handle.
///
pub fn reindex<N: Element>(
    array: &LabeledArray<N>,
    target: &Arc<CoordinateAxis>,
    fill: FillValue<N>,
) -> Result<LabeledArray<N>> {
    let dim = target.name();
    let ax = array
        .axis_index(dim)
        .ok_or_else(|| Error::DimensionNotFound {
            dim: dim.to_string(),
        })?;
    let source = array
        .coord(dim)
        .cloned()
        .ok_or_else(|| Error::UnlabeledDimension {
            dim: dim.to_string(),
        })?;

    if source.same_labels(target) {
        return Ok(array.replace_axis_handle(ax, Arc::clone(target)));
    }
    if !source.is_unique() {
        return Err(Error::AmbiguousAlignment {
            dim: dim.to_string(),
        });
    }

    let mapping: Vec<Option<usize>> = target
        .labels()
        .iter()
        .map(|label| source.positions_of(label).first().copied())
        .collect();

    let all_present: Option<Vec<usize>> = mapping.iter().copied().collect();
    let data = match all_present {
        Some(positions) => array.data().select(Axis(ax), &positions).into_shared(),
        None => {
            let fill_value = fill.resolve(dim)?;
            let mut shape = array.shape().to_vec();
            shape[ax] = target.len();
            let mut out = ArrayD::from_elem(IxDyn(&shape), fill_value);
            for (position, src) in mapping.iter().enumerate() {
                if let Some(src) = *src {
                    out.index_axis_mut(Axis(ax), position)
                        .assign(&array.data().index_axis(Axis(ax), src));
                }
            }
            out.into_shared()
        }
    };

    Ok(array.rebuild_with(data, ax, Arc::clone(target)))
}
