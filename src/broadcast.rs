use ndarray::{ArrayViewD, Axis, IxDyn};

use crate::array::LabeledArray;
use crate::element::Element;
use crate::errors::{Error, Result};

/// The ordered union of dimension names across `inputs`: dimensions appear
/// in the order they are first seen scanning inputs left to right, never
/// reordered alphabetically or by size.
///
/// Conflicts are rejected here: same-named dimensions whose coordinate
/// labels disagree mean alignment has not run (`Alignment` error);
/// same-named dimensions with different sizes and no labels to reconcile
/// by are a `DimensionSizeMismatch`.
///
pub fn broadcast_dims<N: Element>(inputs: &[&LabeledArray<N>]) -> Result<Vec<String>> {
    let mut dims: Vec<String> = Vec::new();
    for array in inputs {
        for dim in array.dims() {
            if !dims.iter().any(|d| d == dim) {
                dims.push(dim.clone());
            }
        }
    }

    for dim in &dims {
        let mut size: Option<usize> = None;
        let mut axis: Option<&LabeledArray<N>> = None;
        for &array in inputs {
            let ax = match array.axis_index(dim) {
                Some(ax) => ax,
                None => continue,
            };
            if let (Some(prev), Some(current)) =
                (axis.and_then(|a| a.coord(dim)), array.coord(dim))
            {
                if !prev.same_labels(current) {
                    return Err(Error::Alignment {
                        dim: dim.clone(),
                        reason: "coordinate labels disagree; align inputs before broadcasting"
                            .to_string(),
                    });
                }
            }
            if array.coord(dim).is_some() {
                axis = Some(array);
            }
            let len = array.shape()[ax];
            match size {
                Some(expected) if expected != len => {
                    return Err(Error::DimensionSizeMismatch {
                        dim: dim.clone(),
                        expected,
                        actual: len,
                    });
                }
                _ => size = Some(len),
            }
        }
    }

    Ok(dims)
}

/// A broadcast plan over several inputs: the global dimension order, the
/// common shape, and per-input views ready to replay along the dimensions
/// each input lacks.
///
/// Each input view has length-1 virtual axes inserted for its missing
/// dimensions and its axes permuted into the global order; `view(i)`
/// expands it to the common shape with zero strides along virtual axes,
/// so no data is copied. This is the surface the numeric compute layer
/// consumes: it applies elementwise kernels to the views without knowing
/// about labels.
///
pub struct BroadcastViews<'a, N: Element> {
    dims: Vec<String>,
    shape: Vec<usize>,
    padded: Vec<ArrayViewD<'a, N>>,
}

impl<'a, N: Element> BroadcastViews<'a, N> {
    pub fn plan(inputs: &[&'a LabeledArray<N>]) -> Result<Self> {
        let dims = broadcast_dims(inputs)?;
        let shape: Vec<usize> = dims
            .iter()
            .map(|dim| {
                inputs
                    .iter()
                    .find_map(|array| array.axis_index(dim).map(|ax| array.shape()[ax]))
                    .expect("dimension collected from these inputs")
            })
            .collect();

        let mut padded = Vec::with_capacity(inputs.len());
        for &array in inputs {
            let mut view = array.values();
            let mut order: Vec<String> = array.dims().to_vec();
            for dim in &dims {
                if !order.iter().any(|d| d == dim) {
                    view = view.insert_axis(Axis(order.len()));
                    order.push(dim.clone());
                }
            }
            let perm: Vec<usize> = dims
                .iter()
                .map(|dim| {
                    order
                        .iter()
                        .position(|d| d == dim)
                        .expect("every global dimension was padded in")
                })
                .collect();
            padded.push(view.permuted_axes(IxDyn(&perm)));
        }

        Ok(Self {
            dims,
            shape,
            padded,
        })
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.padded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.padded.is_empty()
    }

    /// Input `index` expanded to the common shape. Virtual axes have zero
    /// stride: the same data replays for every position along them.
    ///
    pub fn view(&self, index: usize) -> ArrayViewD<'_, N> {
        self.padded[index]
            .broadcast(IxDyn(&self.shape))
            .expect("sizes validated while planning")
    }
}
