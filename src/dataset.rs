use std::sync::Arc;

use crate::align::{reindex, target_labels, Join};
use crate::array::LabeledArray;
use crate::axis::CoordinateAxis;
use crate::element::{Element, FillValue};
use crate::errors::{Error, Result};
use crate::resolver::{self, IndexRequest, Method};

/// A named member array of a dataset.
///
#[derive(Clone, Debug)]
pub struct Variable<N: Element> {
    /// Name of the variable, e.g. "precipitation"
    pub name: String,

    /// The labeled array holding this variable's data
    pub array: LabeledArray<N>,
}

/// A mapping from variable name to labeled array, with one shared
/// coordinate axis per labeled dimension used by every member that
/// declares that dimension.
///
/// Mutating operations return a new dataset, so merges are naturally
/// single-writer per instance while reads of already-merged arrays stay
/// freely concurrent.
///
#[derive(Clone, Debug)]
pub struct Dataset<N: Element> {
    variables: Vec<Variable<N>>,
    coordinates: Vec<Arc<CoordinateAxis>>,
    dims: Vec<(String, usize)>,
    attrs: Vec<(String, String)>,
}

impl<N: Element> Dataset<N> {
    pub fn new() -> Self {
        Self {
            variables: vec![],
            coordinates: vec![],
            dims: vec![],
            attrs: vec![],
        }
    }

    pub fn variables(&self) -> &[Variable<N>] {
        &self.variables
    }

    pub fn get_variable(&self, name: &str) -> Option<&Variable<N>> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn get_coordinate(&self, dim: &str) -> Option<&Arc<CoordinateAxis>> {
        self.coordinates.iter().find(|axis| axis.name() == dim)
    }

    pub fn coordinates(&self) -> &[Arc<CoordinateAxis>] {
        &self.coordinates
    }

    /// Every dimension any member declares, with its length.
    pub fn dims(&self) -> &[(String, usize)] {
        &self.dims
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims
            .iter()
            .find(|(name, _)| name == dim)
            .map(|(_, len)| *len)
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    /// Merge a new variable in with the default policy: outer join,
    /// missing-sentinel fill.
    ///
    pub fn merge(&self, name: &str, array: LabeledArray<N>) -> Result<Self> {
        self.merge_with(name, array, Join::Outer, FillValue::Sentinel)
    }

    /// Merge a new variable, reconciling each of its labeled dimensions
    /// against the container's coordinate axes under `join`.
    ///
    /// When the incoming array introduces labels the container has not
    /// seen, every existing member declaring that dimension is expanded
    /// onto the joined axis with `fill`. Unlabeled same-named dimensions
    /// must agree in length exactly; there are no labels to reconcile by.
    ///
    pub fn merge_with(
        &self,
        name: &str,
        array: LabeledArray<N>,
        join: Join,
        fill: FillValue<N>,
    ) -> Result<Self> {
        if self.get_variable(name).is_some() {
            return Err(Error::DuplicateVariable {
                name: name.to_string(),
            });
        }

        let mut variables = self.variables.clone();
        let mut coordinates = self.coordinates.clone();
        let mut incoming = array;

        for dim in incoming.dims().to_vec() {
            let ax = incoming
                .axis_index(&dim)
                .expect("dimension taken from this array");
            let incoming_len = incoming.shape()[ax];
            let container_axis = coordinates.iter().find(|a| a.name() == dim).cloned();
            let incoming_axis = incoming.coord(&dim).cloned();

            match (container_axis, incoming_axis) {
                (None, None) => {
                    if let Some(expected) = self.dim_len(&dim) {
                        if expected != incoming_len {
                            return Err(Error::DimensionSizeMismatch {
                                dim,
                                expected,
                                actual: incoming_len,
                            });
                        }
                    }
                }
                (Some(container), None) => {
                    if container.len() != incoming_len {
                        return Err(Error::DimensionSizeMismatch {
                            dim,
                            expected: container.len(),
                            actual: incoming_len,
                        });
                    }
                    // Adopt the container's labels for this dimension
                    incoming = incoming.with_shared_coord(container)?;
                }
                (None, Some(axis)) => {
                    if let Some(expected) = self.dim_len(&dim) {
                        if expected != axis.len() {
                            return Err(Error::DimensionSizeMismatch {
                                dim,
                                expected,
                                actual: axis.len(),
                            });
                        }
                    }
                    coordinates.push(axis);
                }
                (Some(container), Some(axis)) => {
                    if container.same_labels(&axis) {
                        incoming = incoming.with_shared_coord(container)?;
                        continue;
                    }
                    let labels = target_labels(&[container.as_ref(), axis.as_ref()], join)?;
                    let target = Arc::new(CoordinateAxis::new(dim.clone(), labels));
                    if target.len() != container.len() {
                        // Members with this dimension unlabeled cannot follow
                        for variable in &variables {
                            if let Some(member_ax) = variable.array.axis_index(&dim) {
                                if variable.array.coord(&dim).is_none() {
                                    return Err(Error::DimensionSizeMismatch {
                                        dim,
                                        expected: target.len(),
                                        actual: variable.array.shape()[member_ax],
                                    });
                                }
                            }
                        }
                    }
                    for variable in variables.iter_mut() {
                        if variable.array.coord(&dim).is_some() {
                            variable.array = reindex(&variable.array, &target, fill)?;
                        }
                    }
                    incoming = reindex(&incoming, &target, fill)?;
                    coordinates.retain(|a| a.name() != dim);
                    coordinates.push(target);
                }
            }
        }

        variables.push(Variable {
            name: name.to_string(),
            array: incoming,
        });
        let dims = derive_dims(&variables);
        Ok(Self {
            variables,
            coordinates,
            dims,
            attrs: self.attrs.clone(),
        })
    }

    /// Remove a variable, dropping coordinate axes no remaining member
    /// references.
    ///
    pub fn drop_variable(&self, name: &str) -> Result<Self> {
        let position = self
            .variables
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| Error::VariableNotFound {
                name: name.to_string(),
            })?;
        let mut variables = self.variables.clone();
        variables.remove(position);

        let coordinates = self
            .coordinates
            .iter()
            .filter(|axis| {
                variables
                    .iter()
                    .any(|v| v.array.dims().iter().any(|d| d == axis.name()))
            })
            .cloned()
            .collect();
        let dims = derive_dims(&variables);
        Ok(Self {
            variables,
            coordinates,
            dims,
            attrs: self.attrs.clone(),
        })
    }

    /// Label-based selection applied to every member declaring a requested
    /// dimension. Members share the freshly sliced axes.
    ///
    pub fn select_by_label(&self, requests: &[(&str, IndexRequest)]) -> Result<Self> {
        self.select_by_label_method(requests, Method::Exact)
    }

    pub fn select_by_label_method(
        &self,
        requests: &[(&str, IndexRequest)],
        method: Method,
    ) -> Result<Self> {
        let mut variables = self.variables.clone();
        let mut coordinates = self.coordinates.clone();

        for (dim, request) in requests {
            let (resolved, new_axis) = match self.get_coordinate(dim) {
                Some(axis) => {
                    let resolved = resolver::resolve(axis, request, method)?;
                    let sliced = Arc::new(axis.take(&resolved.positions())?);
                    (resolved, Some(sliced))
                }
                None => {
                    let len = self.dim_len(dim).ok_or_else(|| Error::DimensionNotFound {
                        dim: dim.to_string(),
                    })?;
                    (resolver::resolve_positional(len, dim, request)?, None)
                }
            };

            for variable in variables.iter_mut() {
                if let Some(ax) = variable.array.axis_index(dim) {
                    variable.array =
                        variable
                            .array
                            .apply_selection(ax, &resolved, new_axis.clone())?;
                }
            }
            if let Some(sliced) = new_axis {
                for axis in coordinates.iter_mut() {
                    if axis.name() == *dim {
                        *axis = Arc::clone(&sliced);
                    }
                }
            }
        }

        let dims = derive_dims(&variables);
        Ok(Self {
            variables,
            coordinates,
            dims,
            attrs: self.attrs.clone(),
        })
    }

    /// Rename a dimension across the container and every member.
    ///
    pub fn rename_dim(&self, old: &str, new: &str) -> Result<Self> {
        if self.dim_len(old).is_none() {
            return Err(Error::DimensionNotFound {
                dim: old.to_string(),
            });
        }
        if old != new && self.dim_len(new).is_some() {
            return Err(Error::DuplicateDimension {
                dim: new.to_string(),
            });
        }

        let renamed = self
            .get_coordinate(old)
            .map(|axis| Arc::new(CoordinateAxis::new(new, axis.labels().to_vec())));

        let mut variables = self.variables.clone();
        for variable in variables.iter_mut() {
            if variable.array.axis_index(old).is_some() {
                let mut array = variable.array.rename_dim(old, new)?;
                if let Some(shared) = &renamed {
                    if array.coord(new).is_some() {
                        array = array.with_shared_coord(Arc::clone(shared))?;
                    }
                }
                variable.array = array;
            }
        }

        let coordinates = self
            .coordinates
            .iter()
            .map(|axis| {
                if axis.name() == old {
                    Arc::clone(renamed.as_ref().expect("axis exists under the old name"))
                } else {
                    Arc::clone(axis)
                }
            })
            .collect();
        let dims = derive_dims(&variables);
        Ok(Self {
            variables,
            coordinates,
            dims,
            attrs: self.attrs.clone(),
        })
    }
}

impl<N: Element> Default for Dataset<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_dims<N: Element>(variables: &[Variable<N>]) -> Vec<(String, usize)> {
    let mut dims: Vec<(String, usize)> = Vec::new();
    for variable in variables {
        for (dim, &len) in variable
            .array
            .dims()
            .iter()
            .zip(variable.array.shape().iter())
        {
            if !dims.iter().any(|(name, _)| name == dim) {
                dims.push((dim.clone(), len));
            }
        }
    }
    dims
}
