use std::sync::Arc;

use ndarray::{ArcArray, ArrayD, ArrayViewD, Axis, IxDyn, Slice, Zip};
use num_traits::ToPrimitive;

use crate::align::{align, reindex, Join};
use crate::axis::CoordinateAxis;
use crate::broadcast::BroadcastViews;
use crate::element::{Element, FillValue};
use crate::errors::{Error, Result};
use crate::resolver::{self, IndexRequest, Method, Resolved};

/// An N-dimensional numeric buffer whose axes carry names and, optionally,
/// coordinate labels.
///
/// The buffer is shared copy-on-write (`ArcArray`), so selections and
/// alignments that reuse data are cheap. Dimension order matters for
/// storage layout only; every operation matches dimensions by name. A
/// dimension without a coordinate axis is valid and supports positional
/// indexing only. Operations return new arrays; nothing is mutated in
/// place.
///
#[derive(Clone, Debug)]
pub struct LabeledArray<N: Element> {
    data: ArcArray<N, IxDyn>,
    dims: Vec<String>,
    coords: Vec<Option<Arc<CoordinateAxis>>>,
    attrs: Vec<(String, String)>,
}

impl<N: Element> LabeledArray<N> {
    pub fn new<S: Into<String>>(data: ArrayD<N>, dims: Vec<S>) -> Result<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != data.ndim() {
            return Err(Error::ShapeMismatch {
                expected: dims.len(),
                actual: data.ndim(),
            });
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(Error::DuplicateDimension { dim: dim.clone() });
            }
        }
        let coords = vec![None; dims.len()];
        Ok(Self {
            data: data.into_shared(),
            dims,
            coords,
            attrs: vec![],
        })
    }

    /// Attach a coordinate axis to the dimension sharing its name.
    ///
    pub fn with_coord(self, axis: CoordinateAxis) -> Result<Self> {
        self.with_shared_coord(Arc::new(axis))
    }

    pub fn with_shared_coord(mut self, axis: Arc<CoordinateAxis>) -> Result<Self> {
        let ax = self
            .axis_index(axis.name())
            .ok_or_else(|| Error::DimensionNotFound {
                dim: axis.name().to_string(),
            })?;
        if axis.len() != self.data.shape()[ax] {
            return Err(Error::DimensionSizeMismatch {
                dim: axis.name().to_string(),
                expected: self.data.shape()[ax],
                actual: axis.len(),
            });
        }
        self.coords[ax] = Some(axis);
        Ok(self)
    }

    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Opaque metadata; never interpreted by the engine.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Read access to the raw buffer, for the compute layer.
    pub fn values(&self) -> ArrayViewD<'_, N> {
        self.data.view()
    }

    pub fn get(&self, index: &[usize]) -> N {
        self.data[IxDyn(index)]
    }

    pub fn axis_index(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// The coordinate axis for `dim`, if the dimension is labeled.
    pub fn coord(&self, dim: &str) -> Option<&Arc<CoordinateAxis>> {
        let ax = self.axis_index(dim)?;
        self.coords[ax].as_ref()
    }

    /// Label-based selection with exact matching.
    ///
    /// One request per dimension; dimensions without a request pass
    /// through untouched. A scalar request on a duplicate-label axis
    /// selects every matching position. Returns a new array whose
    /// coordinate axes are freshly constructed from the selection.
    ///
    pub fn select_by_label(&self, requests: &[(&str, IndexRequest)]) -> Result<Self> {
        self.select_by_label_method(requests, Method::Exact)
    }

    pub fn select_by_label_method(
        &self,
        requests: &[(&str, IndexRequest)],
        method: Method,
    ) -> Result<Self> {
        let mut out = self.clone();
        for (dim, request) in requests {
            let ax = out
                .axis_index(dim)
                .ok_or_else(|| Error::DimensionNotFound {
                    dim: dim.to_string(),
                })?;
            let resolved = match &out.coords[ax] {
                Some(axis) => resolver::resolve(axis, request, method)?,
                None => resolver::resolve_positional(out.data.shape()[ax], dim, request)?,
            };
            out = out.apply_selection(ax, &resolved, None)?;
        }
        Ok(out)
    }

    /// Positional selection; the only selection available to unlabeled
    /// dimensions.
    ///
    pub fn isel(&self, requests: &[(&str, IndexRequest)]) -> Result<Self> {
        let mut out = self.clone();
        for (dim, request) in requests {
            let ax = out
                .axis_index(dim)
                .ok_or_else(|| Error::DimensionNotFound {
                    dim: dim.to_string(),
                })?;
            let resolved = resolver::resolve_positional(out.data.shape()[ax], dim, request)?;
            out = out.apply_selection(ax, &resolved, None)?;
        }
        Ok(out)
    }

    /// Reindex one labeled dimension onto `target`, filling positions the
    /// source lacks.
    ///
    pub fn reindex(&self, target: &Arc<CoordinateAxis>, fill: FillValue<N>) -> Result<Self> {
        reindex(self, target, fill)
    }

    /// Reindex every dimension this array shares (labeled) with `other`
    /// onto `other`'s axes.
    ///
    pub fn reindex_like(&self, other: &Self, fill: FillValue<N>) -> Result<Self> {
        let mut out = self.clone();
        for dim in other.dims() {
            if let (Some(target), Some(_)) = (other.coord(dim), out.coord(dim)) {
                let target = Arc::clone(target);
                out = reindex(&out, &target, fill)?;
            }
        }
        Ok(out)
    }

    /// Binary elementwise combination: outer-align, broadcast by name,
    /// apply `op`. The compute itself is delegated to the closure.
    ///
    pub fn zip_with<F>(&self, other: &Self, fill: FillValue<N>, op: F) -> Result<Self>
    where
        F: Fn(N, N) -> N,
    {
        let aligned = align(&[self, other], Join::Outer, fill)?;
        let plan = BroadcastViews::plan(&[&aligned[0], &aligned[1]])?;
        let data = {
            let left = plan.view(0);
            let right = plan.view(1);
            Zip::from(&left).and(&right).map_collect(|&a, &b| op(a, b))
        };
        let dims = plan.dims().to_vec();
        let coords = dims
            .iter()
            .map(|dim| aligned.iter().find_map(|array| array.coord(dim).cloned()))
            .collect();
        Ok(Self {
            data: data.into_shared(),
            dims,
            coords,
            attrs: vec![],
        })
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, FillValue::Sentinel, |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, FillValue::Sentinel, |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, FillValue::Sentinel, |a, b| a * b)
    }

    /// Rename a dimension. The coordinate axis, if any, is rebuilt under
    /// the new name; labels are unchanged.
    ///
    pub fn rename_dim(&self, old: &str, new: &str) -> Result<Self> {
        let ax = self.axis_index(old).ok_or_else(|| Error::DimensionNotFound {
            dim: old.to_string(),
        })?;
        if old != new && self.dims.iter().any(|d| d == new) {
            return Err(Error::DuplicateDimension {
                dim: new.to_string(),
            });
        }
        let mut dims = self.dims.clone();
        dims[ax] = new.to_string();
        let mut coords = self.coords.clone();
        if let Some(axis) = &self.coords[ax] {
            coords[ax] = Some(Arc::new(CoordinateAxis::new(new, axis.labels().to_vec())));
        }
        Ok(Self {
            data: self.data.clone(),
            dims,
            coords,
            attrs: self.attrs.clone(),
        })
    }

    /// Reorder dimensions by name. `order` must name every dimension
    /// exactly once.
    ///
    pub fn transpose(&self, order: &[&str]) -> Result<Self> {
        if order.len() != self.dims.len() {
            return Err(Error::ShapeMismatch {
                expected: self.dims.len(),
                actual: order.len(),
            });
        }
        let mut perm = Vec::with_capacity(order.len());
        for dim in order {
            let ax = self.axis_index(dim).ok_or_else(|| Error::DimensionNotFound {
                dim: dim.to_string(),
            })?;
            if perm.contains(&ax) {
                return Err(Error::DuplicateDimension {
                    dim: dim.to_string(),
                });
            }
            perm.push(ax);
        }
        let data = self.data.clone().permuted_axes(IxDyn(&perm));
        let dims = perm.iter().map(|&ax| self.dims[ax].clone()).collect();
        let coords = perm.iter().map(|&ax| self.coords[ax].clone()).collect();
        Ok(Self {
            data,
            dims,
            coords,
            attrs: self.attrs.clone(),
        })
    }

    /// Drop every length-1 dimension.
    ///
    pub fn squeeze(&self) -> Self {
        let mut data = self.data.clone();
        let mut dims = self.dims.clone();
        let mut coords = self.coords.clone();
        for ax in (0..dims.len()).rev() {
            if data.shape()[ax] == 1 {
                data = data.index_axis_move(Axis(ax), 0);
                dims.remove(ax);
                coords.remove(ax);
            }
        }
        Self {
            data,
            dims,
            coords,
            attrs: self.attrs.clone(),
        }
    }

    /// Insert a new unlabeled length-1 dimension at `position`.
    ///
    pub fn expand_dims(&self, dim: &str, position: usize) -> Result<Self> {
        if self.dims.iter().any(|d| d == dim) {
            return Err(Error::DuplicateDimension {
                dim: dim.to_string(),
            });
        }
        if position > self.dims.len() {
            return Err(Error::PositionOutOfBounds {
                dim: dim.to_string(),
                position,
                len: self.dims.len(),
            });
        }
        let data = self.data.clone().insert_axis(Axis(position));
        let mut dims = self.dims.clone();
        dims.insert(position, dim.to_string());
        let mut coords = self.coords.clone();
        coords.insert(position, None);
        Ok(Self {
            data,
            dims,
            coords,
            attrs: self.attrs.clone(),
        })
    }

    /// Apply `f` to every element, preserving dims and coordinates.
    ///
    pub fn map_values<F: Fn(N) -> N>(&self, f: F) -> Self {
        Self {
            data: self.data.mapv(f).into_shared(),
            dims: self.dims.clone(),
            coords: self.coords.clone(),
            attrs: self.attrs.clone(),
        }
    }

    /// Extract the concrete buffer for the selected positions along one
    /// axis. `new_axis`, when given, replaces the selection-derived axis
    /// (used by `Dataset` so members share one sliced axis).
    ///
    pub(crate) fn apply_selection(
        &self,
        ax: usize,
        resolved: &Resolved,
        new_axis: Option<Arc<CoordinateAxis>>,
    ) -> Result<Self> {
        let data = match resolved {
            Resolved::Range(range) => self
                .data
                .slice_axis(Axis(ax), Slice::from(range.clone()))
                .to_owned()
                .into_shared(),
            Resolved::List(positions) => self.data.select(Axis(ax), positions).into_shared(),
        };
        let mut coords = self.coords.clone();
        coords[ax] = match new_axis {
            Some(axis) => Some(axis),
            None => match &self.coords[ax] {
                Some(axis) => Some(Arc::new(axis.take(&resolved.positions())?)),
                None => None,
            },
        };
        Ok(Self {
            data,
            dims: self.dims.clone(),
            coords,
            attrs: self.attrs.clone(),
        })
    }

    pub(crate) fn data(&self) -> &ArcArray<N, IxDyn> {
        &self.data
    }

    pub(crate) fn replace_axis_handle(&self, ax: usize, axis: Arc<CoordinateAxis>) -> Self {
        let mut coords = self.coords.clone();
        coords[ax] = Some(axis);
        Self {
            data: self.data.clone(),
            dims: self.dims.clone(),
            coords,
            attrs: self.attrs.clone(),
        }
    }

    pub(crate) fn rebuild_with(
        &self,
        data: ArcArray<N, IxDyn>,
        ax: usize,
        axis: Arc<CoordinateAxis>,
    ) -> Self {
        let mut coords = self.coords.clone();
        coords[ax] = Some(axis);
        Self {
            data,
            dims: self.dims.clone(),
            coords,
            attrs: self.attrs.clone(),
        }
    }
}

impl<N: Element + ToPrimitive> LabeledArray<N> {
    /// Explicit widening to f64, the step before sentinel-filled alignment
    /// of integral data.
    ///
    pub fn into_f64(&self) -> LabeledArray<f64> {
        LabeledArray {
            data: self
                .data
                .mapv(|v| v.to_f64().unwrap_or(f64::NAN))
                .into_shared(),
            dims: self.dims.clone(),
            coords: self.coords.clone(),
            attrs: self.attrs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::label::Label;

    fn time_series(labels: [i64; 3], values: [f64; 3]) -> LabeledArray<f64> {
        LabeledArray::new(array![values[0], values[1], values[2]].into_dyn(), vec!["time"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("time", labels))
            .unwrap()
    }

    #[test]
    fn test_new_validates_rank() {
        let result = LabeledArray::new(array![[1.0, 2.0]].into_dyn(), vec!["x"]);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));

        let result = LabeledArray::new(array![[1.0], [2.0]].into_dyn(), vec!["x", "x"]);
        assert!(matches!(result, Err(Error::DuplicateDimension { .. })));
    }

    #[test]
    fn test_with_coord_validates_length() {
        let result = LabeledArray::new(array![1.0, 2.0].into_dyn(), vec!["x"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("x", [1, 2, 3]));
        assert!(matches!(result, Err(Error::DimensionSizeMismatch { .. })));
    }

    #[test]
    fn test_select_by_label_scalar() {
        let array = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let selected = array
            .select_by_label(&[("time", IndexRequest::Scalar(Label::Int(2)))])
            .unwrap();
        assert_eq!(selected.shape(), &[1]);
        assert_eq!(selected.get(&[0]), 20.0);
        assert_eq!(selected.coord("time").unwrap().labels(), &[Label::Int(2)]);
    }

    #[test]
    fn test_select_by_label_duplicates_returns_all() {
        let array = LabeledArray::new(array![1.0, 2.0, 3.0, 4.0].into_dyn(), vec!["time"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("time", [1, 2, 2, 3]))
            .unwrap();
        let selected = array
            .select_by_label(&[("time", IndexRequest::Scalar(Label::Int(2)))])
            .unwrap();
        assert_eq!(selected.shape(), &[2]);
        assert_eq!(selected.get(&[0]), 2.0);
        assert_eq!(selected.get(&[1]), 3.0);
    }

    #[test]
    fn test_select_by_label_range() {
        let array = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let selected = array
            .select_by_label(&[(
                "time",
                IndexRequest::LabelRange(Label::Int(2), Label::Int(3)),
            )])
            .unwrap();
        assert_eq!(selected.shape(), &[2]);
        assert_eq!(selected.get(&[0]), 20.0);
    }

    #[test]
    fn test_select_reorders_by_request() {
        let array = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let selected = array
            .select_by_label(&[(
                "time",
                IndexRequest::Labels(vec![Label::Int(3), Label::Int(1)]),
            )])
            .unwrap();
        assert_eq!(selected.get(&[0]), 30.0);
        assert_eq!(selected.get(&[1]), 10.0);
        assert_eq!(
            selected.coord("time").unwrap().labels(),
            &[Label::Int(3), Label::Int(1)]
        );
    }

    #[test]
    fn test_select_nearest_method() {
        let array = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let selected = array
            .select_by_label_method(
                &[("time", IndexRequest::Scalar(Label::Float(2.4)))],
                Method::Nearest { tolerance: Some(0.5) },
            )
            .unwrap();
        assert_eq!(selected.get(&[0]), 20.0);
    }

    #[test]
    fn test_isel() {
        let array = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let selected = array
            .isel(&[("time", IndexRequest::Positions(vec![2, 0]))])
            .unwrap();
        assert_eq!(selected.get(&[0]), 30.0);
        assert_eq!(
            selected.coord("time").unwrap().labels(),
            &[Label::Int(3), Label::Int(1)]
        );
    }

    #[test]
    fn test_unlabeled_dimension_positional_only() {
        let array = LabeledArray::new(array![1.0, 2.0, 3.0].into_dyn(), vec!["x"]).unwrap();
        let selected = array
            .select_by_label(&[("x", IndexRequest::PositionRange(1..3))])
            .unwrap();
        assert_eq!(selected.shape(), &[2]);
        assert!(matches!(
            array.select_by_label(&[("x", IndexRequest::Scalar(Label::Int(1)))]),
            Err(Error::UnlabeledDimension { .. })
        ));
    }

    #[test]
    fn test_add_outer_aligns_and_fills() {
        let a = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let b = time_series([2, 3, 4], [1.0, 2.0, 3.0]);
        let sum = a.add(&b).unwrap();

        let time = sum.coord("time").unwrap();
        assert_eq!(
            time.labels(),
            &[Label::Int(1), Label::Int(2), Label::Int(3), Label::Int(4)]
        );
        assert!(sum.get(&[0]).is_nan());
        assert_eq!(sum.get(&[1]), 21.0);
        assert_eq!(sum.get(&[2]), 32.0);
        assert!(sum.get(&[3]).is_nan());
    }

    #[test]
    fn test_add_is_commutative_in_values() {
        let a = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let b = time_series([2, 3, 4], [1.0, 2.0, 3.0]);
        let ab = a.add(&b).unwrap();
        let ba = b.add(&a).unwrap();
        for i in 0..4 {
            let x = ab.get(&[i]);
            let y = ba.get(&[i]);
            assert!(x == y || (x.is_nan() && y.is_nan()));
        }
    }

    #[test]
    fn test_mul_broadcasts_by_name() {
        let a = LabeledArray::new(array![1.0, 2.0].into_dyn(), vec!["x"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("x", [0, 1]))
            .unwrap();
        let b = LabeledArray::new(array![10.0, 20.0, 30.0].into_dyn(), vec!["y"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("y", [0, 1, 2]))
            .unwrap();
        let product = a.mul(&b).unwrap();
        assert_eq!(product.dims(), &["x".to_string(), "y".to_string()]);
        assert_eq!(product.shape(), &[2, 3]);
        assert_eq!(product.get(&[1, 2]), 60.0);
    }

    #[test]
    fn test_broadcast_matches_by_name_not_position() {
        // Same dims, opposite storage order: must still line up by name.
        let a = LabeledArray::new(array![[1.0, 2.0], [3.0, 4.0]].into_dyn(), vec!["x", "y"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("x", [0, 1]))
            .unwrap()
            .with_coord(CoordinateAxis::ints("y", [0, 1]))
            .unwrap();
        let b = a.transpose(&["y", "x"]).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.get(&[0, 1]), 4.0);
        assert_eq!(sum.get(&[1, 0]), 6.0);
    }

    #[test]
    fn test_integer_arithmetic_without_fill_needed() {
        let a = LabeledArray::new(array![1_i64, 2, 3].into_dyn(), vec!["x"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("x", [0, 1, 2]))
            .unwrap();
        let sum = a.add(&a).unwrap();
        assert_eq!(sum.get(&[2]), 6);
    }

    #[test]
    fn test_integer_fill_requires_explicit_value() {
        let a = LabeledArray::new(array![1_i64, 2].into_dyn(), vec!["x"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("x", [0, 1]))
            .unwrap();
        let b = LabeledArray::new(array![1_i64, 2].into_dyn(), vec!["x"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("x", [1, 2]))
            .unwrap();
        assert!(matches!(a.add(&b), Err(Error::MissingFillValue { .. })));

        let sum = a.zip_with(&b, FillValue::Value(0), |x, y| x + y).unwrap();
        assert_eq!(sum.get(&[0]), 1); // 1 + fill
        assert_eq!(sum.get(&[1]), 3); // 2 + 1
        assert_eq!(sum.get(&[2]), 2); // fill + 2
    }

    #[test]
    fn test_into_f64() {
        let a = LabeledArray::new(array![1_i64, 2].into_dyn(), vec!["x"])
            .unwrap()
            .with_coord(CoordinateAxis::ints("x", [0, 1]))
            .unwrap();
        let widened = a.into_f64();
        assert_eq!(widened.get(&[1]), 2.0);
        assert!(widened.coord("x").is_some());
    }

    #[test]
    fn test_rename_dim() {
        let array = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let renamed = array.rename_dim("time", "t").unwrap();
        assert_eq!(renamed.dims(), &["t".to_string()]);
        assert_eq!(renamed.coord("t").unwrap().name(), "t");
        assert!(renamed.coord("time").is_none());
    }

    #[test]
    fn test_transpose() {
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let array = LabeledArray::new(data, vec!["x", "y"]).unwrap();
        let flipped = array.transpose(&["y", "x"]).unwrap();
        assert_eq!(flipped.shape(), &[3, 2]);
        assert_eq!(flipped.get(&[2, 1]), 6.0);
        assert!(matches!(
            array.transpose(&["x", "x"]),
            Err(Error::DuplicateDimension { .. })
        ));
    }

    #[test]
    fn test_squeeze_and_expand_dims() {
        let array = LabeledArray::new(array![1.0, 2.0].into_dyn(), vec!["x"]).unwrap();
        let expanded = array.expand_dims("batch", 0).unwrap();
        assert_eq!(expanded.shape(), &[1, 2]);
        assert_eq!(expanded.dims(), &["batch".to_string(), "x".to_string()]);

        let squeezed = expanded.squeeze();
        assert_eq!(squeezed.dims(), &["x".to_string()]);
        assert_eq!(squeezed.get(&[1]), 2.0);
    }

    #[test]
    fn test_map_values() {
        let array = time_series([1, 2, 3], [1.0, 2.0, 3.0]);
        let doubled = array.map_values(|v| v * 2.0);
        assert_eq!(doubled.get(&[2]), 6.0);
        assert_eq!(doubled.coord("time").unwrap().len(), 3);
    }

    #[test]
    fn test_reindex_like() {
        let a = time_series([1, 2, 3], [10.0, 20.0, 30.0]);
        let b = time_series([2, 3, 4], [0.0, 0.0, 0.0]);
        let reindexed = a.reindex_like(&b, FillValue::Sentinel).unwrap();
        assert_eq!(reindexed.shape(), &[3]);
        assert_eq!(reindexed.get(&[0]), 20.0);
        assert!(reindexed.get(&[2]).is_nan());
    }

    #[test]
    fn test_attrs_are_opaque() {
        let array = time_series([1, 2, 3], [1.0, 2.0, 3.0]).with_attr("units", "mm/day");
        assert_eq!(array.attrs(), &[("units".to_string(), "mm/day".to_string())]);
    }
}
