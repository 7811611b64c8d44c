use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use crate::errors::{Error, Result};
use crate::label::Label;

/// One named dimension's ordered sequence of coordinate labels.
///
/// An axis is immutable once constructed: selections and alignments build
/// fresh, smaller or re-ordered axes rather than mutating in place, so an
/// axis can be shared by reference across many arrays and a dataset
/// without locking. Uniqueness and monotonicity are derived at
/// construction, along with a hash of the label sequence used to
/// short-circuit alignment when two axes are already identical.
///
#[derive(Debug)]
pub struct CoordinateAxis {
    name: String,
    labels: Vec<Label>,
    lookup: HashMap<Label, Vec<usize>>,
    unique: bool,
    ascending: bool,
    descending: bool,
    labels_hash: u64,
}

impl CoordinateAxis {
    pub fn new<S: Into<String>>(name: S, labels: Vec<Label>) -> Self {
        let mut lookup: HashMap<Label, Vec<usize>> = HashMap::with_capacity(labels.len());
        for (position, label) in labels.iter().enumerate() {
            lookup.entry(label.clone()).or_default().push(position);
        }
        let unique = lookup.len() == labels.len();
        let ascending = labels.windows(2).all(|pair| pair[0] <= pair[1]);
        let descending = labels.windows(2).all(|pair| pair[0] >= pair[1]);

        let mut hasher = DefaultHasher::new();
        labels.hash(&mut hasher);
        let labels_hash = hasher.finish();

        Self {
            name: name.into(),
            labels,
            lookup,
            unique,
            ascending,
            descending,
            labels_hash,
        }
    }

    pub fn ints<S: Into<String>>(name: S, labels: impl IntoIterator<Item = i64>) -> Self {
        Self::new(name, labels.into_iter().map(Label::Int).collect())
    }

    pub fn floats<S: Into<String>>(name: S, labels: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, labels.into_iter().map(Label::Float).collect())
    }

    pub fn texts<S: Into<String>>(name: S, labels: impl IntoIterator<Item = &'static str>) -> Self {
        Self::new(name, labels.into_iter().map(Label::from).collect())
    }

    /// An evenly spaced time axis of epoch seconds.
    ///
    pub fn times<S: Into<String>>(name: S, start: i64, step: i64, steps: usize) -> Self {
        let labels = (0..steps)
            .map(|i| Label::Time(start + (i as i64) * step))
            .collect();
        Self::new(name, labels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn get(&self, position: usize) -> &Label {
        &self.labels[position]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// True iff no label occurs more than once.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// True iff the labels are sorted ascending or descending.
    pub fn is_monotonic(&self) -> bool {
        self.ascending || self.descending
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.lookup.contains_key(label)
    }

    /// Position of `label`, or `LabelNotFound`. On an axis with duplicate
    /// labels this is the first match; callers that need every match use
    /// `positions_of`.
    ///
    pub fn position_of(&self, label: &Label) -> Result<usize> {
        self.lookup
            .get(label)
            .map(|positions| positions[0])
            .ok_or_else(|| self.not_found(label))
    }

    /// All positions holding `label`, in axis order. Empty if absent.
    ///
    pub fn positions_of(&self, label: &Label) -> &[usize] {
        self.lookup
            .get(label)
            .map(|positions| positions.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve an inclusive label range to a contiguous position range.
    ///
    /// The bounds need not be present on the axis; every label falling
    /// between them is selected. Requires a monotonic axis (ascending or
    /// descending); resolution is a pair of binary searches. `start` is
    /// the bound nearer the beginning of the axis in the axis's own order.
    ///
    pub fn slice_between(&self, start: &Label, stop: &Label) -> Result<Range<usize>> {
        if self.ascending {
            let lo = self.labels.partition_point(|label| label < start);
            let hi = self.labels.partition_point(|label| label <= stop);
            Ok(lo..hi.max(lo))
        } else if self.descending {
            let lo = self.labels.partition_point(|label| label > start);
            let hi = self.labels.partition_point(|label| label >= stop);
            Ok(lo..hi.max(lo))
        } else {
            Err(Error::UnorderedSlice {
                dim: self.name.clone(),
            })
        }
    }

    /// `slice_between` with a stride: every `step`-th position of the
    /// resolved range, starting from its first. A zero step is treated
    /// as one.
    ///
    pub fn slice_between_step(
        &self,
        start: &Label,
        stop: &Label,
        step: usize,
    ) -> Result<Vec<usize>> {
        let range = self.slice_between(start, stop)?;
        Ok(range.step_by(step.max(1)).collect())
    }

    /// Position of the label closest to `label` by absolute distance.
    ///
    /// Ties break toward the lower position. With a tolerance, fails with
    /// `ToleranceExceeded` when the closest label is further away than
    /// allowed. Labels with no defined distance to the request (text
    /// against numeric, for instance) are never candidates.
    ///
    pub fn nearest(&self, label: &Label, tolerance: Option<f64>) -> Result<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (position, candidate) in self.labels.iter().enumerate() {
            if let Some(distance) = candidate.distance(label) {
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((position, distance));
                }
            }
        }
        let (position, distance) = best.ok_or_else(|| self.not_found(label))?;
        if let Some(tolerance) = tolerance {
            if distance > tolerance {
                return Err(Error::ToleranceExceeded {
                    dim: self.name.clone(),
                    label: label.clone(),
                    distance,
                    tolerance,
                });
            }
        }
        Ok(position)
    }

    /// Position of the last label at or before `label`. Requires a
    /// monotonic ascending axis.
    ///
    pub fn pad(&self, label: &Label) -> Result<usize> {
        self.require_ascending()?;
        let idx = self.labels.partition_point(|candidate| candidate <= label);
        if idx == 0 {
            Err(self.not_found(label))
        } else {
            Ok(idx - 1)
        }
    }

    /// Position of the first label at or after `label`. Requires a
    /// monotonic ascending axis.
    ///
    pub fn backfill(&self, label: &Label) -> Result<usize> {
        self.require_ascending()?;
        let idx = self.labels.partition_point(|candidate| candidate < label);
        if idx == self.labels.len() {
            Err(self.not_found(label))
        } else {
            Ok(idx)
        }
    }

    /// Build the fresh, smaller axis for a selection: label `positions`,
    /// in request order.
    ///
    pub fn take(&self, positions: &[usize]) -> Result<CoordinateAxis> {
        let mut labels = Vec::with_capacity(positions.len());
        for &position in positions {
            if position >= self.labels.len() {
                return Err(Error::PositionOutOfBounds {
                    dim: self.name.clone(),
                    position,
                    len: self.labels.len(),
                });
            }
            labels.push(self.labels[position].clone());
        }
        Ok(CoordinateAxis::new(self.name.clone(), labels))
    }

    /// Cheap label-sequence equality: hash comparison first, full
    /// comparison only on hash agreement.
    ///
    pub fn same_labels(&self, other: &CoordinateAxis) -> bool {
        self.labels_hash == other.labels_hash && self.labels == other.labels
    }

    fn require_ascending(&self) -> Result<()> {
        if self.ascending {
            Ok(())
        } else {
            Err(Error::UnorderedSlice {
                dim: self.name.clone(),
            })
        }
    }

    fn not_found(&self, label: &Label) -> Error {
        Error::LabelNotFound {
            dim: self.name.clone(),
            label: label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_properties() {
        let axis = CoordinateAxis::ints("time", [1, 2, 3]);
        assert!(axis.is_unique());
        assert!(axis.is_monotonic());
        assert!(axis.is_ascending());

        let axis = CoordinateAxis::ints("time", [3, 2, 1]);
        assert!(axis.is_monotonic());
        assert!(!axis.is_ascending());

        let axis = CoordinateAxis::ints("time", [1, 2, 2, 3]);
        assert!(!axis.is_unique());
        assert!(axis.is_monotonic());

        let axis = CoordinateAxis::ints("time", [3, 1, 2]);
        assert!(!axis.is_monotonic());
    }

    #[test]
    fn test_position_of() {
        let axis = CoordinateAxis::ints("x", [10, 20, 30]);
        assert_eq!(axis.position_of(&Label::Int(20)).unwrap(), 1);
        assert!(matches!(
            axis.position_of(&Label::Int(40)),
            Err(Error::LabelNotFound { .. })
        ));
    }

    #[test]
    fn test_positions_of_duplicates() {
        let axis = CoordinateAxis::ints("time", [1, 2, 2, 3]);
        assert_eq!(axis.positions_of(&Label::Int(2)), &[1, 2]);
        assert_eq!(axis.positions_of(&Label::Int(9)), &[] as &[usize]);
        // First match for the scalar lookup
        assert_eq!(axis.position_of(&Label::Int(2)).unwrap(), 1);
    }

    #[test]
    fn test_slice_between_ascending() {
        let axis = CoordinateAxis::ints("time", [1, 2, 3, 5, 8]);
        assert_eq!(
            axis.slice_between(&Label::Int(2), &Label::Int(5)).unwrap(),
            1..4
        );
        // Bounds need not be present
        assert_eq!(
            axis.slice_between(&Label::Int(4), &Label::Int(9)).unwrap(),
            3..5
        );
        // Empty selection
        assert_eq!(
            axis.slice_between(&Label::Int(6), &Label::Int(7)).unwrap(),
            4..4
        );
    }

    #[test]
    fn test_slice_between_descending() {
        let axis = CoordinateAxis::ints("depth", [9, 7, 4, 2]);
        assert_eq!(
            axis.slice_between(&Label::Int(7), &Label::Int(2)).unwrap(),
            1..4
        );
    }

    #[test]
    fn test_slice_between_step() {
        let axis = CoordinateAxis::ints("time", [1, 2, 3, 5, 8, 13]);
        assert_eq!(
            axis.slice_between_step(&Label::Int(2), &Label::Int(13), 2)
                .unwrap(),
            vec![1, 3, 5]
        );
        // A zero step degenerates to one
        assert_eq!(
            axis.slice_between_step(&Label::Int(2), &Label::Int(5), 0)
                .unwrap(),
            vec![1, 2, 3]
        );
        assert!(axis
            .slice_between_step(&Label::Int(1), &Label::Int(2), 1)
            .is_ok());

        let unordered = CoordinateAxis::ints("time", [3, 1, 2]);
        assert!(matches!(
            unordered.slice_between_step(&Label::Int(1), &Label::Int(3), 2),
            Err(Error::UnorderedSlice { .. })
        ));
    }

    #[test]
    fn test_slice_between_unordered_fails() {
        let axis = CoordinateAxis::ints("time", [3, 1, 2]);
        assert!(matches!(
            axis.slice_between(&Label::Int(2), &Label::Int(3)),
            Err(Error::UnorderedSlice { .. })
        ));
    }

    #[test]
    fn test_nearest() {
        let axis = CoordinateAxis::ints("x", [1, 2, 3]);
        assert_eq!(axis.nearest(&Label::Float(2.4), None).unwrap(), 1);
        assert_eq!(axis.nearest(&Label::Float(2.4), Some(0.5)).unwrap(), 1);
        assert!(matches!(
            axis.nearest(&Label::Float(2.4), Some(0.3)),
            Err(Error::ToleranceExceeded { .. })
        ));
    }

    #[test]
    fn test_nearest_ties_break_low() {
        let axis = CoordinateAxis::ints("x", [1, 3]);
        assert_eq!(axis.nearest(&Label::Int(2), None).unwrap(), 0);
    }

    #[test]
    fn test_nearest_ignores_incomparable_labels() {
        let axis = CoordinateAxis::texts("station", ["a", "b"]);
        assert!(matches!(
            axis.nearest(&Label::Int(1), None),
            Err(Error::LabelNotFound { .. })
        ));
    }

    #[test]
    fn test_pad_and_backfill() {
        let axis = CoordinateAxis::ints("time", [10, 20, 30]);
        assert_eq!(axis.pad(&Label::Int(25)).unwrap(), 1);
        assert_eq!(axis.pad(&Label::Int(20)).unwrap(), 1);
        assert!(axis.pad(&Label::Int(5)).is_err());

        assert_eq!(axis.backfill(&Label::Int(25)).unwrap(), 2);
        assert_eq!(axis.backfill(&Label::Int(20)).unwrap(), 1);
        assert!(axis.backfill(&Label::Int(35)).is_err());
    }

    #[test]
    fn test_take_builds_fresh_axis() {
        let axis = CoordinateAxis::ints("x", [10, 20, 30]);
        let taken = axis.take(&[2, 0]).unwrap();
        assert_eq!(taken.labels(), &[Label::Int(30), Label::Int(10)]);
        assert_eq!(taken.name(), "x");
        assert!(axis.take(&[3]).is_err());
    }

    #[test]
    fn test_same_labels() {
        let a = CoordinateAxis::ints("x", [1, 2, 3]);
        let b = CoordinateAxis::ints("y", [1, 2, 3]);
        let c = CoordinateAxis::ints("x", [1, 2, 4]);
        assert!(a.same_labels(&b));
        assert!(!a.same_labels(&c));
    }

    #[test]
    fn test_times() {
        let axis = CoordinateAxis::times("t", 1000000, 3600, 3);
        assert_eq!(axis.get(2), &Label::Time(1007200));
        assert!(axis.is_ascending());
    }
}
