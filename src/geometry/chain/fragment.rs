use crate::geometry::curve::{CurvePrimitive, StrokeHandler};
use crate::math::{Point3, TOLERANCE};

slotmap::new_key_type! {
    /// Identifier of a child curve inside a chain's own storage.
    pub struct ChildId;
}

/// One entry of a chain's distance index: a stretch of a single child,
/// given both as child fractions and as distances along the chain.
///
/// `child_fraction0 <= child_fraction1` and
/// `chain_distance0 <= chain_distance1` always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathFragment {
    pub child_fraction0: f64,
    pub child_fraction1: f64,
    pub chain_distance0: f64,
    pub chain_distance1: f64,
    pub child_id: ChildId,
}

impl PathFragment {
    #[must_use]
    pub fn new(
        child_id: ChildId,
        child_fraction0: f64,
        child_fraction1: f64,
        chain_distance0: f64,
        chain_distance1: f64,
    ) -> Self {
        Self {
            child_fraction0,
            child_fraction1,
            chain_distance0,
            chain_distance1,
            child_id,
        }
    }

    /// Length of the fragment along the chain.
    #[must_use]
    pub fn distance_span(&self) -> f64 {
        self.chain_distance1 - self.chain_distance0
    }

    #[must_use]
    pub fn contains_child_fraction(&self, fraction: f64) -> bool {
        fraction >= self.child_fraction0 - TOLERANCE && fraction <= self.child_fraction1 + TOLERANCE
    }

    /// Remaps the fragment for a chain of `total_length` whose children have
    /// all been reversed.
    pub fn reverse_in_place(&mut self, total_length: f64) {
        let (f0, f1) = (self.child_fraction0, self.child_fraction1);
        let (d0, d1) = (self.chain_distance0, self.chain_distance1);
        self.child_fraction0 = 1.0 - f1;
        self.child_fraction1 = 1.0 - f0;
        self.chain_distance0 = total_length - d1;
        self.chain_distance1 = total_length - d0;
    }
}

/// Collects the fragments of one child from its stroke announcements.
///
/// Announcements for a curve other than the child (a nested composite) are
/// flagged so the caller can fall back to a single whole-child fragment.
pub(super) struct FragmentBuilder<'a> {
    pub(super) fragments: Vec<PathFragment>,
    pub(super) distance: f64,
    child: Option<(ChildId, &'a dyn CurvePrimitive)>,
    pub(super) foreign: bool,
}

impl<'a> FragmentBuilder<'a> {
    pub(super) fn new() -> Self {
        Self {
            fragments: Vec::new(),
            distance: 0.0,
            child: None,
            foreign: false,
        }
    }

    pub(super) fn begin_child(&mut self, id: ChildId, curve: &'a dyn CurvePrimitive) {
        self.child = Some((id, curve));
        self.foreign = false;
    }

    fn accept(&mut self, curve: &dyn CurvePrimitive) -> Option<ChildId> {
        let (id, child) = self.child?;
        if crate::geometry::curve::same_curve(child, curve) {
            Some(id)
        } else {
            self.foreign = true;
            None
        }
    }

    pub(super) fn push(&mut self, id: ChildId, fraction0: f64, fraction1: f64, length: f64) {
        let (f0, f1) = if fraction0 <= fraction1 {
            (fraction0, fraction1)
        } else {
            (fraction1, fraction0)
        };
        let d0 = self.distance;
        self.distance += length;
        self.fragments.push(PathFragment::new(id, f0, f1, d0, self.distance));
    }
}

impl<'a> StrokeHandler<'a> for FragmentBuilder<'a> {
    fn announce_segment_interval(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        point0: Point3,
        point1: Point3,
        _num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        if let Some(id) = self.accept(curve) {
            self.push(id, fraction0, fraction1, (point1 - point0).norm());
        }
    }

    fn announce_interval_for_uniform_stepping(
        &mut self,
        curve: &'a dyn CurvePrimitive,
        _num_strokes: usize,
        fraction0: f64,
        fraction1: f64,
    ) {
        if let Some(id) = self.accept(curve) {
            let length = curve.curve_length_between_fractions(fraction0, fraction1);
            self.push(id, fraction0, fraction1, length);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use slotmap::SlotMap;

    use super::*;

    fn key() -> ChildId {
        let mut map: SlotMap<ChildId, ()> = SlotMap::with_key();
        map.insert(())
    }

    #[test]
    fn reversal_maps_fractions_and_distances() {
        let mut fragment = PathFragment::new(key(), 0.25, 0.5, 2.0, 3.0);
        fragment.reverse_in_place(10.0);
        assert_relative_eq!(fragment.child_fraction0, 0.5);
        assert_relative_eq!(fragment.child_fraction1, 0.75);
        assert_relative_eq!(fragment.chain_distance0, 7.0);
        assert_relative_eq!(fragment.chain_distance1, 8.0);
    }

    #[test]
    fn double_reversal_is_identity() {
        let original = PathFragment::new(key(), 0.1, 0.4, 1.5, 2.5);
        let mut fragment = original;
        fragment.reverse_in_place(6.0);
        fragment.reverse_in_place(6.0);
        assert_relative_eq!(fragment.child_fraction0, original.child_fraction0);
        assert_relative_eq!(fragment.chain_distance1, original.chain_distance1);
    }
}
