mod fragment;

pub use fragment::{ChildId, PathFragment};

use slotmap::SlotMap;
use tracing::{debug, instrument};

use crate::error::{GeometryError, Result};
use crate::geometry::curve::{
    move_at_constant_speed, Curve, CurveExtend, CurveLocationDetail, CurvePrimitive,
    StrokeHandler,
};
use crate::geometry::{Plane, PointAnd2Derivatives, Ray3};
use crate::math::{is_almost_equal_fraction, is_almost_equal_point, Point3, Vector3, TOLERANCE};
use crate::tessellation::StrokeOptions;

use fragment::FragmentBuilder;

/// A sequence of curves re-parameterized by true distance, so that the chain
/// behaves as one curve whose fraction is proportional to arc length.
///
/// Children live in the chain's own arena; the ordered key list gives their
/// sequence, and each [`PathFragment`] refers to a child by key. The fragment
/// table is built once and rewritten in place by
/// [`reverse_in_place`](CurvePrimitive::reverse_in_place).
#[derive(Debug, Clone)]
pub struct CurveChainWithDistanceIndex {
    children: SlotMap<ChildId, Curve>,
    order: Vec<ChildId>,
    fragments: Vec<PathFragment>,
    total_length: f64,
}

impl CurveChainWithDistanceIndex {
    /// Builds a chain from its children, indexing them with the strokes
    /// `options` asks for.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::EmptyChain`] if `children` is empty.
    #[instrument(skip_all, fields(children = children.len()))]
    pub fn create(children: Vec<Curve>, options: Option<&StrokeOptions>) -> Result<Self> {
        if children.is_empty() {
            return Err(GeometryError::EmptyChain.into());
        }
        let mut arena: SlotMap<ChildId, Curve> = SlotMap::with_key();
        let order: Vec<ChildId> = children.into_iter().map(|c| arena.insert(c)).collect();

        let mut builder = FragmentBuilder::new();
        for &id in &order {
            let Some(child) = arena.get(id) else { continue };
            let first_fragment = builder.fragments.len();
            let start_distance = builder.distance;
            builder.begin_child(id, child.inner());
            child.emit_strokable_parts(&mut builder, options);
            if builder.foreign || builder.fragments.len() == first_fragment {
                builder.fragments.truncate(first_fragment);
                builder.distance = start_distance;
                builder.push(id, 0.0, 1.0, child.curve_length());
            }
        }

        let chain = Self {
            total_length: builder.distance,
            fragments: builder.fragments,
            children: arena,
            order,
        };
        chain.debug_check_fragments();
        debug!(
            fragments = chain.fragments.len(),
            length = chain.total_length,
            "built distance index"
        );
        Ok(chain)
    }

    fn debug_check_fragments(&self) {
        debug_assert!(self
            .fragments
            .windows(2)
            .all(|w| (w[0].chain_distance1 - w[1].chain_distance0).abs() <= TOLERANCE));
        debug_assert!(self
            .fragments
            .last()
            .is_some_and(|f| (f.chain_distance1 - self.total_length).abs() <= TOLERANCE));
    }

    /// Sum of the children's lengths.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    #[must_use]
    pub fn fragments(&self) -> &[PathFragment] {
        &self.fragments
    }

    /// Keys of the children in chain order.
    #[must_use]
    pub fn child_ids(&self) -> &[ChildId] {
        &self.order
    }

    #[must_use]
    pub fn child(&self, id: ChildId) -> Option<&Curve> {
        self.children.get(id)
    }

    /// Children in chain order.
    pub fn children(&self) -> impl Iterator<Item = &Curve> {
        self.order.iter().filter_map(|&id| self.children.get(id))
    }

    /// Key of the child that `curve` refers to, by identity. Both the child
    /// enum and the curve it wraps are recognised.
    #[must_use]
    pub fn child_id_of(&self, curve: &dyn CurvePrimitive) -> Option<ChildId> {
        use crate::geometry::curve::same_curve;
        self.order.iter().copied().find(|&id| {
            self.children
                .get(id)
                .is_some_and(|c| same_curve(c, curve) || same_curve(c.inner(), curve))
        })
    }

    /// Whether the chain ends where it starts.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.total_length > TOLERANCE && is_almost_equal_point(&self.start_point(), &self.end_point())
    }

    fn first_child(&self) -> Option<&Curve> {
        self.order.first().and_then(|&id| self.children.get(id))
    }

    fn last_child(&self) -> Option<&Curve> {
        self.order.last().and_then(|&id| self.children.get(id))
    }

    fn distance_to_fraction(&self, distance: f64) -> f64 {
        if self.total_length > TOLERANCE {
            distance / self.total_length
        } else {
            0.0
        }
    }

    /// Fragment covering `distance`, or `None` when `distance` is outside the
    /// chain and `allow_extrapolation` is false. Extrapolation answers with
    /// the first or last fragment.
    #[must_use]
    pub fn chain_distance_to_fragment(
        &self,
        distance: f64,
        allow_extrapolation: bool,
    ) -> Option<&PathFragment> {
        if distance < -TOLERANCE {
            return allow_extrapolation.then(|| self.fragments.first()).flatten();
        }
        if distance > self.total_length + TOLERANCE {
            return allow_extrapolation.then(|| self.fragments.last()).flatten();
        }
        self.fragments
            .iter()
            .find(|f| distance <= f.chain_distance1 + TOLERANCE)
            .or_else(|| self.fragments.last())
    }

    /// Child location at chain `distance`, found by walking along the child
    /// from the start of the covering fragment.
    #[must_use]
    pub fn chain_distance_to_accurate_child_fraction(
        &self,
        distance: f64,
        allow_extrapolation: bool,
    ) -> Option<CurveLocationDetail<'_>> {
        let fragment = self.chain_distance_to_fragment(distance, allow_extrapolation)?;
        let child = self.children.get(fragment.child_id)?;
        let offset = distance - fragment.chain_distance0;
        if offset.abs() <= TOLERANCE {
            return Some(CurveLocationDetail::from_fraction(child, fragment.child_fraction0));
        }
        Some(child.move_signed_distance_from_fraction(
            fragment.child_fraction0,
            offset,
            allow_extrapolation,
        ))
    }

    /// Chain distance of `fraction` on the child `id`.
    #[must_use]
    pub fn child_fraction_to_chain_distance(&self, id: ChildId, fraction: f64) -> Option<f64> {
        let child = self.children.get(id)?;
        let mut own = self.fragments.iter().filter(|f| f.child_id == id);
        let first = *own.clone().next()?;
        let fragment = own
            .clone()
            .find(|f| f.contains_child_fraction(fraction))
            .copied()
            .unwrap_or_else(|| {
                if fraction < first.child_fraction0 {
                    first
                } else {
                    own.next_back().copied().unwrap_or(first)
                }
            });
        let along = child.curve_length_between_fractions(fragment.child_fraction0, fraction);
        if fraction < fragment.child_fraction0 {
            Some(fragment.chain_distance0 - along)
        } else {
            Some(fragment.chain_distance0 + along)
        }
    }

    /// Chain fraction of `fraction` on the child `id`.
    #[must_use]
    pub fn child_fraction_to_chain_fraction(&self, id: ChildId, fraction: f64) -> Option<f64> {
        self.child_fraction_to_chain_distance(id, fraction)
            .map(|d| self.distance_to_fraction(d))
    }

    /// Re-expresses a location found on child `id` as a chain location that
    /// nests the child's detail.
    #[must_use]
    pub fn child_detail_to_chain_detail<'a>(
        &'a self,
        id: ChildId,
        child_detail: CurveLocationDetail<'a>,
    ) -> Option<CurveLocationDetail<'a>> {
        let fraction = self.child_fraction_to_chain_fraction(id, child_detail.fraction)?;
        let mut detail = CurveLocationDetail::new(self, fraction, child_detail.point)
            .with_a(child_detail.a);
        if let Some(role) = child_detail.interval_role {
            detail = detail.with_interval_role(role);
        }
        Some(detail.with_child_detail(child_detail))
    }

    /// Child and child fraction at a chain fraction.
    fn locate(&self, fraction: f64) -> Option<(&Curve, f64)> {
        let detail = self.chain_distance_to_accurate_child_fraction(fraction * self.total_length, true)?;
        let id = self.child_id_of(detail.curve?)?;
        Some((self.children.get(id)?, detail.fraction))
    }
}

impl CurvePrimitive for CurveChainWithDistanceIndex {
    fn as_curve(&self) -> &dyn CurvePrimitive {
        self
    }

    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        match self.locate(fraction) {
            Some((child, child_fraction)) => child.fraction_to_point(child_fraction),
            None => Point3::origin(),
        }
    }

    /// The child derivative rescaled to magnitude `total_length`.
    fn fraction_to_point_and_derivative(&self, fraction: f64) -> Ray3 {
        let Some((child, child_fraction)) = self.locate(fraction) else {
            return Ray3::new(Point3::origin(), Vector3::zeros());
        };
        let ray = child.fraction_to_point_and_derivative(child_fraction);
        let speed = ray.direction.norm();
        if speed <= TOLERANCE {
            return Ray3::new(ray.origin, Vector3::zeros());
        }
        Ray3::new(ray.origin, ray.direction * (self.total_length / speed))
    }

    /// With `T` the unit tangent, `d2X/df2 = L^2 (X_uu - (X_uu.T) T) / |X_u|^2`.
    fn fraction_to_point_and_2_derivatives(&self, fraction: f64) -> PointAnd2Derivatives {
        let Some((child, child_fraction)) = self.locate(fraction) else {
            return PointAnd2Derivatives::new(Point3::origin(), Vector3::zeros(), Vector3::zeros());
        };
        let d = child.fraction_to_point_and_2_derivatives(child_fraction);
        let speed_squared = d.vector_u.norm_squared();
        if speed_squared <= TOLERANCE * TOLERANCE {
            return PointAnd2Derivatives::new(d.origin, Vector3::zeros(), Vector3::zeros());
        }
        let length = self.total_length;
        let tangent = d.vector_u / speed_squared.sqrt();
        let normal_part = d.vector_v - tangent * d.vector_v.dot(&tangent);
        PointAnd2Derivatives::new(
            d.origin,
            tangent * length,
            normal_part * (length * length / speed_squared),
        )
    }

    fn start_point(&self) -> Point3 {
        self.first_child().map_or_else(Point3::origin, CurvePrimitive::start_point)
    }

    fn end_point(&self) -> Point3 {
        self.last_child().map_or_else(Point3::origin, CurvePrimitive::end_point)
    }

    fn is_extensible_fraction_space(&self) -> bool {
        self.first_child().is_some_and(CurvePrimitive::is_extensible_fraction_space)
            && self.last_child().is_some_and(CurvePrimitive::is_extensible_fraction_space)
    }

    fn compute_stroke_count_for_options(&self, options: Option<&StrokeOptions>) -> usize {
        self.children()
            .map(|c| c.compute_stroke_count_for_options(options))
            .sum()
    }

    fn emit_strokable_parts<'a>(
        &'a self,
        handler: &mut dyn StrokeHandler<'a>,
        options: Option<&StrokeOptions>,
    ) {
        handler.start_curve_primitive(self);
        for child in self.children() {
            child.emit_strokable_parts(handler, options);
        }
        handler.end_curve_primitive(self);
    }

    fn curve_length(&self) -> f64 {
        self.total_length
    }

    fn quick_length(&self) -> f64 {
        self.children().map(CurvePrimitive::quick_length).sum()
    }

    fn curve_length_between_fractions(&self, fraction0: f64, fraction1: f64) -> f64 {
        (fraction1 - fraction0).abs() * self.total_length
    }

    fn closest_point(&self, space_point: &Point3, extend: CurveExtend) -> Option<CurveLocationDetail<'_>> {
        let last = self.order.len().saturating_sub(1);
        let mut best: Option<(ChildId, CurveLocationDetail<'_>)> = None;
        for (i, &id) in self.order.iter().enumerate() {
            let Some(child) = self.children.get(id) else { continue };
            let Some(detail) = child.closest_point(space_point, extend.restrict(i == 0, i == last)) else {
                continue;
            };
            if best.as_ref().is_none_or(|(_, b)| detail.a < b.a) {
                best = Some((id, detail));
            }
        }
        let (id, child_detail) = best?;
        let detail = self.child_detail_to_chain_detail(id, child_detail)?;
        let tangent = self.fraction_to_point_and_derivative(detail.fraction).direction;
        Some(detail.with_vector(tangent))
    }

    fn append_plane_intersections<'a>(
        &'a self,
        plane: &Plane,
        out: &mut Vec<CurveLocationDetail<'a>>,
    ) -> usize {
        let before = out.len();
        let closed = self.is_closed();
        let mut child_hits = Vec::new();
        for &id in &self.order {
            let Some(child) = self.children.get(id) else { continue };
            child_hits.clear();
            child.append_plane_intersections(plane, &mut child_hits);
            for hit in child_hits.drain(..) {
                let Some(detail) = self.child_detail_to_chain_detail(id, hit) else {
                    continue;
                };
                // a root at a joint is reported by both neighbours
                let repeated = out[before..]
                    .last()
                    .is_some_and(|last| is_almost_equal_fraction(last.fraction, detail.fraction));
                let wraps = closed
                    && detail.fraction >= 1.0 - TOLERANCE
                    && out[before..].first().is_some_and(|first| first.fraction <= TOLERANCE);
                if !repeated && !wraps {
                    out.push(detail);
                }
            }
        }
        out.len() - before
    }

    fn move_signed_distance_from_fraction(
        &self,
        start_fraction: f64,
        signed_distance: f64,
        allow_extension: bool,
    ) -> CurveLocationDetail<'_> {
        move_at_constant_speed(
            self,
            self.total_length,
            start_fraction,
            signed_distance,
            allow_extension && self.is_extensible_fraction_space(),
        )
    }

    #[instrument(skip_all, fields(children = self.order.len()))]
    fn reverse_in_place(&mut self) {
        for child in self.children.values_mut() {
            child.reverse_in_place();
        }
        self.order.reverse();
        let total = self.total_length;
        for fragment in &mut self.fragments {
            fragment.reverse_in_place(total);
        }
        self.fragments.reverse();
        self.debug_check_fragments();
        debug!("reversed chain");
    }
}
