use glam::Vec3;

use crate::physics::bodies::Bodies;
use crate::physics::handles::BodyHandle;
use crate::utilities::BoundingBox;

/// Two bodies whose swept bounds may overlap. Equality ignores order.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionPair {
    #[inline(always)]
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        Self { a, b }
    }

    /// Whether the pair refers to `handle` on either side.
    #[inline(always)]
    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }
}

impl PartialEq for CollisionPair {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }
}

impl Eq for CollisionPair {}

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    handle: BodyHandle,
    value: f32,
    is_min: bool,
}

/// Single axis sweep and prune.
///
/// Every body's bounds are swept by its velocity over the step, padded slightly, and projected
/// onto the normalized `(1, 1, 1)` diagonal. Sorting the interval endpoints and walking each
/// interval yields a superset of the overlapping pairs.
#[derive(Debug, Default)]
pub struct BroadPhase {
    endpoints: Vec<Endpoint>,
}

impl BroadPhase {
    /// Padding added along the sweep axis at both ends of every interval.
    pub const EPSILON: f32 = 0.01;

    pub fn with_capacity(body_capacity: usize) -> Self {
        Self {
            endpoints: Vec::with_capacity(body_capacity * 2),
        }
    }

    #[inline(always)]
    pub fn axis() -> Vec3 {
        Vec3::ONE.normalize()
    }

    /// Bounds of a body swept over `dt` and padded along the sweep axis.
    #[inline]
    pub fn swept_bounds(bounds: BoundingBox, velocity: Vec3, dt: f32) -> BoundingBox {
        let mut swept = bounds.swept(velocity * dt);
        let padding = Self::axis() * Self::EPSILON;
        swept.min -= padding;
        swept.max += padding;
        swept
    }

    /// Replaces `pairs` with the candidate pairs for this step.
    pub fn find_pairs(&mut self, bodies: &Bodies, dt: f32, pairs: &mut Vec<CollisionPair>) {
        self.find_pairs_from(
            bodies
                .iter()
                .map(|(handle, body)| (handle, Self::swept_bounds(body.bounds(), body.velocity.linear, dt))),
            pairs,
        );
    }

    /// Same as [`BroadPhase::find_pairs`] over precomputed bounds.
    pub fn find_pairs_from(
        &mut self,
        bounds: impl IntoIterator<Item = (BodyHandle, BoundingBox)>,
        pairs: &mut Vec<CollisionPair>,
    ) {
        let axis = Self::axis();
        self.endpoints.clear();
        for (handle, bounds) in bounds {
            self.endpoints.push(Endpoint {
                handle,
                value: axis.dot(bounds.min),
                is_min: true,
            });
            self.endpoints.push(Endpoint {
                handle,
                value: axis.dot(bounds.max),
                is_min: false,
            });
        }
        // Minimums sort ahead of maximums at equal values so touching intervals still pair.
        self.endpoints
            .sort_by(|a, b| a.value.total_cmp(&b.value).then_with(|| b.is_min.cmp(&a.is_min)));

        pairs.clear();
        for (i, first) in self.endpoints.iter().enumerate() {
            if !first.is_min {
                continue;
            }
            for second in &self.endpoints[i + 1..] {
                if second.handle == first.handle {
                    break;
                }
                if second.is_min {
                    pairs.push(CollisionPair::new(first.handle, second.handle));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn arb_bounds() -> impl Strategy<Value = BoundingBox> {
        (prop::array::uniform3(-10.0..10.0f32), prop::array::uniform3(0.1..2.0f32)).prop_map(|(center, half)| {
            let (center, half) = (Vec3::from_array(center), Vec3::from_array(half));
            BoundingBox::new(center - half, center + half)
        })
    }

    #[test]
    fn test_pairs_compare_unordered() {
        let ab = CollisionPair::new(BodyHandle(1), BodyHandle(2));
        assert_eq!(ab, CollisionPair::new(BodyHandle(2), BodyHandle(1)));
        assert_ne!(ab, CollisionPair::new(BodyHandle(1), BodyHandle(3)));
        assert!(ab.involves(BodyHandle(2)));
    }

    #[test]
    fn test_swept_bounds_cover_motion() {
        let bounds = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let swept = BroadPhase::swept_bounds(bounds, Vec3::new(60.0, 0.0, 0.0), 1.0 / 60.0);
        assert!(swept.max.x >= 2.0);
        assert!(swept.min.x < -1.0);
    }

    #[test]
    fn test_separated_boxes_do_not_pair() {
        let mut broad_phase = BroadPhase::default();
        let mut pairs = Vec::new();
        broad_phase.find_pairs_from(
            [
                (BodyHandle(0), BoundingBox::new(Vec3::ZERO, Vec3::ONE)),
                (BodyHandle(1), BoundingBox::new(Vec3::splat(5.0), Vec3::splat(6.0))),
                (BodyHandle(2), BoundingBox::new(Vec3::splat(0.5), Vec3::splat(1.5))),
            ],
            &mut pairs,
        );
        assert_eq!(pairs, vec![CollisionPair::new(BodyHandle(0), BodyHandle(2))]);
    }

    proptest! {
        /// Every pair of overlapping boxes is reported.
        #[test]
        fn test_no_false_negatives(boxes in prop::collection::vec(arb_bounds(), 2..40)) {
            let boxes: Vec<(BodyHandle, BoundingBox)> = boxes
                .into_iter()
                .enumerate()
                .map(|(i, bounds)| (BodyHandle(i as i32), bounds))
                .collect();
            let mut broad_phase = BroadPhase::with_capacity(boxes.len());
            let mut pairs = Vec::new();
            broad_phase.find_pairs_from(boxes.iter().copied(), &mut pairs);
            for (i, (ha, a)) in boxes.iter().enumerate() {
                for (hb, b) in &boxes[i + 1..] {
                    if BoundingBox::intersects(a, b) {
                        prop_assert!(pairs.contains(&CollisionPair::new(*ha, *hb)), "missing pair {} {}", ha, hb);
                    }
                }
            }
        }
    }
}
