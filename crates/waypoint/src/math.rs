// Math - geometry primitives shared by the chunk and waypoint code
//
// Vectors and transforms come from glam. The world is Y-up; waypoint
// polygons live in the X-Z plane, stored as `Vec2(x, z)`.

pub use glam::{Affine3A, Vec2, Vec3};

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn centre(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive point test.
    pub fn intersects(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Box enclosing this box after transformation.
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = transform.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    /// Clip the segment `start`-`end` to this box (Liang-Barsky).
    ///
    /// Returns false and leaves both points untouched if the segment misses
    /// the box entirely.
    pub fn clip(&self, start: &mut Vec3, end: &mut Vec3) -> bool {
        let delta = *end - *start;
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;

        for axis in 0..3 {
            let d = delta[axis];
            let s = start[axis];
            for (p, q) in [(-d, s - self.min[axis]), (d, self.max[axis] - s)] {
                if p == 0.0 {
                    if q < 0.0 {
                        return false;
                    }
                    continue;
                }
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return false;
                    }
                    t0 = t0.max(r);
                } else {
                    if r < t0 {
                        return false;
                    }
                    t1 = t1.min(r);
                }
            }
        }

        let origin = *start;
        *start = origin + delta * t0;
        *end = origin + delta * t1;
        true
    }
}

/// Plane `normal . p = d`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneEq {
    pub normal: Vec3,
    pub d: f32,
}

impl PlaneEq {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Plane through a point with the given normal.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            d: normal.dot(point),
        }
    }

    /// Signed distance (scaled by the normal's length).
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.d
    }

    pub fn is_in_front_of(&self, point: Vec3) -> bool {
        self.distance_to(point) > 0.0
    }

    /// The plane expressed in another space.
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let normal = transform.transform_vector3(self.normal);
        let point = transform.transform_point3(self.normal * self.d / self.normal.length_squared());
        Self::from_point_normal(point, normal)
    }
}

/// Twice the signed area of a 2D polygon (positive when counter-clockwise).
pub fn signed_area_2d(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Vec3::ZERO, Vec3::splat(10.0))
    }

    #[test]
    fn test_intersects_is_inclusive() {
        let bb = unit_box();
        assert!(bb.intersects(Vec3::new(10.0, 0.0, 5.0)));
        assert!(!bb.intersects(Vec3::new(10.001, 0.0, 5.0)));
    }

    #[test]
    fn test_clip_segment_crossing_box() {
        let bb = unit_box();
        let mut start = Vec3::new(-5.0, 5.0, 5.0);
        let mut end = Vec3::new(15.0, 5.0, 5.0);
        assert!(bb.clip(&mut start, &mut end));
        assert!((start - Vec3::new(0.0, 5.0, 5.0)).length() < 1e-5);
        assert!((end - Vec3::new(10.0, 5.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn test_clip_segment_missing_box() {
        let bb = unit_box();
        let mut start = Vec3::new(-5.0, 5.0, -1.0);
        let mut end = Vec3::new(15.0, 5.0, -1.0);
        assert!(!bb.clip(&mut start, &mut end));
        assert_eq!(start, Vec3::new(-5.0, 5.0, -1.0));
    }

    #[test]
    fn test_transformed_box() {
        let bb = unit_box().transformed(&Affine3A::from_translation(Vec3::new(10.0, 0.0, -10.0)));
        assert_eq!(bb.min, Vec3::new(10.0, 0.0, -10.0));
        assert_eq!(bb.max, Vec3::new(20.0, 10.0, 0.0));
    }

    #[test]
    fn test_plane_transform() {
        // x <= 10 in local space
        let plane = PlaneEq::new(Vec3::new(-1.0, 0.0, 0.0), -10.0);
        let moved = plane.transformed(&Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert!(moved.is_in_front_of(Vec3::new(14.0, 0.0, 0.0)));
        assert!(!moved.is_in_front_of(Vec3::new(16.0, 0.0, 0.0)));
    }

    #[test]
    fn test_signed_area() {
        let ccw = [Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        assert!(signed_area_2d(&ccw) > 0.0);
    }
}
