use glam::Vec3;

/// Scalar triple product `a · (b × c)`.
#[inline]
fn det(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    a.dot(b.cross(c))
}

/// A world-space ray. `direction` is not normalized: for segment queries
/// it spans origin to destination, so `t == 1` is the far end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// An accepted ray/triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

impl Ray {
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[must_use]
    pub fn between(origin: Vec3, destination: Vec3) -> Self {
        Self::new(origin, destination - origin)
    }

    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Möller–Trumbore over scalar triple products.
    ///
    /// With `cull_back_faces`, triangles whose `(e1, e2, -direction)` triple
    /// product is not positive are rejected; otherwise only degenerate ones
    /// are. Hits behind the origin are rejected.
    #[must_use]
    pub fn intersect_triangle(
        &self,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        cull_back_faces: bool,
    ) -> Option<TriangleHit> {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let neg_dir = -self.direction;

        let denom = det(e1, e2, neg_dir);
        if cull_back_faces {
            if denom <= 0.0 {
                return None;
            }
        } else if denom.abs() <= f32::EPSILON * e1.length() * e2.length() * neg_dir.length() {
            return None;
        }

        let s = self.origin - v0;
        let u = det(s, e2, neg_dir) / denom;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let v = det(e1, s, neg_dir) / denom;
        if !(0.0..=1.0).contains(&v) || u + v > 1.0 {
            return None;
        }
        let t = det(e1, e2, s) / denom;
        if t < 0.0 {
            return None;
        }
        Some(TriangleHit { t, u, v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRI: [Vec3; 3] = [Vec3::ZERO, Vec3::X, Vec3::Y];

    #[test]
    fn front_hit_at_expected_point() {
        let ray = Ray::between(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.25, 0.25, -1.0));
        let hit = ray.intersect_triangle(TRI[0], TRI[1], TRI[2], true).unwrap();
        assert!((hit.t - 0.5).abs() < 1e-6);
        assert!((ray.at(hit.t) - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-6);
        assert!((hit.u - 0.25).abs() < 1e-6 && (hit.v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn outside_and_behind_miss() {
        let outside = Ray::between(Vec3::new(2.0, 2.0, 1.0), Vec3::new(2.0, 2.0, -1.0));
        assert!(outside.intersect_triangle(TRI[0], TRI[1], TRI[2], true).is_none());

        let back = Ray::between(Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.25, 0.25, 1.0));
        assert!(back.intersect_triangle(TRI[0], TRI[1], TRI[2], true).is_none());
        assert!(back.intersect_triangle(TRI[0], TRI[1], TRI[2], false).is_some());
    }

    #[test]
    fn triangle_behind_origin_is_rejected() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray.intersect_triangle(TRI[0], TRI[1], TRI[2], false).is_none());
    }

    #[test]
    fn degenerate_triangle_never_hits() {
        let ray = Ray::new(Vec3::new(0.5, 0.0, 1.0), Vec3::NEG_Z);
        assert!(ray
            .intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::X * 2.0, false)
            .is_none());
    }
}
