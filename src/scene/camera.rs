use glam::{Affine3A, Mat4, Vec3, Vec4};

/// Pixel rectangle the frame is drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// Width over height; 1.0 for degenerate rectangles.
    #[inline]
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in radians.
    Perspective { fov_y: f32 },
    /// Half the vertical extent of the view volume.
    Orthographic { scale: f32 },
}

/// Projection definition carried by a node; the view comes from the node's
/// world transform (the camera looks down its local -Z).
#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    pub projection: Projection,
    pub z_near: f32,
    pub z_far: f32,
    cached: Option<(Viewport, Mat4)>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(60.0_f32.to_radians(), 1.0, 100.0)
    }
}

impl Camera {
    #[must_use]
    pub fn perspective(fov_y: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            name: String::from("Camera"),
            projection: Projection::Perspective { fov_y },
            z_near,
            z_far,
            cached: None,
        }
    }

    #[must_use]
    pub fn orthographic(scale: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            name: String::from("Camera"),
            projection: Projection::Orthographic { scale },
            z_near,
            z_far,
            cached: None,
        }
    }

    /// Drops the cached projection; call after editing projection fields.
    pub fn invalidate_projection(&mut self) {
        self.cached = None;
    }

    /// Projection for `viewport`, recomputed only when the viewport changes.
    pub fn projection_matrix(&mut self, viewport: Viewport) -> Mat4 {
        if let Some((cached_viewport, matrix)) = self.cached
            && cached_viewport == viewport
        {
            return matrix;
        }
        let matrix = self.compute_projection(viewport.aspect());
        self.cached = Some((viewport, matrix));
        matrix
    }

    /// Projection without touching the cache.
    #[must_use]
    pub fn compute_projection(&self, aspect: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y } => {
                Mat4::perspective_rh(fov_y, aspect, self.z_near, self.z_far)
            }
            Projection::Orthographic { scale } => {
                let w = scale * aspect;
                Mat4::orthographic_rh(-w, w, -scale, scale, self.z_near, self.z_far)
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(world_transform: &Affine3A) -> Mat4 {
        Mat4::from(world_transform.inverse())
    }
}

/// Six clip planes, normals pointing inward.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6], // left, right, bottom, top, near, far
}

impl Frustum {
    /// Gribb-Hartmann extraction for a `[0, 1]` depth range.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];
        let mut planes = [
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[2],
            rows[3] - rows[2],
        ];
        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }
        Self { planes }
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_is_cached_per_viewport() {
        let mut camera = Camera::default();
        let a = camera.projection_matrix(Viewport::new(800.0, 600.0));
        camera.projection = Projection::Perspective { fov_y: 1.0 };
        // same viewport, stale cache until invalidated
        assert_eq!(camera.projection_matrix(Viewport::new(800.0, 600.0)), a);
        let b = camera.projection_matrix(Viewport::new(400.0, 600.0));
        assert_ne!(a, b);
    }

    #[test]
    fn frustum_contains_point_in_front() {
        let camera = Camera::default();
        let view = Camera::view_matrix(&Affine3A::from_translation(Vec3::new(0.0, 0.0, 5.0)));
        let frustum = Frustum::from_matrix(camera.compute_projection(1.0) * view);
        assert!(frustum.intersects_sphere(Vec3::ZERO, 0.5));
        assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, 20.0), 0.5));
    }
}
