//! Rays, volume bounds, and primary ray construction

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Sentinel distance beyond which a slab hit is ignored
pub const BIG_DISTANCE: f32 = 1e10;

/// Volume-local bounding box
pub const VOLUME_BOUNDS_MIN: Vec3 = Vec3::splat(-0.5);
pub const VOLUME_BOUNDS_MAX: Vec3 = Vec3::splat(0.5);

/// Ray for marching through volume-local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a slab test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    pub hit: bool,
    /// Entry distance `tmin`; negative when the origin is inside the box
    pub dist: f32,
}

/// Slab-method ray/AABB intersection
///
/// `tmin` is the largest per-axis near distance and `tmax` the smallest far
/// distance; the ray hits when `tmax >= max(0, tmin)` and `tmin < max_dist`.
pub fn intersect_aabb(origin: Vec3, inv_dir: Vec3, min: Vec3, max: Vec3, max_dist: f32) -> HitInfo {
    let t1 = (min - origin) * inv_dir;
    let t2 = (max - origin) * inv_dir;
    let tmin = t1.min(t2).max_element();
    let tmax = t1.max(t2).min_element();
    HitInfo {
        hit: tmax >= tmin.max(0.0) && tmin < max_dist,
        dist: tmin,
    }
}

/// Intersect a ray with the unit volume box
pub fn intersect_volume(ray: &Ray) -> HitInfo {
    intersect_aabb(
        ray.origin,
        Vec3::ONE / ray.direction,
        VOLUME_BOUNDS_MIN,
        VOLUME_BOUNDS_MAX,
        BIG_DISTANCE,
    )
}

/// True when a position has left the volume box on any axis
pub fn outside_volume(p: Vec3) -> bool {
    p.cmpgt(VOLUME_BOUNDS_MAX).any() || p.cmplt(VOLUME_BOUNDS_MIN).any()
}

/// Transforms supplied once per frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    /// Volume placement (volume-local to world)
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl FrameMatrices {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            model: Mat4::IDENTITY,
            view,
            projection,
        }
    }

    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }

    /// Inverse transforms used to back-project screen positions
    pub fn inverses(&self) -> InverseMatrices {
        InverseMatrices {
            inv_projection: self.projection.inverse(),
            inv_view_model: (self.view * self.model).inverse(),
        }
    }

    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.model
    }
}

/// Host-computed inverses, uploaded as uniforms so every fragment builds the
/// same ray the CPU tracer does
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseMatrices {
    pub inv_projection: Mat4,
    pub inv_view_model: Mat4,
}

impl InverseMatrices {
    /// Camera position in volume-local space
    pub fn camera_position(&self) -> Vec3 {
        (self.inv_view_model * Vec4::new(0.0, 0.0, 0.0, 1.0)).truncate()
    }

    /// Back-project a normalized device coordinate into a volume-local ray
    pub fn primary_ray(&self, ndc: Vec2) -> Ray {
        let mut frustum = self.inv_projection * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        frustum.w = 0.0;
        let frustum = frustum.normalize_or_zero();
        let direction = (self.inv_view_model * frustum).truncate().normalize_or_zero();
        Ray::new(self.camera_position(), direction)
    }
}

/// Normalized device coordinate of a pixel centre given its GL fragment
/// coordinate (origin bottom-left)
pub fn frag_coord_to_ndc(frag_coord: Vec2, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        frag_coord.x / width as f32 * 2.0 - 1.0,
        frag_coord.y / height as f32 * 2.0 - 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_hit_along_z() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        let hit = intersect_volume(&ray);
        assert!(hit.hit);
        assert!((hit.dist - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_slab_miss_offset_ray() {
        let ray = Ray::new(Vec3::new(2.0, 2.0, -2.0), Vec3::Z);
        assert!(!intersect_volume(&ray).hit);
    }

    #[test]
    fn test_slab_behind_origin_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::Z);
        assert!(!intersect_volume(&ray).hit);
    }

    #[test]
    fn test_slab_origin_inside_has_negative_entry() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = intersect_volume(&ray);
        assert!(hit.hit);
        assert!((hit.dist + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_outside_volume() {
        assert!(!outside_volume(Vec3::splat(0.49)));
        assert!(outside_volume(Vec3::new(0.0, 0.51, 0.0)));
        assert!(outside_volume(Vec3::new(-0.6, 0.0, 0.0)));
    }

    #[test]
    fn test_primary_ray_through_centre_looks_at_volume() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        let inverses = FrameMatrices::new(view, projection).inverses();

        let ray = inverses.primary_ray(Vec2::ZERO);
        assert!((ray.origin - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-4);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn test_model_matrix_moves_camera_into_volume_space() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        let model = Mat4::from_scale(Vec3::splat(2.0));
        let inverses = FrameMatrices::new(view, projection)
            .with_model(model)
            .inverses();
        assert!((inverses.camera_position() - Vec3::new(0.0, 0.0, 1.5)).length() < 1e-4);
    }
}
