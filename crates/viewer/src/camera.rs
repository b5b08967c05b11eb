use glam::{Mat4, Quat, Vec3};
use renderer::FrameMatrices;

const NEAR_PLANE: f32 = 0.01;
const FAR_PLANE: f32 = 100.0;

/// Orbit camera around the volume centre
/// Uses vector-based rotation instead of euler angles
pub struct OrbitCamera {
    pub focus: Vec3,
    /// Camera orientation as quaternion
    pub orientation: Quat,
    pub distance: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    pub dragging: bool,
    pub last_mouse_pos: Option<(f32, f32)>,
    /// Set whenever the view changes; consumers clear accumulated samples
    changed: bool,
}

impl OrbitCamera {
    pub fn new(distance: f32, fov_degrees: f32) -> Self {
        // Start looking at focus from a slight angle
        let initial_dir = Vec3::new(0.0, 0.5, 1.0).normalize();
        let orientation = Quat::from_rotation_arc(Vec3::NEG_Z, -initial_dir);

        Self {
            // Volume occupies [-0.5, 0.5]^3 around the origin
            focus: Vec3::ZERO,
            orientation,
            distance,
            fov: fov_degrees.to_radians(),
            dragging: false,
            last_mouse_pos: None,
            changed: true,
        }
    }

    /// Get the forward direction (from camera toward focus)
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    pub fn position(&self) -> Vec3 {
        self.focus - self.forward() * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.focus, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, aspect, NEAR_PLANE, FAR_PLANE)
    }

    /// View and projection for a viewport, with an identity model transform
    pub fn frame_matrices(&self, width: u32, height: u32) -> FrameMatrices {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        FrameMatrices::new(self.view_matrix(), self.projection_matrix(aspect))
    }

    /// Return and reset the changed flag
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn handle_mouse_drag(&mut self, delta_x: f32, delta_y: f32) {
        if delta_x == 0.0 && delta_y == 0.0 {
            return;
        }
        let sensitivity = 0.003;

        // Yaw around world Y, pitch around the camera's local X
        let yaw_rotation = Quat::from_axis_angle(Vec3::Y, -delta_x * sensitivity);
        let pitch_rotation = Quat::from_axis_angle(self.right(), -delta_y * sensitivity);

        self.orientation = yaw_rotation * self.orientation;
        self.orientation = pitch_rotation * self.orientation;
        self.orientation = self.orientation.normalize();

        // Clamp pitch to prevent flipping over
        let fwd = self.forward();
        let max_pitch = 1.5_f32; // ~86 degrees
        if fwd.y.abs() > max_pitch.sin() {
            let yaw = (-fwd.x).atan2(-fwd.z);
            let pitch = fwd.y.asin().clamp(-max_pitch, max_pitch);

            let yaw_quat = Quat::from_rotation_y(yaw);
            let pitch_quat = Quat::from_rotation_x(pitch);
            self.orientation = yaw_quat * pitch_quat;
        }

        self.changed = true;
    }

    pub fn handle_scroll(&mut self, delta: f32) {
        let distance = (self.distance - delta * 0.1).clamp(0.5, 10.0);
        if distance != self.distance {
            self.distance = distance;
            self.changed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_at_distance_from_focus() {
        let camera = OrbitCamera::new(2.0, 45.0);
        assert!((camera.position().length() - 2.0).abs() < 1e-5);
        // Initial view looks down slightly onto the volume
        assert!(camera.position().y > 0.0);
    }

    #[test]
    fn test_changed_flag_is_consumed() {
        let mut camera = OrbitCamera::new(2.0, 45.0);
        assert!(camera.take_changed());
        assert!(!camera.take_changed());

        camera.handle_mouse_drag(10.0, 0.0);
        assert!(camera.take_changed());

        camera.handle_mouse_drag(0.0, 0.0);
        assert!(!camera.take_changed());
    }

    #[test]
    fn test_scroll_clamps_distance() {
        let mut camera = OrbitCamera::new(2.0, 45.0);
        camera.take_changed();

        camera.handle_scroll(1000.0);
        assert_eq!(camera.distance, 0.5);
        assert!(camera.take_changed());

        // Already at the limit, nothing changes
        camera.handle_scroll(1.0);
        assert!(!camera.take_changed());
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = OrbitCamera::new(2.0, 45.0);
        for _ in 0..100 {
            camera.handle_mouse_drag(0.0, 50.0);
        }
        assert!(camera.forward().y.abs() <= 1.5_f32.sin() + 1e-4);
        assert!((camera.position().length() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_view_centres_the_focus() {
        let camera = OrbitCamera::new(3.0, 45.0);
        let frame = camera.frame_matrices(800, 600);
        let clip = frame.projection * frame.view * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
    }
}
