//! Per-pixel photon march
//!
//! This is the light-transport kernel shared by [`CpuPhotonTracer`] and the
//! fragment shader in `shaders/photon.frag`. One call to [`trace_pixel`]
//! produces one noisy radiance estimate; the accumulation stage averages
//! many of them.
//!
//! Energy handling is intentionally informal: the throughput is multiplied
//! by `max(0, cos) * surface_color` at every bounce with no BRDF
//! normalization and no russian roulette. A path ends only by leaving the
//! volume box or by running out of march budget, which contributes nothing.
//!
//! [`CpuPhotonTracer`]: crate::renderers::cpu_photon::CpuPhotonTracer

use crate::error::{RenderError, Result};
use crate::ray::{
    intersect_aabb, outside_volume, Ray, BIG_DISTANCE, VOLUME_BOUNDS_MAX, VOLUME_BOUNDS_MIN,
};
use crate::sampling::{random, random2, random_unit_hemisphere};
use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use volume::ResourceSet;

/// Capacity of the random-pair uniform block (`vec4[1000]`, two pairs each)
pub const MAX_RANDOM_PAIRS: usize = 2000;

/// Size in bytes of the std140 random-pair uniform block
pub const RANDOM_BLOCK_SIZE: usize = MAX_RANDOM_PAIRS * 2 * std::mem::size_of::<f32>();

/// Photon renderer parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotonSettings {
    /// Gradient magnitude above which a sample counts as a surface
    pub gradient_threshold: f32,
    /// Skip surfaces whose normal faces away from the incoming ray
    pub back_face_culling: bool,
    /// Bounces per path that draw a host random pair; later ones get zero
    pub max_bounce: u32,
    /// Estimates averaged per pixel per call
    pub samples_per_call: u32,
    /// March increment in volume-local units
    pub step_size: f32,
    /// Maximum march iterations per path
    pub march_budget: u32,
    /// Seed for the entry-point jitter
    pub jitter_seed: f32,
}

impl Default for PhotonSettings {
    fn default() -> Self {
        Self {
            gradient_threshold: 0.06,
            back_face_culling: true,
            max_bounce: 20,
            samples_per_call: 1,
            step_size: 0.002,
            march_budget: 800,
            jitter_seed: 1234.0,
        }
    }
}

impl PhotonSettings {
    /// Number of host random pairs one call consumes
    pub fn random_pair_count(&self) -> usize {
        self.max_bounce as usize * self.samples_per_call as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples_per_call == 0 {
            return Err(RenderError::InvalidSettings(
                "samples_per_call must be at least 1".into(),
            ));
        }
        if self.march_budget == 0 {
            return Err(RenderError::InvalidSettings(
                "march_budget must be at least 1".into(),
            ));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(RenderError::InvalidSettings(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        if !(self.gradient_threshold.is_finite() && self.gradient_threshold >= 0.0) {
            return Err(RenderError::InvalidSettings(format!(
                "gradient_threshold must be non-negative, got {}",
                self.gradient_threshold
            )));
        }
        if self.random_pair_count() > MAX_RANDOM_PAIRS {
            return Err(RenderError::InvalidSettings(format!(
                "max_bounce * samples_per_call = {} exceeds the {} random pairs available",
                self.random_pair_count(),
                MAX_RANDOM_PAIRS
            )));
        }
        Ok(())
    }
}

/// Host randomness injected into one photon call
///
/// Redrawn every call so successive accumulation passes explore different
/// light paths at the same pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRandomness {
    pub float0: f32,
    pub float1: f32,
    /// One pair per (sample, bounce), sample-major
    pub pairs: Vec<Vec2>,
}

impl CallRandomness {
    /// Draw uniform [0, 1) values for one call
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, settings: &PhotonSettings) -> Self {
        let float0 = rng.random::<f32>();
        let float1 = rng.random::<f32>();
        let pairs = (0..settings.random_pair_count())
            .map(|_| Vec2::new(rng.random::<f32>(), rng.random::<f32>()))
            .collect();
        Self {
            float0,
            float1,
            pairs,
        }
    }

    /// All zeros, for reproducible single passes
    pub fn zero(settings: &PhotonSettings) -> Self {
        Self {
            float0: 0.0,
            float1: 0.0,
            pairs: vec![Vec2::ZERO; settings.random_pair_count()],
        }
    }

    /// Host pair for `(sample, bounce)`; zero once `bounce` passes `max_bounce`
    pub fn pair(&self, sample: u32, bounce: u32, max_bounce: u32) -> Vec2 {
        if bounce >= max_bounce {
            return Vec2::ZERO;
        }
        let index = sample as usize * max_bounce as usize + bounce as usize;
        self.pairs.get(index).copied().unwrap_or(Vec2::ZERO)
    }

    /// Pairs flattened into the std140 `vec4[]` block layout, zero padded
    pub fn uniform_block(&self) -> Vec<f32> {
        let mut block = vec![0.0f32; MAX_RANDOM_PAIRS * 2];
        for (i, pair) in self.pairs.iter().take(MAX_RANDOM_PAIRS).enumerate() {
            block[i * 2] = pair.x;
            block[i * 2 + 1] = pair.y;
        }
        block
    }
}

/// Seed for the bounce taken at march step `step` of sample `sample`
fn bounce_seed(
    randomness: &CallRandomness,
    settings: &PhotonSettings,
    sample: u32,
    step: u32,
    bounce: u32,
) -> Vec2 {
    let samples = settings.samples_per_call as f32;
    let budget = settings.march_budget as f32;
    let total = samples * budget;
    let fi = (step as f32 * samples + sample as f32) / total;
    let fs = (sample as f32 * budget + step as f32) / total;
    let pair = randomness.pair(sample, bounce, settings.max_bounce);
    Vec2::new(
        randomness.float0 * fi + pair.x,
        randomness.float1 * fs + pair.y,
    )
}

/// One radiance estimate for the pixel at GL fragment coordinate `frag_coord`
///
/// `ray` is in volume-local space. A ray that misses the volume box sees the
/// environment directly.
pub fn trace_pixel(
    frag_coord: Vec2,
    ray: &Ray,
    resources: &ResourceSet,
    settings: &PhotonSettings,
    randomness: &CallRandomness,
) -> Vec3 {
    let dir = ray.direction.normalize_or_zero();
    let hit = intersect_aabb(
        ray.origin,
        Vec3::ONE / dir,
        VOLUME_BOUNDS_MIN,
        VOLUME_BOUNDS_MAX,
        BIG_DISTANCE,
    );
    if !hit.hit {
        return resources.environment(dir);
    }

    let step = settings.step_size;
    let entry = hit.dist.max(0.0) + step + random(frag_coord, settings.jitter_seed) * step;
    let samples = settings.samples_per_call.max(1);

    let mut radiance = Vec3::ZERO;
    for s in 0..samples {
        radiance += march_path(
            frag_coord,
            ray.origin + dir * entry,
            dir,
            s,
            resources,
            settings,
            randomness,
        );
    }
    radiance / samples as f32
}

fn march_path(
    frag_coord: Vec2,
    start: Vec3,
    dir: Vec3,
    sample: u32,
    resources: &ResourceSet,
    settings: &PhotonSettings,
    randomness: &CallRandomness,
) -> Vec3 {
    let step = settings.step_size;
    let mut position = start;
    let mut direction = dir;
    let mut throughput = Vec3::ONE;
    let mut bounces = 0;

    for i in 0..settings.march_budget {
        let gradient = resources.gradient(position);
        let magnitude = gradient.length();

        if magnitude > settings.gradient_threshold && magnitude > 0.0 {
            let normal = gradient / magnitude;
            if (-direction).dot(normal) > 0.0 || !settings.back_face_culling {
                let intensity = resources.intensity(position - normal * step * 3.0);
                let surface = resources.surface(intensity);

                let seed = bounce_seed(randomness, settings, sample, i, bounces);
                let r = random2(frag_coord, seed) * 2.0 - Vec2::ONE;
                let new_direction = random_unit_hemisphere(r, normal);

                throughput *= new_direction.dot(normal).max(0.0) * surface.truncate();
                direction = new_direction;
                bounces += 1;
            }
        }

        position += direction * step;

        if outside_volume(position) {
            return throughput * resources.environment(direction);
        }
    }

    Vec3::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use volume::{phantom, EnvironmentMap, TransferFunction, VolumeDims};

    fn sphere_resources(lut: glam::Vec4) -> ResourceSet {
        let volume = phantom::sphere(VolumeDims::cube(48), 0.25).unwrap();
        ResourceSet::new()
            .with_volume(volume)
            .with_lut(TransferFunction::constant(lut).unwrap())
            .with_environment(EnvironmentMap::uniform(Vec3::ONE))
    }

    #[test]
    fn test_default_settings_validate() {
        assert!(PhotonSettings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_random_block() {
        let settings = PhotonSettings {
            max_bounce: 100,
            samples_per_call: 100,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(RenderError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_draw_produces_one_pair_per_bounce() {
        let settings = PhotonSettings {
            max_bounce: 7,
            samples_per_call: 3,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let randomness = CallRandomness::draw(&mut rng, &settings);
        assert_eq!(randomness.pairs.len(), 21);
        assert!((0.0..1.0).contains(&randomness.float0));
        assert!(randomness
            .pairs
            .iter()
            .all(|p| (0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y)));
    }

    #[test]
    fn test_uniform_block_layout() {
        let randomness = CallRandomness {
            float0: 0.0,
            float1: 0.0,
            pairs: vec![Vec2::new(0.1, 0.2), Vec2::new(0.3, 0.4), Vec2::new(0.5, 0.6)],
        };
        let block = randomness.uniform_block();
        assert_eq!(block.len() * 4, RANDOM_BLOCK_SIZE);
        assert_eq!(&block[..6], &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(block[6], 0.0);
    }

    #[test]
    fn test_miss_returns_environment_along_view() {
        let resources = sphere_resources(glam::Vec4::ONE);
        let settings = PhotonSettings::default();
        let ray = Ray::new(Vec3::new(2.0, 2.0, -2.0), Vec3::Z);
        let c = trace_pixel(
            Vec2::new(0.5, 0.5),
            &ray,
            &resources,
            &settings,
            &CallRandomness::zero(&settings),
        );
        assert_eq!(c, Vec3::ONE);
    }

    #[test]
    fn test_ray_passing_beside_surface_sees_environment() {
        let resources = sphere_resources(glam::Vec4::ONE);
        let settings = PhotonSettings::default();
        let ray = Ray::new(Vec3::new(0.0, 0.45, -2.0), Vec3::Z);
        let c = trace_pixel(
            Vec2::new(3.5, 7.5),
            &ray,
            &resources,
            &settings,
            &CallRandomness::zero(&settings),
        );
        assert_eq!(c, Vec3::ONE);
    }

    #[test]
    fn test_black_surface_absorbs_everything() {
        let resources = sphere_resources(glam::Vec4::new(0.0, 0.0, 0.0, 1.0));
        let settings = PhotonSettings::default();
        let mut rng = StdRng::seed_from_u64(3);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        for _ in 0..8 {
            let randomness = CallRandomness::draw(&mut rng, &settings);
            let c = trace_pixel(Vec2::new(10.5, 10.5), &ray, &resources, &settings, &randomness);
            assert_eq!(c, Vec3::ZERO);
        }
    }

    #[test]
    fn test_pair_past_max_bounce_is_zero() {
        let randomness = CallRandomness {
            float0: 0.5,
            float1: 0.5,
            pairs: vec![Vec2::new(0.1, 0.2), Vec2::new(0.3, 0.4)],
        };
        assert_eq!(randomness.pair(0, 0, 1), Vec2::new(0.1, 0.2));
        assert_eq!(randomness.pair(1, 0, 1), Vec2::new(0.3, 0.4));
        // Must not alias the next sample's pair
        assert_eq!(randomness.pair(0, 1, 1), Vec2::ZERO);
        assert_eq!(randomness.pair(1, 5, 1), Vec2::ZERO);
        assert_eq!(randomness.pair(0, 0, 0), Vec2::ZERO);
    }

    #[test]
    fn test_paths_keep_scattering_past_max_bounce() {
        let resources = sphere_resources(glam::Vec4::ONE);
        let settings = PhotonSettings {
            max_bounce: 1,
            back_face_culling: false,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        // From the centre every path crosses the shell, scattering at each
        // step inside it, and leaves outward
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        for _ in 0..8 {
            let randomness = CallRandomness::draw(&mut rng, &settings);
            let c = trace_pixel(Vec2::new(6.5, 2.5), &ray, &resources, &settings, &randomness);
            println!("radiance {c}");
            assert!(c.min_element() > 0.0, "path dropped: {c}");
            assert!(c.max_element() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_back_face_culling_toggle() {
        let resources = sphere_resources(glam::Vec4::new(0.5, 0.5, 0.5, 1.0));
        let culled = PhotonSettings::default();
        let unculled = PhotonSettings {
            back_face_culling: false,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(17);
        // Leaving the sphere, the outward normal faces away from the ray
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        for _ in 0..8 {
            let randomness = CallRandomness::draw(&mut rng, &culled);
            let through = trace_pixel(Vec2::new(2.5, 5.5), &ray, &resources, &culled, &randomness);
            assert_eq!(through, Vec3::ONE);

            let scattered =
                trace_pixel(Vec2::new(2.5, 5.5), &ray, &resources, &unculled, &randomness);
            println!("culled {through} unculled {scattered}");
            assert!(scattered.max_element() < 1.0, "no scatter: {scattered}");
            assert!(scattered.min_element() >= 0.0);
        }
    }

    #[test]
    fn test_samples_per_call_are_averaged() {
        let resources = sphere_resources(glam::Vec4::new(0.8, 0.6, 0.4, 1.0));
        let settings = PhotonSettings {
            samples_per_call: 4,
            back_face_culling: false,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(23);
        let randomness = CallRandomness::draw(&mut rng, &settings);
        let frag = Vec2::new(12.5, 3.5);
        let ray = Ray::new(Vec3::new(0.05, -0.02, -2.0), Vec3::Z);

        let dir = ray.direction.normalize_or_zero();
        let hit = intersect_aabb(
            ray.origin,
            Vec3::ONE / dir,
            VOLUME_BOUNDS_MIN,
            VOLUME_BOUNDS_MAX,
            BIG_DISTANCE,
        );
        assert!(hit.hit);
        let step = settings.step_size;
        let entry = hit.dist.max(0.0) + step + random(frag, settings.jitter_seed) * step;
        let estimates: Vec<Vec3> = (0..4)
            .map(|s| {
                march_path(
                    frag,
                    ray.origin + dir * entry,
                    dir,
                    s,
                    &resources,
                    &settings,
                    &randomness,
                )
            })
            .collect();
        let expected = estimates.iter().copied().sum::<Vec3>() / 4.0;

        let c = trace_pixel(frag, &ray, &resources, &settings, &randomness);
        println!("estimates {estimates:?} mean {c}");
        assert!((c - expected).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_white_surface_never_amplifies() {
        let resources = sphere_resources(glam::Vec4::ONE);
        let settings = PhotonSettings::default();
        let mut rng = StdRng::seed_from_u64(11);
        let ray = Ray::new(Vec3::new(0.05, -0.02, -2.0), Vec3::Z);
        for _ in 0..16 {
            let randomness = CallRandomness::draw(&mut rng, &settings);
            let c = trace_pixel(Vec2::new(4.5, 9.5), &ray, &resources, &settings, &randomness);
            assert!(c.max_element() <= 1.0 + 1e-5, "amplified: {c}");
            assert!(c.min_element() >= 0.0);
        }
    }
}
