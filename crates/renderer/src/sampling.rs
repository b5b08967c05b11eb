//! Stateless pseudo-random numbers shared by the CPU tracer and the shaders
//!
//! Every function here has a GLSL twin in `shaders/photon.frag`; both must
//! produce bit-identical results for the same inputs.

use glam::{UVec3, Vec2, Vec3};
use std::f32::consts::PI;

const MANTISSA_MASK: u32 = 0x007F_FFFF;
const FLOAT_ONE: u32 = 0x3F80_0000;

/// Avalanche integer hash
pub fn hash(mut x: u32) -> u32 {
    x = x.wrapping_add(x << 10);
    x ^= x >> 6;
    x = x.wrapping_add(x << 3);
    x ^= x >> 11;
    x = x.wrapping_add(x << 15);
    x
}

pub fn hash3(v: UVec3) -> u32 {
    hash(v.x ^ hash(v.y) ^ hash(v.z))
}

/// Map the low 23 bits of `h` onto [0, 1) through the float mantissa
pub fn float_from_bits(h: u32) -> f32 {
    f32::from_bits((h & MANTISSA_MASK) | FLOAT_ONE) - 1.0
}

/// Uniform value in [0, 1) for a fragment coordinate and seed
pub fn random(frag: Vec2, seed: f32) -> f32 {
    let bits = UVec3::new(frag.x.to_bits(), frag.y.to_bits(), seed.to_bits());
    float_from_bits(hash3(bits))
}

pub fn random2(frag: Vec2, seed: Vec2) -> Vec2 {
    Vec2::new(random(frag, seed.x), random(frag, seed.y))
}

pub fn random3(frag: Vec2, seed: Vec3) -> Vec3 {
    Vec3::new(
        random(frag, seed.x),
        random(frag, seed.y),
        random(frag, seed.z),
    )
}

/// GLSL `sign`: 0 for zero, unlike `f32::signum`
pub fn glsl_sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Direction on the unit sphere flipped into the hemisphere around `normal`
///
/// `r` holds two values in [-1, 1]: `r.x` selects the azimuth and `r.y` the
/// height along Z. A direction exactly tangent to the surface collapses to
/// zero.
pub fn random_unit_hemisphere(r: Vec2, normal: Vec3) -> Vec3 {
    let a = (r.x + 1.0) * PI;
    let u = r.y;
    let s = (1.0 - u * u).max(0.0).sqrt();
    let rh = Vec3::new(s * a.cos(), s * a.sin(), u);
    rh * glsl_sign(rh.dot(normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_values() {
        assert_eq!(hash(0), 0);
        assert_eq!(hash(1), 307_143_837);
        assert_eq!(hash(2), 614_320_443);
        assert_eq!(hash(0xDEAD_BEEF), 1_819_486_462);
    }

    #[test]
    fn test_random_known_value() {
        let r = random(Vec2::new(0.5, 0.5), 1234.0);
        assert_eq!(r.to_bits(), 0x3F70_DAF6);
    }

    #[test]
    fn test_float_from_bits_range() {
        assert_eq!(float_from_bits(0), 0.0);
        let max = float_from_bits(u32::MAX);
        assert!(max < 1.0);
        assert!(max > 0.9999);
    }

    #[test]
    fn test_random_is_deterministic() {
        let frag = Vec2::new(12.5, 40.5);
        assert_eq!(
            random(frag, 1234.0).to_bits(),
            random(frag, 1234.0).to_bits()
        );
    }

    #[test]
    fn test_glsl_sign() {
        assert_eq!(glsl_sign(0.0), 0.0);
        assert_eq!(glsl_sign(-0.0), 0.0);
        assert_eq!(glsl_sign(3.0), 1.0);
        assert_eq!(glsl_sign(-2.0), -1.0);
    }

    #[test]
    fn test_hemisphere_follows_normal() {
        let normal = Vec3::new(0.3, -0.8, 0.2).normalize();
        for i in 0..64 {
            for j in 0..64 {
                let r = Vec2::new(i as f32 / 32.0 - 1.0, j as f32 / 32.0 - 1.0 + 1.0 / 128.0);
                let d = random_unit_hemisphere(r, normal);
                assert!(d.dot(normal) >= 0.0);
                if d != Vec3::ZERO {
                    assert!((d.length() - 1.0).abs() < 1e-4);
                }
            }
        }
    }
}
