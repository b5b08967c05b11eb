//! Environment cube map
//!
//! Six square RGB faces in GL cube-map order. Rays leaving the volume read
//! their emitted background radiance from here. Face selection and
//! per-face coordinates follow the GL major-axis rules so the CPU tracer and
//! the `samplerCube` lookup agree.

use crate::error::{Result, VolumeError};
use glam::{Vec2, Vec3};

/// Cube map faces in GL upload order (`TEXTURE_CUBE_MAP_POSITIVE_X + i`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Select the face and its `[0, 1]^2` coordinate for a direction
    pub fn from_direction(dir: Vec3) -> (CubeFace, Vec2) {
        let a = dir.abs();
        let (face, sc, tc, ma) = if a.x >= a.y && a.x >= a.z {
            if dir.x >= 0.0 {
                (CubeFace::PositiveX, -dir.z, -dir.y, a.x)
            } else {
                (CubeFace::NegativeX, dir.z, -dir.y, a.x)
            }
        } else if a.y >= a.z {
            if dir.y >= 0.0 {
                (CubeFace::PositiveY, dir.x, dir.z, a.y)
            } else {
                (CubeFace::NegativeY, dir.x, -dir.z, a.y)
            }
        } else if dir.z >= 0.0 {
            (CubeFace::PositiveZ, dir.x, -dir.y, a.z)
        } else {
            (CubeFace::NegativeZ, -dir.x, -dir.y, a.z)
        };

        let st = (Vec2::new(sc, tc) / ma + Vec2::ONE) * 0.5;
        (face, st)
    }

    /// Unnormalized direction through a face coordinate in `[0, 1]^2`
    pub fn direction(self, st: Vec2) -> Vec3 {
        let sc = st.x * 2.0 - 1.0;
        let tc = st.y * 2.0 - 1.0;
        match self {
            CubeFace::PositiveX => Vec3::new(1.0, -tc, -sc),
            CubeFace::NegativeX => Vec3::new(-1.0, -tc, sc),
            CubeFace::PositiveY => Vec3::new(sc, 1.0, tc),
            CubeFace::NegativeY => Vec3::new(sc, -1.0, -tc),
            CubeFace::PositiveZ => Vec3::new(sc, -tc, 1.0),
            CubeFace::NegativeZ => Vec3::new(-sc, -tc, -1.0),
        }
    }
}

/// RGB radiance cube map
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentMap {
    size: u32,
    faces: [Vec<Vec3>; 6],
}

impl EnvironmentMap {
    /// Build from six row-major faces of `size * size` texels
    pub fn from_faces(size: u32, faces: [Vec<Vec3>; 6]) -> Result<Self> {
        let expected = size as usize * size as usize;
        for (face, texels) in faces.iter().enumerate() {
            if size == 0 {
                return Err(VolumeError::InvalidEnvironmentFace {
                    face,
                    reason: "face size must be positive".to_string(),
                });
            }
            if texels.len() != expected {
                return Err(VolumeError::InvalidEnvironmentFace {
                    face,
                    reason: format!("expected {} texels, got {}", expected, texels.len()),
                });
            }
        }
        Ok(Self { size, faces })
    }

    /// Same radiance in every direction
    pub fn uniform(color: Vec3) -> Self {
        Self {
            size: 1,
            faces: std::array::from_fn(|_| vec![color]),
        }
    }

    /// Build by evaluating `radiance` at every texel centre direction
    pub fn from_fn(size: u32, radiance: impl Fn(Vec3) -> Vec3) -> Result<Self> {
        let faces = CubeFace::ALL.map(|face| {
            let mut texels = Vec::with_capacity(size as usize * size as usize);
            for t in 0..size {
                for s in 0..size {
                    let st = Vec2::new(
                        (s as f32 + 0.5) / size as f32,
                        (t as f32 + 0.5) / size as f32,
                    );
                    texels.push(radiance(face.direction(st).normalize()));
                }
            }
            texels
        });
        Self::from_faces(size, faces)
    }

    /// Sky/ground gradient with logarithmic falloff from the horizon
    pub fn sky_gradient(zenith: Vec3, horizon: Vec3, ground: Vec3, size: u32) -> Result<Self> {
        Self::from_fn(size, |dir| {
            let t = dir.y.abs();
            let log_t = (1.0 + t * 15.0).log2() / 16.0_f32.log2();
            if dir.y >= 0.0 {
                horizon.lerp(zenith, log_t)
            } else {
                horizon.lerp(ground, log_t)
            }
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self, face: CubeFace) -> &[Vec3] {
        &self.faces[face.index()]
    }

    /// Interleaved RGB floats of one face for upload
    pub fn face_rgb_f32(&self, face: CubeFace) -> Vec<f32> {
        self.faces[face.index()]
            .iter()
            .flat_map(|c| c.to_array())
            .collect()
    }

    fn texel(&self, face: CubeFace, s: i64, t: i64) -> Vec3 {
        let max = self.size as i64 - 1;
        let (s, t) = (s.clamp(0, max) as usize, t.clamp(0, max) as usize);
        self.faces[face.index()][t * self.size as usize + s]
    }

    /// Bilinear radiance lookup along `dir` (need not be normalized)
    ///
    /// A zero or non-finite direction has no defined face and reads black.
    pub fn sample(&self, dir: Vec3) -> Vec3 {
        if !dir.is_finite() || dir == Vec3::ZERO {
            return Vec3::ZERO;
        }

        let (face, st) = CubeFace::from_direction(dir);
        let p = st * self.size as f32 - Vec2::splat(0.5);
        let base = p.floor();
        let f = p - base;
        let (s0, t0) = (base.x as i64, base.y as i64);

        let lerp = |a: Vec3, b: Vec3, w: f32| a + (b - a) * w;
        let top = lerp(self.texel(face, s0, t0), self.texel(face, s0 + 1, t0), f.x);
        let bottom = lerp(
            self.texel(face, s0, t0 + 1),
            self.texel(face, s0 + 1, t0 + 1),
            f.x,
        );
        lerp(top, bottom, f.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_selection_follows_major_axis() {
        assert_eq!(CubeFace::from_direction(Vec3::X).0, CubeFace::PositiveX);
        assert_eq!(CubeFace::from_direction(-Vec3::Y).0, CubeFace::NegativeY);
        assert_eq!(CubeFace::from_direction(Vec3::new(0.1, 0.2, -0.9)).0, CubeFace::NegativeZ);
    }

    #[test]
    fn test_face_direction_round_trip() {
        for face in CubeFace::ALL {
            let st = Vec2::new(0.3, 0.8);
            let (back, back_st) = CubeFace::from_direction(face.direction(st));
            assert_eq!(back, face);
            assert!((back_st - st).length() < 1e-5);
        }
    }

    #[test]
    fn test_uniform_is_exact_everywhere() {
        let color = Vec3::new(0.25, 0.5, 0.75);
        let env = EnvironmentMap::uniform(color);
        for dir in [Vec3::X, -Vec3::Z, Vec3::new(0.3, -0.4, 0.5)] {
            assert_eq!(env.sample(dir), color);
        }
        assert_eq!(env.sample(Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn test_sky_gradient_separates_sky_and_ground() {
        let zenith = Vec3::new(0.1, 0.2, 0.9);
        let ground = Vec3::new(0.3, 0.3, 0.3);
        let env = EnvironmentMap::sky_gradient(zenith, Vec3::ONE, ground, 16).unwrap();
        let up = env.sample(Vec3::Y);
        let down = env.sample(-Vec3::Y);
        assert!(up.z > up.x);
        assert!((down.x - down.z).abs() < 1e-5);
    }

    #[test]
    fn test_wrong_face_size_rejected() {
        let faces = std::array::from_fn(|i| vec![Vec3::ZERO; if i == 3 { 3 } else { 4 }]);
        assert!(EnvironmentMap::from_faces(2, faces).is_err());
    }
}
