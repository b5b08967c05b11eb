//! Producer/consumer contract tests for volume resources
//!
//! Covers the addressing conventions the renderers rely on: aspect
//! correction, gradient bias, border behaviour, and raw loading.

use glam::Vec3;
use std::io::Write;
use volume::gradient::{decode_component, encode_component};
use volume::{
    load_raw, phantom, texture_coordinate, GradientVolume, RawFormat, ResourceSet, Volume,
    VolumeDims, VolumeError,
};

#[test]
fn test_aspect_correction_scales_z_by_depth_over_height() {
    let cubic = VolumeDims::cube(64);
    let flat = VolumeDims::new(64, 64, 32);
    let position = Vec3::new(0.0, 0.0, 0.5);

    let cubic_uvw = texture_coordinate(position, cubic);
    let flat_uvw = texture_coordinate(position, flat);

    assert_ne!(cubic_uvw, flat_uvw, "Non-cubic volume must map differently");
    assert_eq!(cubic_uvw.x, flat_uvw.x);
    assert_eq!(cubic_uvw.y, flat_uvw.y);

    // z offset from the centre is scaled by 1 / (depth / height)
    let ratio = flat.aspect();
    assert!((ratio - 0.5).abs() < 1e-6);
    assert!(((cubic_uvw.z - 0.5) / ratio - (flat_uvw.z - 0.5)).abs() < 1e-6);
    assert!((flat_uvw.z - 1.5).abs() < 1e-6);
}

#[test]
fn test_gradient_decode_round_trip() {
    let mut g = -0.5;
    while g <= 0.5 {
        let decoded = decode_component(encode_component(g));
        assert!(
            (decoded - g).abs() < 1e-6,
            "g = {} decoded as {}",
            g,
            decoded
        );
        g += 0.03125;
    }
}

#[test]
fn test_gradient_points_out_of_denser_material() {
    let volume = phantom::sphere(VolumeDims::cube(32), 0.3).unwrap();
    let gradient = GradientVolume::from_volume(&volume);

    // At the sphere surface on +X the stored gradient points away from the centre
    let g = gradient.sample(Vec3::new(0.3, 0.0, 0.0));
    assert!(g.x > 0.1, "expected strong outward gradient, got {:?}", g);
    assert!(g.length() > 0.06, "surface must exceed the default threshold");

    // Deep inside the gradient vanishes
    let inner = gradient.sample(Vec3::ZERO);
    assert!(inner.length() < 1e-6);
}

#[test]
fn test_resource_set_tolerates_missing_resources() {
    let resources = ResourceSet::new();
    assert_eq!(resources.intensity(Vec3::ZERO), 0.0);
    assert_eq!(resources.gradient(Vec3::ZERO), Vec3::ZERO);
    assert_eq!(resources.surface(0.5), glam::Vec4::ZERO);
    assert_eq!(resources.environment(Vec3::Y), Vec3::ZERO);
}

#[test]
fn test_with_volume_derives_gradient() {
    let volume = phantom::nested_shells(VolumeDims::cube(16)).unwrap();
    let resources = ResourceSet::new().with_volume(volume);
    let gradient = resources.gradient.as_ref().expect("gradient derived");
    assert_eq!(gradient.dims(), VolumeDims::cube(16));
}

#[test]
fn test_load_raw_u16() {
    let dims = VolumeDims::new(2, 2, 1);
    let values: [u16; 4] = [0, 1000, 32768, 65535];
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for v in values {
        file.write_all(&v.to_le_bytes()).unwrap();
    }
    file.flush().unwrap();

    let volume = load_raw(file.path(), dims, RawFormat::U16).unwrap();
    assert_eq!(volume.get(0, 0, 0), 0.0);
    assert_eq!(volume.get(1, 1, 0), 1.0);
    assert!((volume.get(0, 1, 0) - 32768.0 / 65535.0).abs() < 1e-6);
}

#[test]
fn test_load_raw_size_mismatch() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    file.flush().unwrap();

    let result = load_raw(file.path(), VolumeDims::cube(2), RawFormat::U8);
    assert!(matches!(
        result,
        Err(VolumeError::DataLength {
            expected: 8,
            actual: 3
        })
    ));
}

#[test]
fn test_load_raw_missing_file() {
    let result = load_raw("/nonexistent/volume.raw", VolumeDims::cube(2), RawFormat::U8);
    assert!(matches!(result, Err(VolumeError::Io(_))));
}

#[test]
fn test_volume_is_immutable_data_holder() {
    let volume = Volume::filled(VolumeDims::cube(2), 0.25).unwrap();
    let copy = volume.clone();
    assert_eq!(volume, copy);
    assert!(volume.data().iter().all(|&v| v == 0.25));
}
