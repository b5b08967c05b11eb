use renderer::{AccumulationState, Renderer};
use viewer::{parse_config, render_headless, HeadlessOptions};

const UNIFORM_SKY: &str = r#"
[volume]
phantom = "empty"
size = 8

[photon]
march_budget = 2000

[environment]
uniform = [1.0, 0.5, 0.0]
"#;

#[test]
fn test_headless_empty_volume_shows_uniform_sky() {
    let config = parse_config(UNIFORM_SKY).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sky.png");

    let options = HeadlessOptions {
        width: 16,
        height: 12,
        frames: 2,
        seed: 7,
        output: Some(path.clone()),
    };
    let tracer = render_headless(&config, &options).unwrap();
    assert_eq!(tracer.sample_count(), 2);
    assert_eq!(tracer.state(), AccumulationState::Accumulating(2));

    let image = image::open(&path).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (16, 12));
    for (x, y, pixel) in image.enumerate_pixels() {
        assert_eq!(pixel.0, [255, 128, 0], "pixel ({}, {})", x, y);
    }
}

#[test]
fn test_headless_sphere_differs_from_sky() {
    let source = r#"
        [volume]
        phantom = "sphere"
        size = 32
        radius = 0.3

        [camera]
        distance = 2.5

        [photon]
        max_bounce = 4

        [environment]
        uniform = [1.0, 1.0, 1.0]
    "#;
    let config = parse_config(source).unwrap();
    let options = HeadlessOptions {
        width: 24,
        height: 24,
        frames: 4,
        seed: 11,
        output: None,
    };
    let tracer = render_headless(&config, &options).unwrap();

    let corner = tracer.average(0, 0);
    let centre = tracer.average(12, 12);
    println!("corner {:?} centre {:?}", corner, centre);

    // Corner rays miss the box and see the sky directly
    assert!((corner - glam::Vec3::ONE).abs().max_element() < 1e-6);
    // The LUT-coloured surface never reflects more than it receives
    assert!(centre.max_element() <= 1.0 + 1e-5);
}
