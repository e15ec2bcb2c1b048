// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Round-trips through the PNG bridge: write a result image, load it back
//! as a reference, and compare.

use kiln_image::{Format, Image, ImageArray, ImageError, MapAccess};

fn gradient(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

#[test]
fn grayscale_round_trip_preserves_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gray.png");
    let path = path.to_str().unwrap();

    let original = Image::from_pixels(gradient(64), Format::R8Unorm, 8, 8).unwrap();
    original.write_file(path).unwrap();

    let loaded = Image::from_file(path).unwrap();
    assert_eq!(loaded.width(), 8);
    assert_eq!(loaded.height(), 8);
    assert_eq!(loaded.format(), Format::R8Unorm);
    assert!(loaded.is_read_only());
    assert!(original.compare(&loaded).unwrap());
}

#[test]
fn rgba_round_trip_preserves_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("color.png");
    let path = path.to_str().unwrap();

    let original = Image::from_pixels(gradient(6 * 5 * 4), Format::Rgba8Unorm, 6, 5).unwrap();
    original.write_file(path).unwrap();

    let loaded = Image::from_file(path).unwrap();
    assert_eq!(loaded.format(), Format::Rgba8Unorm);
    assert!(original.compare(&loaded).unwrap());
}

#[test]
fn float_image_encodes_through_grayscale_intermediate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("depth.png");
    let path = path.to_str().unwrap();

    let mut pixels = Vec::new();
    for value in [0.0_f32, 0.25, 0.5, 1.0] {
        pixels.extend_from_slice(&value.to_ne_bytes());
    }
    let depth = Image::from_pixels(pixels, Format::R32Float, 2, 2).unwrap();
    depth.write_file(path).unwrap();

    let loaded = Image::from_file(path).unwrap();
    assert_eq!(loaded.format(), Format::R8Unorm);
    let map = loaded.map(MapAccess::READ).unwrap();
    assert_eq!(&map[..4], &[0, 63, 127, 255]);
}

#[test]
fn composite_depth_stencil_is_not_encodable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ds.png");

    let image = Image::from_pixels(vec![0; 4 * 4 * 4], Format::Depth24UnormStencil8, 4, 4).unwrap();
    assert!(matches!(
        image.write_file(path.to_str().unwrap()),
        Err(ImageError::Unencodable(_))
    ));
}

#[test]
fn write_requires_png_extension() {
    let image = Image::from_pixels(vec![0; 4], Format::R8Unorm, 2, 2).unwrap();
    assert!(matches!(
        image.write_file("/tmp/result.bmp"),
        Err(ImageError::UnknownExtension(_))
    ));
}

#[test]
fn load_rejects_unknown_extensions() {
    assert!(matches!(
        Image::from_file("reference.ktx"),
        Err(ImageError::UnknownExtension(_))
    ));
    assert!(matches!(
        Image::from_file("reference.jpeg"),
        Err(ImageError::UnknownExtension(_))
    ));
}

#[test]
fn load_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such.png");
    assert!(matches!(
        Image::from_file(path.to_str().unwrap()),
        Err(ImageError::Io { .. })
    ));
}

#[test]
fn repeated_maps_return_the_cached_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cached.png");
    let path = path.to_str().unwrap();

    Image::from_pixels(gradient(16), Format::R8Unorm, 4, 4)
        .unwrap()
        .write_file(path)
        .unwrap();

    let image = Image::from_file(path).unwrap();
    let first = image.map(MapAccess::READ).unwrap();
    let second = image.map(MapAccess::READ).unwrap();
    assert_eq!(first.as_ptr(), second.as_ptr());
    assert_eq!(&first[..], &gradient(16)[..]);
}

#[test]
fn png_loads_as_single_element_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layer.png");
    let path = path.to_str().unwrap();

    Image::from_pixels(gradient(16), Format::R8Unorm, 4, 4)
        .unwrap()
        .write_file(path)
        .unwrap();

    let array = ImageArray::from_file(path).unwrap();
    assert_eq!(array.len(), 1);
    assert_eq!(array.image(0).width(), 4);
}

#[test]
fn data_dir_env_var_resolves_relative_filenames() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("CRU_DATA_DIR", dir.path());

    let original = Image::from_pixels(gradient(16), Format::R8Unorm, 4, 4).unwrap();
    original.write_file("relative.ref.png").unwrap();
    assert!(dir.path().join("relative.ref.png").exists());

    let loaded = Image::from_file("relative.ref.png").unwrap();
    assert!(original.compare(&loaded).unwrap());

    std::env::remove_var("CRU_DATA_DIR");
}
