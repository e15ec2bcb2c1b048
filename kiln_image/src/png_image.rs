// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The PNG backing for [`Image`]: reference images load lazily from disk,
//! results encode back out.
//!
//! Loading reads only the header; the file handle stays open and the body
//! decodes on the first map, into a cache that lives as long as the image.
//! Codec failures are logged and surfaced as errors, never as process
//! termination; whether a missing or malformed reference image fails a test
//! is the caller's call.

use std::cell::{OnceCell, RefCell};
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek};
use std::path::{Path, PathBuf};
use std::ptr;

use crate::format::{Format, FormatInfo};
use crate::image::{Image, MapAccess};
use crate::ImageError;

/// State of a PNG-backed image: the open file, the header fields needed to
/// pick decode transforms, and the lazily filled pixel cache.
pub(crate) struct PngBacking {
    path: PathBuf,
    file: RefCell<File>,
    color_type: png::ColorType,
    bit_depth: png::BitDepth,
    decoded: OnceCell<Vec<u8>>,
}

/// Resolves a data filename against `$CRU_DATA_DIR`, falling back to the
/// built-in data directory. Absolute paths pass through untouched.
pub(crate) fn resolve_data_path(filename: &str) -> PathBuf {
    let filename = Path::new(filename);
    if filename.is_absolute() {
        return filename.to_owned();
    }
    match env::var_os("CRU_DATA_DIR") {
        Some(dir) if !dir.is_empty() => Path::new(&dir).join(filename),
        _ => Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("data")
            .join(filename),
    }
}

/// Opens `filename` and builds a lazily decoded, read-only image from its
/// header. Only 8-bit grayscale and 8-bit RGB/RGBA files are supported.
pub(crate) fn load(filename: &str) -> Result<Image, ImageError> {
    let path = resolve_data_path(filename);
    let mut file = File::open(&path).map_err(|source| {
        log::error!("failed to open file for reading: {}", path.display());
        ImageError::Io {
            path: path.clone(),
            source,
        }
    })?;

    let (color_type, bit_depth, width, height) = read_header(&mut file, &path)?;
    let format = match (color_type, bit_depth) {
        (png::ColorType::Rgb | png::ColorType::Rgba, png::BitDepth::Eight) => Format::Rgba8Unorm,
        (png::ColorType::Grayscale, png::BitDepth::Eight) => Format::R8Unorm,
        _ => {
            log::error!(
                "unsupported (color type, bit depth) = ({color_type:?}, {bit_depth:?}) in PNG file {}",
                path.display()
            );
            return Err(ImageError::UnsupportedPng {
                color_type,
                bit_depth,
                path,
            });
        }
    };

    Image::from_png_backing(
        PngBacking {
            path,
            file: RefCell::new(file),
            color_type,
            bit_depth,
            decoded: OnceCell::new(),
        },
        format,
        width,
        height,
    )
}

fn read_header(
    file: &mut File,
    path: &Path,
) -> Result<(png::ColorType, png::BitDepth, u32, u32), ImageError> {
    file.rewind().map_err(|source| io_error(path, source))?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let reader = decoder.read_info().map_err(|source| {
        log::error!("failed to read PNG header of {}", path.display());
        ImageError::Decode {
            path: path.to_owned(),
            source,
        }
    })?;
    let info = reader.info();
    Ok((info.color_type, info.bit_depth, info.width, info.height))
}

/// The permanent decode cache of a PNG-backed image, filling it on first
/// use. The returned slice lives as long as the image.
pub(crate) fn cached_pixels(image: &Image) -> Result<&[u8], ImageError> {
    let inner = image.inner();
    let crate::image::Backing::Png(png) = &inner.backing else {
        unreachable!("cached_pixels on a non-PNG image");
    };
    if let Some(pixels) = png.decoded.get() {
        return Ok(pixels);
    }
    let row_size = usize::from(inner.info.cpp) * inner.width as usize;
    let mut pixels = vec![0; row_size * inner.height as usize];
    decode_into(
        png,
        inner.info,
        inner.width,
        inner.height,
        &mut pixels,
        row_size,
    )?;
    Ok(png.decoded.get_or_init(|| pixels))
}

/// Copies a PNG-backed source into a writable destination: decoding
/// straight into the destination when the formats agree, otherwise through
/// a same-format intermediate and the general converting copy.
pub(crate) fn copy_to_pixels(src: &Image, dest: &Image) -> Result<(), ImageError> {
    debug_assert!(matches!(
        src.inner().backing,
        crate::image::Backing::Png(_)
    ));
    if ptr::eq(src.format_info(), dest.format_info()) {
        let crate::image::Backing::Png(png) = &src.inner().backing else {
            unreachable!();
        };
        let stride = dest.pitch_bytes() as usize;
        let mut map = dest.map(MapAccess::WRITE)?;
        decode_into(png, dest.format_info(), src.width(), src.height(), &mut map, stride)
    } else {
        let info = src.format_info();
        let size = usize::from(info.cpp) * src.width() as usize * src.height() as usize;
        let intermediate = Image::from_pixels(vec![0; size], info.format, src.width(), src.height())?;
        intermediate.copy_from(src)?;
        dest.copy_from(&intermediate)
    }
}

/// Decodes the whole file into `dest`, one row per `dest_stride` bytes.
///
/// The file's channel layout is reconciled with the destination format:
/// alpha-less files grow an opaque alpha channel when the destination
/// carries one.
fn decode_into(
    png: &PngBacking,
    info: &FormatInfo,
    width: u32,
    height: u32,
    dest: &mut [u8],
    dest_stride: usize,
) -> Result<(), ImageError> {
    let mut file = png.file.borrow_mut();
    file.rewind().map_err(|source| io_error(&png.path, source))?;

    let mut decoder = png::Decoder::new(BufReader::new(&mut *file));
    match png.color_type {
        png::ColorType::Rgb | png::ColorType::Grayscale => {
            if info.has_alpha {
                decoder.set_transformations(png::Transformations::ALPHA);
            }
        }
        png::ColorType::Rgba => {}
        color_type => {
            // load() rejected these.
            unreachable!("bad png color type {color_type:?}");
        }
    }
    let mut reader = decoder.read_info().map_err(|source| {
        log::error!("failed to re-read PNG header of {}", png.path.display());
        ImageError::Decode {
            path: png.path.clone(),
            source,
        }
    })?;

    let row_size = usize::from(info.cpp) * width as usize;
    if reader.output_line_size(width) != row_size {
        log::error!(
            "PNG file {} does not decode to the {} layout",
            png.path.display(),
            info.name
        );
        return Err(ImageError::UnsupportedPng {
            color_type: png.color_type,
            bit_depth: png.bit_depth,
            path: png.path.clone(),
        });
    }

    let decode_err = |source| {
        log::error!("failed to decode PNG file {}", png.path.display());
        ImageError::Decode {
            path: png.path.clone(),
            source,
        }
    };
    if dest_stride == row_size {
        // Tightly packed destination: decode in place.
        reader
            .next_frame(&mut dest[..row_size * height as usize])
            .map_err(decode_err)?;
    } else {
        let mut scratch = vec![0; reader.output_buffer_size()];
        reader.next_frame(&mut scratch).map_err(decode_err)?;
        for y in 0..height as usize {
            dest[y * dest_stride..][..row_size].copy_from_slice(&scratch[y * row_size..][..row_size]);
        }
    }
    Ok(())
}

/// Writes `image` to a PNG file under the data directory.
///
/// Only `R8Unorm` (grayscale) and `Rgba8Unorm` (RGBA) encode directly;
/// single-channel formats with a known conversion are routed through an
/// `R8Unorm` intermediate first.
pub(crate) fn write_file(image: &Image, filename: &str) -> Result<(), ImageError> {
    if !filename.ends_with(".png") {
        log::error!("filename does not have a '.png' extension: {filename}");
        return Err(ImageError::NotPng(filename.to_owned()));
    }
    match image.format() {
        Format::R8Unorm | Format::Rgba8Unorm => write_direct(image, filename),
        _ => write_indirect(image, filename),
    }
}

fn write_direct(image: &Image, filename: &str) -> Result<(), ImageError> {
    let color_type = match image.format() {
        Format::R8Unorm => png::ColorType::Grayscale,
        Format::Rgba8Unorm => png::ColorType::Rgba,
        _ => {
            log::error!("cannot write {} to a PNG file", image.format_info().name);
            return Err(ImageError::Unencodable(image.format_info().name));
        }
    };

    let path = resolve_data_path(filename);
    let width = image.width();
    let height = image.height() as usize;
    let row_size = usize::from(image.format_info().cpp) * width as usize;
    let stride = image.pitch_bytes() as usize;

    let map = image.map(MapAccess::READ)?;
    let file = File::create(&path).map_err(|source| {
        log::error!("failed to open file for writing: {}", path.display());
        ImageError::Io {
            path: path.clone(),
            source,
        }
    })?;

    let encode_err = |source| {
        log::error!("failed to encode PNG file {}", path.display());
        ImageError::Encode {
            path: path.clone(),
            source,
        }
    };
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, image.height());
    encoder.set_color(color_type);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(encode_err)?;
    if stride == row_size {
        writer
            .write_image_data(&map[..row_size * height])
            .map_err(encode_err)?;
    } else {
        let mut rows = Vec::with_capacity(row_size * height);
        for y in 0..height {
            rows.extend_from_slice(&map[y * stride..][..row_size]);
        }
        writer.write_image_data(&rows).map_err(encode_err)?;
    }
    writer.finish().map_err(encode_err)?;
    Ok(())
}

fn write_indirect(image: &Image, filename: &str) -> Result<(), ImageError> {
    let intermediate_format = match image.format() {
        Format::Depth32Float | Format::R32Float | Format::R32Uint | Format::Stencil8 => {
            Format::R8Unorm
        }
        _ => {
            log::error!("cannot write {} to a PNG file", image.format_info().name);
            return Err(ImageError::Unencodable(image.format_info().name));
        }
    };

    let info = FormatInfo::lookup(intermediate_format).ok_or_else(|| {
        log::error!("unregistered format {intermediate_format:?}");
        ImageError::UnknownFormat(intermediate_format)
    })?;
    let size = usize::from(info.cpp) * image.width() as usize * image.height() as usize;
    let intermediate =
        Image::from_pixels(vec![0; size], intermediate_format, image.width(), image.height())?;
    intermediate.copy_from(image)?;
    write_direct(&intermediate, filename)
}

fn io_error(path: &Path, source: std::io::Error) -> ImageError {
    log::error!("i/o error on {}: {source}", path.display());
    ImageError::Io {
        path: path.to_owned(),
        source,
    }
}
