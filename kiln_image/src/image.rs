// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The harness's 2D image value: reference-counted pixel storage behind one
//! of three backing variants, with mapping, a closed menu of format
//! conversions, and byte-exact comparison.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::rc::Rc;

use bitflags::bitflags;

use crate::format::{Format, FormatInfo};
use crate::png_image::{self, PngBacking};
use crate::ImageError;

bitflags! {
    /// Access requested when mapping an image's pixels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapAccess: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

/// A 2D pixel buffer with shared ownership.
///
/// Cloning the handle shares the underlying storage; the backing resources
/// (pixel memory, an open PNG file handle) are released when the last
/// handle drops. `Image` is a single-threaded type: the harness runs tests
/// strictly one at a time, so a plain `Rc` and `Cell`s suffice.
/// Multi-threaded use would need `Arc` and atomics.
#[derive(Clone)]
pub struct Image {
    inner: Rc<ImageInner>,
}

pub(crate) struct ImageInner {
    pub(crate) info: &'static FormatInfo,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) read_only: bool,
    /// Row stride override in bytes; 0 means tightly packed.
    pub(crate) pitch_bytes: Cell<u32>,
    pub(crate) backing: Backing,
}

/// The concrete storage strategy behind an image.
pub(crate) enum Backing {
    /// Caller-supplied pixel memory, owned by the image.
    Pixels(RefCell<Vec<u8>>),
    /// An open PNG file, decoded lazily on first map. Always read-only.
    Png(PngBacking),
    /// A snapshot transferred out of a device resource. The row stride may
    /// include padding from a linearly-tiled source; see
    /// [`Image::set_pitch_bytes`].
    Device(RefCell<Vec<u8>>),
}

impl Image {
    /// Wraps caller-supplied pixel memory in an image.
    ///
    /// The buffer is moved in, not copied. Fails if the format has no
    /// registered descriptor, the extent is zero, or the buffer is shorter
    /// than the tightly-packed pixel size.
    pub fn from_pixels(
        pixels: Vec<u8>,
        format: Format,
        width: u32,
        height: u32,
    ) -> Result<Image, ImageError> {
        let inner = ImageInner::new(format, width, height, false)?;
        ImageInner::check_buffer_len(&pixels, inner.info, width, height)?;
        Ok(Image {
            inner: Rc::new(ImageInner {
                backing: Backing::Pixels(RefCell::new(pixels)),
                ..inner
            }),
        })
    }

    /// Wraps pixel data read back from a device resource.
    ///
    /// Same contract as [`Image::from_pixels`]; the variant records that the
    /// data is a device snapshot, and such images usually carry an explicit
    /// pitch when the source was linearly tiled.
    pub fn from_device_readback(
        pixels: Vec<u8>,
        format: Format,
        width: u32,
        height: u32,
    ) -> Result<Image, ImageError> {
        let inner = ImageInner::new(format, width, height, false)?;
        ImageInner::check_buffer_len(&pixels, inner.info, width, height)?;
        Ok(Image {
            inner: Rc::new(ImageInner {
                backing: Backing::Device(RefCell::new(pixels)),
                ..inner
            }),
        })
    }

    /// Loads an image from a file, dispatching on the extension.
    ///
    /// Only `.png` is supported. The filename resolves relative to the data
    /// directory unless absolute.
    pub fn from_file(filename: &str) -> Result<Image, ImageError> {
        if filename.ends_with(".png") {
            png_image::load(filename)
        } else if filename.ends_with(".ktx") {
            log::error!("loading {filename} requires an image array, and KTX is not supported");
            Err(ImageError::UnknownExtension(filename.to_owned()))
        } else {
            log::error!("unknown file extension in {filename}");
            Err(ImageError::UnknownExtension(filename.to_owned()))
        }
    }

    pub(crate) fn from_png_backing(
        backing: PngBacking,
        format: Format,
        width: u32,
        height: u32,
    ) -> Result<Image, ImageError> {
        let inner = ImageInner::new(format, width, height, true)?;
        Ok(Image {
            inner: Rc::new(ImageInner {
                backing: Backing::Png(backing),
                ..inner
            }),
        })
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn format(&self) -> Format {
        self.inner.info.format
    }

    pub fn format_info(&self) -> &'static FormatInfo {
        self.inner.info
    }

    /// PNG-backed images are always read-only; they can be mapped for
    /// reading and used as copy sources, but never written.
    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    /// Row stride in bytes; the tightly-packed width unless overridden.
    pub fn pitch_bytes(&self) -> u32 {
        match self.inner.pitch_bytes.get() {
            0 => self.inner.width * u32::from(self.inner.info.cpp),
            pitch => pitch,
        }
    }

    /// Overrides the row stride, for pixel data whose rows carry alignment
    /// padding (e.g. a linearly-tiled device readback).
    pub fn set_pitch_bytes(&self, pitch_bytes: u32) {
        self.inner.pitch_bytes.set(pitch_bytes);
    }

    /// Maps the image's pixels for reading and/or writing.
    ///
    /// The first read map of a PNG-backed image decodes the whole file into
    /// a cache that lives as long as the image; later maps return the same
    /// buffer without re-decoding.
    ///
    /// # Panics
    ///
    /// Requesting [`MapAccess::WRITE`] on a read-only image is a contract
    /// violation and panics, as is an empty access mask.
    pub fn map(&self, access: MapAccess) -> Result<Mapping<'_>, ImageError> {
        assert!(!access.is_empty(), "map requires a non-empty access mask");
        if access.contains(MapAccess::WRITE) && self.inner.read_only {
            log::error!("read-only image cannot be mapped for writing");
            panic!("read-only image mapped for writing");
        }
        let repr = match &self.inner.backing {
            Backing::Pixels(pixels) | Backing::Device(pixels) => {
                if access.contains(MapAccess::WRITE) {
                    MapRepr::Exclusive(pixels.borrow_mut())
                } else {
                    MapRepr::Shared(pixels.borrow())
                }
            }
            Backing::Png(_) => MapRepr::Decoded(png_image::cached_pixels(self)?),
        };
        Ok(Mapping { repr })
    }

    /// Copies `src` into this image, converting formats where supported.
    ///
    /// Source and destination must be distinct objects with equal extents
    /// and channel counts, and the destination must be writable. Beyond the
    /// identity copy, only a closed menu of conversions exists; anything
    /// else fails. This is not a general pixel converter.
    pub fn copy_from(&self, src: &Image) -> Result<(), ImageError> {
        self.check_copy_compatible(src)?;
        if self.inner.read_only {
            log::error!("copy: destination image is read-only");
            return Err(ImageError::ReadOnlyDestination);
        }
        if matches!(src.inner.backing, Backing::Png(_)) {
            png_image::copy_to_pixels(src, self)
        } else {
            copy_pixels_to_pixels(self, src)
        }
    }

    fn check_copy_compatible(&self, src: &Image) -> Result<(), ImageError> {
        if Rc::ptr_eq(&self.inner, &src.inner) {
            log::error!("copy: source and destination are the same image");
            return Err(ImageError::SameImage);
        }
        if self.inner.info.channels != src.inner.info.channels {
            log::error!(
                "copy: image formats {} and {} differ in channel count",
                src.inner.info.name,
                self.inner.info.name
            );
            return Err(ImageError::ChannelCountMismatch {
                a: src.inner.info.name,
                b: self.inner.info.name,
            });
        }
        if self.inner.width != src.inner.width || self.inner.height != src.inner.height {
            log::error!("copy: image extents differ");
            return Err(ImageError::ExtentMismatch {
                a_width: src.inner.width,
                a_height: src.inner.height,
                b_width: self.inner.width,
                b_height: self.inner.height,
            });
        }
        Ok(())
    }

    /// Compares two whole images byte for byte.
    ///
    /// Identical objects trivially compare equal without mapping. Differing
    /// extents are an error, not an inequality, so misuse stays
    /// distinguishable from a real mismatch.
    pub fn compare(&self, other: &Image) -> Result<bool, ImageError> {
        if self.inner.width != other.inner.width || self.inner.height != other.inner.height {
            log::error!("compare: image dimensions differ");
            return Err(ImageError::ExtentMismatch {
                a_width: self.inner.width,
                a_height: self.inner.height,
                b_width: other.inner.width,
                b_height: other.inner.height,
            });
        }
        self.compare_rect(0, 0, other, 0, 0, self.inner.width, self.inner.height)
    }

    /// Compares a `width` x `height` rectangle of two images byte for byte.
    ///
    /// The formats must match exactly, with one sanctioned exception:
    /// 8-bit stencil output may be compared against an 8-bit
    /// unsigned-normalized (grayscale) reference, in either direction. No
    /// other cross-format pair compares, and there is no tolerance.
    ///
    /// On a mismatch the differing row index is logged and `Ok(false)`
    /// returned.
    pub fn compare_rect(
        &self,
        x: u32,
        y: u32,
        other: &Image,
        other_x: u32,
        other_y: u32,
        width: u32,
        height: u32,
    ) -> Result<bool, ImageError> {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return Ok(true);
        }

        let a_info = self.inner.info;
        let b_info = other.inner.info;
        let stencil_exception = matches!(
            (a_info.format, b_info.format),
            (Format::Stencil8, Format::R8Unorm) | (Format::R8Unorm, Format::Stencil8)
        );
        if !ptr::eq(a_info, b_info) && !stencil_exception {
            log::error!(
                "compare: image formats {} and {} are incompatible",
                a_info.name,
                b_info.name
            );
            return Err(ImageError::IncompatibleFormats {
                a: a_info.name,
                b: b_info.name,
            });
        }

        if u64::from(x) + u64::from(width) > u64::from(self.inner.width)
            || u64::from(y) + u64::from(height) > u64::from(self.inner.height)
            || u64::from(other_x) + u64::from(width) > u64::from(other.inner.width)
            || u64::from(other_y) + u64::from(height) > u64::from(other.inner.height)
        {
            log::error!("compare: rect exceeds image dimensions");
            return Err(ImageError::RectOutOfBounds);
        }

        let cpp = usize::from(a_info.cpp);
        let row_size = cpp * width as usize;
        let a_stride = self.pitch_bytes() as usize;
        let b_stride = other.pitch_bytes() as usize;

        let a_map = self.map(MapAccess::READ)?;
        let b_map = other.map(MapAccess::READ)?;

        for row in 0..height as usize {
            let a_row = &a_map[(y as usize + row) * a_stride + x as usize * cpp..][..row_size];
            let b_row =
                &b_map[(other_y as usize + row) * b_stride + other_x as usize * cpp..][..row_size];
            if a_row != b_row {
                log::error!("compare: diff found in row {row} of rect");
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Writes the image to a file; only `.png` is supported.
    pub fn write_file(&self, filename: &str) -> Result<(), ImageError> {
        if filename.ends_with(".png") {
            png_image::write_file(self, filename)
        } else {
            log::error!("unknown file extension in {filename}");
            Err(ImageError::UnknownExtension(filename.to_owned()))
        }
    }

    pub(crate) fn inner(&self) -> &ImageInner {
        &self.inner
    }
}

impl ImageInner {
    /// Validates the common attributes; the caller supplies the backing.
    fn new(
        format: Format,
        width: u32,
        height: u32,
        read_only: bool,
    ) -> Result<ImageInner, ImageError> {
        let info = FormatInfo::lookup(format).ok_or_else(|| {
            log::error!("cannot create image with unregistered format {format:?}");
            ImageError::UnknownFormat(format)
        })?;
        if width == 0 || height == 0 {
            log::error!("cannot create image with zero width or height");
            return Err(ImageError::ZeroExtent);
        }
        Ok(ImageInner {
            info,
            width,
            height,
            read_only,
            pitch_bytes: Cell::new(0),
            backing: Backing::Pixels(RefCell::new(Vec::new())),
        })
    }

    fn check_buffer_len(
        pixels: &[u8],
        info: &FormatInfo,
        width: u32,
        height: u32,
    ) -> Result<(), ImageError> {
        let expected = usize::from(info.cpp) * width as usize * height as usize;
        if pixels.len() < expected {
            log::error!(
                "pixel buffer holds {} bytes, need at least {expected} for a {width}x{height} {} image",
                pixels.len(),
                info.name
            );
            return Err(ImageError::ShortPixelBuffer {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(())
    }
}

/// A mapped view of an image's pixels.
///
/// Derefs to `[u8]`; write maps also deref mutably. Dropping the guard
/// unmaps. Writes land directly in the image's backing storage, so the
/// release cannot fail and needs no explicit write-back step.
pub struct Mapping<'a> {
    repr: MapRepr<'a>,
}

enum MapRepr<'a> {
    /// The permanent decode cache of a PNG-backed image.
    Decoded(&'a [u8]),
    Shared(Ref<'a, Vec<u8>>),
    Exclusive(RefMut<'a, Vec<u8>>),
}

impl Deref for Mapping<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.repr {
            MapRepr::Decoded(pixels) => pixels,
            MapRepr::Shared(pixels) => pixels,
            MapRepr::Exclusive(pixels) => pixels,
        }
    }
}

impl DerefMut for Mapping<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match &mut self.repr {
            MapRepr::Exclusive(pixels) => pixels,
            _ => panic!("image mapping was not created with write access"),
        }
    }
}

type PixelCopyFn = fn(usize, usize, &[u8], usize, &mut [u8], usize);

fn copy_pixels_to_pixels(dest: &Image, src: &Image) -> Result<(), ImageError> {
    let width = src.width() as usize;
    let height = src.height() as usize;
    let src_stride = src.pitch_bytes() as usize;
    let dest_stride = dest.pitch_bytes() as usize;

    debug_assert!(!dest.is_read_only());
    debug_assert_eq!(src.width(), dest.width());
    debug_assert_eq!(src.height(), dest.height());

    let identity = ptr::eq(src.format_info(), dest.format_info()) && src_stride == dest_stride;
    let copy: PixelCopyFn = if identity {
        copy_memcpy
    } else {
        match (src.format(), dest.format()) {
            (Format::R8Unorm, Format::Depth32Float) => copy_unorm8_to_f32,
            (Format::R32Float | Format::Depth32Float, Format::R8Unorm) => copy_f32_to_unorm8,
            (Format::R32Uint, Format::R8Unorm) => copy_unorm32_to_unorm8,
            (Format::R8Unorm, Format::Stencil8) | (Format::Stencil8, Format::R8Unorm) => copy_u8,
            _ => {
                log::error!(
                    "copy: unsupported conversion from {} to {}",
                    src.format_info().name,
                    dest.format_info().name
                );
                return Err(ImageError::UnsupportedConversion {
                    src: src.format_info().name,
                    dest: dest.format_info().name,
                });
            }
        }
    };

    let src_map = src.map(MapAccess::READ)?;
    let mut dest_map = dest.map(MapAccess::WRITE)?;
    copy(width, height, &src_map, src_stride, &mut dest_map, dest_stride);
    Ok(())
}

fn copy_memcpy(_width: usize, height: usize, src: &[u8], stride: usize, dest: &mut [u8], _: usize) {
    dest[..height * stride].copy_from_slice(&src[..height * stride]);
}

fn copy_u8(
    width: usize,
    height: usize,
    src: &[u8],
    src_stride: usize,
    dest: &mut [u8],
    dest_stride: usize,
) {
    for y in 0..height {
        let src_row = &src[y * src_stride..][..width];
        let dest_row = &mut dest[y * dest_stride..][..width];
        dest_row.copy_from_slice(src_row);
    }
}

fn copy_unorm8_to_f32(
    width: usize,
    height: usize,
    src: &[u8],
    src_stride: usize,
    dest: &mut [u8],
    dest_stride: usize,
) {
    for y in 0..height {
        let src_row = &src[y * src_stride..][..width];
        let dest_row = &mut dest[y * dest_stride..][..width * 4];
        for (&value, out) in src_row.iter().zip(dest_row.chunks_exact_mut(4)) {
            let f = f32::from(value) / 255.0;
            out.copy_from_slice(&f.to_ne_bytes());
        }
    }
}

fn copy_f32_to_unorm8(
    width: usize,
    height: usize,
    src: &[u8],
    src_stride: usize,
    dest: &mut [u8],
    dest_stride: usize,
) {
    for y in 0..height {
        let src_row = &src[y * src_stride..][..width * 4];
        let dest_row = &mut dest[y * dest_stride..][..width];
        for (pixel, out) in src_row.chunks_exact(4).zip(dest_row) {
            let f = f32::from_ne_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
            *out = (255.0 * f) as u8;
        }
    }
}

fn copy_unorm32_to_unorm8(
    width: usize,
    height: usize,
    src: &[u8],
    src_stride: usize,
    dest: &mut [u8],
    dest_stride: usize,
) {
    for y in 0..height {
        let src_row = &src[y * src_stride..][..width * 4];
        let dest_row = &mut dest[y * dest_stride..][..width];
        for (pixel, out) in src_row.chunks_exact(4).zip(dest_row) {
            let value = u32::from_ne_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
            *out = ((255 * u64::from(value)) / u64::from(u32::MAX)) as u8;
        }
    }
}

/// An ordered sequence of images sharing one reference-counted lifetime,
/// for multi-layer and multi-level sources.
#[derive(Clone)]
pub struct ImageArray {
    images: Rc<[Image]>,
}

impl ImageArray {
    /// Loads an image array from a file; a `.png` yields a one-element
    /// array. Multi-image container formats are not supported.
    pub fn from_file(filename: &str) -> Result<ImageArray, ImageError> {
        if filename.ends_with(".png") {
            let image = png_image::load(filename)?;
            Ok(ImageArray {
                images: Rc::from(vec![image]),
            })
        } else {
            log::error!("unknown file extension in {filename}");
            Err(ImageError::UnknownExtension(filename.to_owned()))
        }
    }

    pub fn from_images(images: Vec<Image>) -> ImageArray {
        ImageArray {
            images: Rc::from(images),
        }
    }

    /// The image at `index`; indexing past the end is a programmer error
    /// and panics.
    pub fn image(&self, index: usize) -> &Image {
        &self.images[index]
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
