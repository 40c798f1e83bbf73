//! Stamped image message.
//!
//! Wire format:
//! ```text
//! ┌────────┬──────┬──────────┬──────┬──────┬─────┬───────┬─────┬─────────┬──────┬─────────┬───────────┐
//! │ Header │ Time │ Frame id │ Rows │ Cols │ Tag │ Color │ Pad │ Ext len │ Pad  │ Pixels  │ Extension │
//! │ (4B)   │ (8B) │ (8B)     │ (4B) │ (4B) │ (4B)│ (1B)  │ (1B)│ (2B)    │ →64B │         │           │
//! └────────┴──────┴──────────┴──────┴──────┴─────┴───────┴─────┴─────────┴──────┴─────────┴───────────┘
//! ```

use std::fmt;

use bytes::Bytes;
use tracing::debug;

use crate::config::{CodecConfig, DEFAULT_MAX_IMAGE_PIXELS};
use crate::error::{CodecError, Result};
use crate::header::MessageKind;
use crate::message::Message;
use crate::pixel::{Element, ElementKind, PixelType};
use crate::wire::{WireReader, WireWriter};

/// Size of the fixed region before the pixel bytes.
pub const IMAGE_HEADER_SIZE: usize = 64;

/// Producer-supplied code describing how to convert the pixels to BGR.
///
/// Values other than the named constants are OpenCV color-conversion codes
/// and pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorConversion(pub u8);

impl ColorConversion {
    /// Pixels are already BGR.
    pub const BGR2BGR: ColorConversion = ColorConversion(253);
    /// The pixels are not a color image (e.g. disparity).
    pub const INCONVERTIBLE: ColorConversion = ColorConversion(254);
    pub const UNSPECIFIED: ColorConversion = ColorConversion(255);
}

impl Default for ColorConversion {
    fn default() -> Self {
        Self::UNSPECIFIED
    }
}

impl fmt::Display for ColorConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BGR2BGR => f.write_str("bgr2bgr"),
            Self::INCONVERTIBLE => f.write_str("inconvertible"),
            Self::UNSPECIFIED => f.write_str("unspecified"),
            ColorConversion(code) => write!(f, "cv-code {code}"),
        }
    }
}

/// A timestamped image with optional trailing extension bytes.
///
/// `pixels` holds `rows * cols * pixel_type.bytes_per_pixel()` bytes in
/// row-major, channel-interleaved order. A decoded image aliases the receive
/// buffer for both `pixels` and `extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub time: u64,
    pub frame_id: u64,
    pub rows: u32,
    pub cols: u32,
    pub pixel_type: PixelType,
    pub color_conversion: ColorConversion,
    pub pixels: Bytes,
    pub extension: Bytes,
}

impl Image {
    /// Build an image, checking the pixel buffer against the geometry.
    pub fn new(
        time: u64,
        frame_id: u64,
        rows: u32,
        cols: u32,
        pixel_type: PixelType,
        pixels: impl Into<Bytes>,
    ) -> Result<Self> {
        let image = Self {
            time,
            frame_id,
            rows,
            cols,
            pixel_type,
            color_conversion: ColorConversion::default(),
            pixels: pixels.into(),
            extension: Bytes::new(),
        };
        image.check_pixels()?;
        Ok(image)
    }

    /// Build an image from an array shape: `[rows, cols]` for single-channel
    /// or `[rows, cols, channels]`.
    pub fn from_shape(
        time: u64,
        frame_id: u64,
        shape: &[usize],
        element: ElementKind,
        pixels: impl Into<Bytes>,
    ) -> Result<Self> {
        let (rows, cols, channels) = match *shape {
            [rows, cols] => (rows, cols, 1),
            [rows, cols, channels] => (rows, cols, channels),
            _ => return Err(CodecError::InvalidShape(shape.len())),
        };
        let channels = u32::try_from(channels).unwrap_or(u32::MAX);
        let pixel_type = PixelType::new(channels, element)?;
        let pixels = pixels.into();
        let oversized = || CodecError::PixelLength {
            expected: usize::MAX,
            actual: pixels.len(),
        };
        let rows = u32::try_from(rows).map_err(|_| oversized())?;
        let cols = u32::try_from(cols).map_err(|_| oversized())?;
        Self::new(time, frame_id, rows, cols, pixel_type, pixels)
    }

    /// Build a single- or three-channel image from typed elements.
    pub fn from_elements<T: Element>(
        time: u64,
        frame_id: u64,
        rows: u32,
        cols: u32,
        channels: u32,
        elements: &[T],
    ) -> Result<Self> {
        let pixel_type = PixelType::new(channels, T::KIND)?;
        let pixels = Bytes::copy_from_slice(bytemuck::cast_slice(elements));
        Self::new(time, frame_id, rows, cols, pixel_type, pixels)
    }

    pub fn with_color_conversion(mut self, code: ColorConversion) -> Self {
        self.color_conversion = code;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<Bytes>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// `[rows, cols, channels]`.
    pub fn shape(&self) -> [usize; 3] {
        [
            self.rows as usize,
            self.cols as usize,
            self.pixel_type.channels() as usize,
        ]
    }

    /// Pixel bytes implied by the geometry, or `None` on overflow.
    pub fn expected_pixel_len(&self) -> Option<usize> {
        (self.rows as usize)
            .checked_mul(self.cols as usize)?
            .checked_mul(self.pixel_type.bytes_per_pixel())
    }

    /// Borrow the pixels as `T` when `T` matches the element kind and the
    /// buffer is aligned for it.
    pub fn pixels_as<T: Element>(&self) -> Option<&[T]> {
        if T::KIND != self.pixel_type.element() {
            return None;
        }
        bytemuck::try_cast_slice(&self.pixels).ok()
    }

    /// Copy the pixels out as `T` when `T` matches the element kind.
    pub fn pixels_to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if T::KIND != self.pixel_type.element() {
            return None;
        }
        Some(
            self.pixels
                .chunks_exact(std::mem::size_of::<T>())
                .map(bytemuck::pod_read_unaligned)
                .collect(),
        )
    }

    /// Copy pixels and extension so the image no longer aliases a receive buffer.
    pub fn into_owned(mut self) -> Self {
        self.pixels = Bytes::copy_from_slice(&self.pixels);
        self.extension = Bytes::copy_from_slice(&self.extension);
        self
    }

    fn check_pixels(&self) -> Result<()> {
        let expected = self.expected_pixel_len().unwrap_or(usize::MAX);
        if self.pixels.len() != expected {
            return Err(CodecError::PixelLength {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }
}

impl Default for Image {
    fn default() -> Self {
        Self {
            time: 0,
            frame_id: 0,
            rows: 0,
            cols: 0,
            pixel_type: PixelType::MONO8,
            color_conversion: ColorConversion::default(),
            pixels: Bytes::new(),
            extension: Bytes::new(),
        }
    }
}

impl Message for Image {
    const KIND: MessageKind = MessageKind::Image;

    fn required_size(&self) -> usize {
        IMAGE_HEADER_SIZE + self.pixels.len() + self.extension.len()
    }

    fn validate(&self) -> Result<()> {
        let declared = u64::from(self.rows) * u64::from(self.cols);
        if declared > DEFAULT_MAX_IMAGE_PIXELS {
            return Err(CodecError::SizeSanity {
                field: "rows*cols",
                declared,
                max: DEFAULT_MAX_IMAGE_PIXELS,
            });
        }
        self.check_pixels()?;
        if self.extension.len() > usize::from(u16::MAX) {
            return Err(CodecError::ExtensionTooLong(self.extension.len()));
        }
        Ok(())
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.u64(self.time);
        w.u64(self.frame_id);
        w.u32(self.rows);
        w.u32(self.cols);
        w.u32(self.pixel_type.tag());
        w.u8(self.color_conversion.0);
        w.zeros(1);
        // validate() bounds the length
        w.u16(self.extension.len() as u16);
        w.pad_to(IMAGE_HEADER_SIZE);
        w.bytes(&self.pixels);
        w.bytes(&self.extension);
    }

    fn read_body(r: &mut WireReader, config: &CodecConfig) -> Result<Self> {
        let time = r.u64()?;
        let frame_id = r.u64()?;
        let rows = r.u32()?;
        let cols = r.u32()?;
        let tag = r.u32()?;
        let color_conversion = ColorConversion(r.u8()?);
        r.skip(1)?;
        let extension_len = usize::from(r.u16()?);
        r.skip_to(IMAGE_HEADER_SIZE)?;

        let declared = u64::from(rows) * u64::from(cols);
        if declared > config.max_image_pixels {
            debug!(rows, cols, "rejecting image with implausible dimensions");
            return Err(CodecError::SizeSanity {
                field: "rows*cols",
                declared,
                max: config.max_image_pixels,
            });
        }

        let pixel_type = PixelType::from_tag(tag)?;
        let pixel_len = usize::try_from(declared)
            .ok()
            .and_then(|n| n.checked_mul(pixel_type.bytes_per_pixel()))
            .ok_or(CodecError::SizeSanity {
                field: "rows*cols",
                declared,
                max: config.max_image_pixels,
            })?;
        r.ensure(pixel_len.saturating_add(extension_len))?;

        Ok(Self {
            time,
            frame_id,
            rows,
            cols,
            pixel_type,
            color_conversion,
            pixels: r.bytes(pixel_len)?,
            extension: r.bytes(extension_len)?,
        })
    }
}
