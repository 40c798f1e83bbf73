//! Point-cloud soup: everything a consumer needs to reproject a disparity map
//! into 3D, in one message.
//!
//! Wire format:
//! ```text
//! ┌────────┬──────┬──────────┬──────────┬───────┬────────────┬───────────┬───────────┬───────────┬───────────┐
//! │ Header │ Time │ Frame id │ Baseline │ Focal │ Projection │ R disp→raw│ R world→  │ Rectified │ Disparity │
//! │ (4B)   │ (8B) │ (8B)     │ (f64)    │ (f64) │ (16 × f32) │ (9 × f32) │ raw (9×f32│ Image     │ Image     │
//! └────────┴──────┴──────────┴──────────┴───────┴────────────┴───────────┴───────────┴───────────┴───────────┘
//! ```

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::header::MessageKind;
use crate::image::Image;
use crate::message::Message;
use crate::telemetry::IDENTITY_3X3;
use crate::wire::{WireReader, WireWriter};

/// Size of everything before the embedded images.
pub const SOUP_FIXED_SIZE: usize = 172;

#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudSoup {
    pub time: u64,
    pub frame_id: u64,
    /// Stereo baseline in meters.
    pub baseline: f64,
    /// Focal length in pixels.
    pub focal_length: f64,
    /// Row-major 4×4 disparity-to-depth projection.
    pub projection: [f32; 16],
    /// Row-major rotation from the disparity frame to the raw camera frame.
    pub rotation_disparity_to_raw_camera: [f32; 9],
    /// Row-major rotation from the world frame to the raw camera frame.
    pub rotation_world_to_raw_camera: [f32; 9],
    pub rectified: Image,
    pub disparity: Image,
}

impl PointCloudSoup {
    /// Either embedded image has no pixels.
    pub fn is_empty(&self) -> bool {
        self.rectified.is_empty() || self.disparity.is_empty()
    }

    /// Detach both embedded images from the receive buffer.
    pub fn into_owned(mut self) -> Self {
        self.rectified = self.rectified.into_owned();
        self.disparity = self.disparity.into_owned();
        self
    }
}

impl Default for PointCloudSoup {
    fn default() -> Self {
        Self {
            time: 0,
            frame_id: 0,
            baseline: 0.0,
            focal_length: 0.0,
            projection: [0.0; 16],
            rotation_disparity_to_raw_camera: IDENTITY_3X3,
            rotation_world_to_raw_camera: IDENTITY_3X3,
            rectified: Image::default(),
            disparity: Image::default(),
        }
    }
}

impl Message for PointCloudSoup {
    const KIND: MessageKind = MessageKind::PointCloudSoup;

    fn required_size(&self) -> usize {
        SOUP_FIXED_SIZE + self.rectified.required_size() + self.disparity.required_size()
    }

    fn validate(&self) -> Result<()> {
        self.rectified.validate()?;
        self.disparity.validate()?;
        let rectified = (self.rectified.rows, self.rectified.cols);
        let disparity = (self.disparity.rows, self.disparity.cols);
        if rectified != disparity {
            return Err(CodecError::DimensionMismatch {
                rectified,
                disparity,
            });
        }
        Ok(())
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.u64(self.time);
        w.u64(self.frame_id);
        w.f64(self.baseline);
        w.f64(self.focal_length);
        w.f32_slice(&self.projection);
        w.f32_slice(&self.rotation_disparity_to_raw_camera);
        w.f32_slice(&self.rotation_world_to_raw_camera);
        w.message(&self.rectified);
        w.message(&self.disparity);
    }

    fn read_body(r: &mut WireReader, config: &CodecConfig) -> Result<Self> {
        r.ensure(SOUP_FIXED_SIZE - r.position())?;
        Ok(Self {
            time: r.u64()?,
            frame_id: r.u64()?,
            baseline: r.f64()?,
            focal_length: r.f64()?,
            projection: r.f32_array()?,
            rotation_disparity_to_raw_camera: r.f32_array()?,
            rotation_world_to_raw_camera: r.f32_array()?,
            rectified: r.message(config)?,
            disparity: r.message(config)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::header::Header;
    use crate::image::{ColorConversion, IMAGE_HEADER_SIZE};
    use crate::pixel::PixelType;

    fn soup(rows: u32, cols: u32) -> PointCloudSoup {
        let n = (rows * cols) as usize;
        let rectified = Image::new(5, 6, rows, cols, PixelType::BGR8, vec![200u8; n * 3])
            .unwrap()
            .with_color_conversion(ColorConversion::BGR2BGR);
        let disparity = Image::new(5, 6, rows, cols, PixelType::DISPARITY16, vec![1u8; n * 2])
            .unwrap()
            .with_color_conversion(ColorConversion::INCONVERTIBLE);
        let mut projection = [0.0f32; 16];
        projection[0] = 1.0;
        projection[11] = 700.0;
        PointCloudSoup {
            time: 5,
            frame_id: 6,
            baseline: 0.12,
            focal_length: 700.0,
            projection,
            rectified,
            disparity,
            ..PointCloudSoup::default()
        }
    }

    #[test]
    fn size_is_fixed_part_plus_children() {
        let s = soup(4, 6);
        let rectified = IMAGE_HEADER_SIZE + 4 * 6 * 3;
        let disparity = IMAGE_HEADER_SIZE + 4 * 6 * 2;
        assert_eq!(s.required_size(), SOUP_FIXED_SIZE + rectified + disparity);
        assert_eq!(s.to_bytes().unwrap().len(), s.required_size());
    }

    #[test]
    fn children_follow_the_fixed_part() {
        let s = soup(2, 2);
        let wire = s.to_bytes().unwrap();
        assert_eq!(&wire[20..28], &0.12f64.to_le_bytes());
        assert_eq!(&wire[100..104], &1.0f32.to_le_bytes());
        assert_eq!(&wire[136..140], &1.0f32.to_le_bytes());
        assert_eq!(
            &wire[SOUP_FIXED_SIZE..SOUP_FIXED_SIZE + 4],
            &Header::current(MessageKind::Image).encode()
        );
        let second = SOUP_FIXED_SIZE + s.rectified.required_size();
        assert_eq!(&wire[second + 28..second + 32], &3u32.to_le_bytes());

        let decoded = PointCloudSoup::from_bytes(&wire).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn mismatched_images_are_rejected() {
        let mut s = soup(2, 2);
        s.disparity = Image::new(0, 0, 2, 3, PixelType::DISPARITY16, vec![0u8; 12]).unwrap();
        let err = s.to_bytes().unwrap_err();
        assert_eq!(
            err,
            CodecError::DimensionMismatch {
                rectified: (2, 2),
                disparity: (2, 3)
            }
        );
    }

    #[test]
    fn broken_child_fails_the_whole_message() {
        let s = soup(2, 2);
        let mut wire = s.to_bytes().unwrap().to_vec();
        // corrupt the disparity image's type id
        let second = SOUP_FIXED_SIZE + s.rectified.required_size();
        wire[second] = 0x7F;
        let err = PointCloudSoup::from_bytes(&Bytes::from(wire)).unwrap_err();
        assert!(matches!(err, CodecError::IncompatibleHeader { .. }));
    }

    #[test]
    fn truncated_child() {
        let wire = soup(3, 3).to_bytes().unwrap();
        let short = wire.slice(..wire.len() - 1);
        assert!(matches!(
            PointCloudSoup::from_bytes(&short),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn default_soup_is_empty_but_encodable() {
        let s = PointCloudSoup::default();
        assert!(s.is_empty());
        let wire = s.to_bytes().unwrap();
        assert_eq!(wire.len(), SOUP_FIXED_SIZE + 2 * IMAGE_HEADER_SIZE);
        assert_eq!(PointCloudSoup::from_bytes(&wire).unwrap(), s);
    }
}
