//! Point cloud messages.
//!
//! Wire format (both kinds):
//! ```text
//! ┌────────┬──────┬──────────┬───────┬──────────┬──────────────────┬──────────────────┐
//! │ Header │ Time │ Frame id │ Count │ Zero pad │ Points           │ Colors (rgb only)│
//! │ (4B)   │ (8B) │ (8B)     │ (8B)  │ → 512B   │ (count × 3 × f32)│ (count × 3 × f32)│
//! └────────┴──────┴──────────┴───────┴──────────┴──────────────────┴──────────────────┘
//! ```

use crate::array::PodArray;
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::header::MessageKind;
use crate::message::Message;
use crate::wire::{WireReader, WireWriter};

/// Size of the fixed region before the elements.
pub const POINT_CLOUD_HEADER_SIZE: usize = 512;

/// `[x, y, z]` in meters.
pub type Point = [f32; 3];

/// `[r, g, b]`, one float per channel.
pub type Color = [f32; 3];

pub const POINT_SIZE: usize = std::mem::size_of::<Point>();

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PointCloud {
    pub time: u64,
    pub frame_id: u64,
    pub points: PodArray<Point>,
}

impl PointCloud {
    pub fn new(time: u64, frame_id: u64, points: impl Into<PodArray<Point>>) -> Self {
        Self {
            time,
            frame_id,
            points: points.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Message for PointCloud {
    const KIND: MessageKind = MessageKind::PointCloud;

    fn required_size(&self) -> usize {
        POINT_CLOUD_HEADER_SIZE + self.points.as_bytes().len()
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.array_header(self.time, self.frame_id, self.points.len(), POINT_CLOUD_HEADER_SIZE);
        w.pod_array(&self.points);
    }

    fn read_body(r: &mut WireReader, config: &CodecConfig) -> Result<Self> {
        let (time, frame_id, count) = r.array_header("points", POINT_CLOUD_HEADER_SIZE, config)?;
        Ok(Self {
            time,
            frame_id,
            points: r.pod_array(count)?,
        })
    }
}

/// Points with a parallel array of per-point colors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PointCloudRgb {
    pub time: u64,
    pub frame_id: u64,
    pub points: PodArray<Point>,
    pub colors: PodArray<Color>,
}

impl PointCloudRgb {
    /// Pair points with colors; the arrays must be the same length.
    pub fn new(
        time: u64,
        frame_id: u64,
        points: impl Into<PodArray<Point>>,
        colors: impl Into<PodArray<Color>>,
    ) -> Result<Self> {
        let cloud = Self {
            time,
            frame_id,
            points: points.into(),
            colors: colors.into(),
        };
        cloud.validate()?;
        Ok(cloud)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Point, Color)> + '_ {
        self.points.iter().zip(self.colors.iter())
    }
}

impl Message for PointCloudRgb {
    const KIND: MessageKind = MessageKind::PointCloudRgb;

    fn required_size(&self) -> usize {
        POINT_CLOUD_HEADER_SIZE + self.points.as_bytes().len() + self.colors.as_bytes().len()
    }

    fn validate(&self) -> Result<()> {
        if self.points.len() != self.colors.len() {
            return Err(CodecError::LengthMismatch {
                points: self.points.len(),
                colors: self.colors.len(),
            });
        }
        Ok(())
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.array_header(self.time, self.frame_id, self.points.len(), POINT_CLOUD_HEADER_SIZE);
        w.pod_array(&self.points);
        w.pod_array(&self.colors);
    }

    fn read_body(r: &mut WireReader, config: &CodecConfig) -> Result<Self> {
        let (time, frame_id, count) = r.array_header("points", POINT_CLOUD_HEADER_SIZE, config)?;
        r.ensure(count.saturating_mul(2 * POINT_SIZE))?;
        Ok(Self {
            time,
            frame_id,
            points: r.pod_array(count)?,
            colors: r.pod_array(count)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn empty_cloud_is_just_the_header_region() {
        let cloud = PointCloud::new(7, 8, Vec::<Point>::new());
        let wire = cloud.to_bytes().unwrap();
        assert_eq!(wire.len(), POINT_CLOUD_HEADER_SIZE);
        assert_eq!(&wire[20..28], &0u64.to_le_bytes());
        assert!(wire[28..].iter().all(|b| *b == 0));
        let decoded = PointCloud::from_bytes(&wire).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded, cloud);
    }

    #[test]
    fn points_follow_the_header_region() {
        let cloud = PointCloud::new(1, 2, vec![[1.0f32, 2.0, 3.0], [-1.0, -2.0, -3.0]]);
        let wire = cloud.to_bytes().unwrap();
        assert_eq!(wire.len(), 512 + 24);
        assert_eq!(&wire[20..28], &2u64.to_le_bytes());
        assert_eq!(&wire[512..516], &1.0f32.to_le_bytes());
        assert_eq!(&wire[532..536], &(-3.0f32).to_le_bytes());

        let decoded = PointCloud::from_bytes(&wire).unwrap();
        assert_eq!(decoded.points.get(1), Some([-1.0, -2.0, -3.0]));
    }

    #[test]
    fn decoded_points_alias_the_buffer() {
        let cloud = PointCloud::new(0, 0, vec![[0.5f32; 3]; 4]);
        let wire = cloud.to_bytes().unwrap();
        let decoded = PointCloud::from_bytes(&wire).unwrap();
        assert_eq!(decoded.points.as_bytes().as_ptr(), wire[512..].as_ptr());
    }

    #[test]
    fn rgb_colors_follow_points() {
        let cloud = PointCloudRgb::new(
            3,
            4,
            vec![[1.0f32, 1.0, 1.0], [2.0, 2.0, 2.0]],
            vec![[0.1f32, 0.2, 0.3], [0.4, 0.5, 0.6]],
        )
        .unwrap();
        let wire = cloud.to_bytes().unwrap();
        assert_eq!(wire.len(), 512 + 2 * 2 * 12);
        assert_eq!(&wire[536..540], &0.1f32.to_le_bytes());
        let decoded = PointCloudRgb::from_bytes(&wire).unwrap();
        assert_eq!(decoded, cloud);
        let pairs: Vec<_> = decoded.iter().collect();
        assert_eq!(pairs[1], ([2.0, 2.0, 2.0], [0.4, 0.5, 0.6]));
    }

    #[test]
    fn mismatched_rgb_writes_nothing() {
        let cloud = PointCloudRgb {
            time: 0,
            frame_id: 0,
            points: vec![[0.0f32; 3]; 3].into(),
            colors: vec![[0.0f32; 3]; 2].into(),
        };
        let mut buf = vec![0xEEu8; 1024];
        let err = cloud.encode(&mut buf, 0).unwrap_err();
        assert_eq!(err, CodecError::LengthMismatch { points: 3, colors: 2 });
        assert!(buf.iter().all(|b| *b == 0xEE));
    }

    #[test]
    fn count_above_bound_is_rejected_before_reading_points() {
        let mut wire = PointCloud::new(0, 0, Vec::<Point>::new()).to_bytes().unwrap().to_vec();
        wire[20..28].copy_from_slice(&(100_000_001u64).to_le_bytes());
        let err = PointCloud::from_bytes(&Bytes::from(wire)).unwrap_err();
        assert!(matches!(err, CodecError::SizeSanity { field: "points", .. }));
    }

    #[test]
    fn count_beyond_buffer_is_truncated() {
        let mut wire = PointCloud::new(0, 0, vec![[1.0f32; 3]]).to_bytes().unwrap().to_vec();
        wire[20..28].copy_from_slice(&2u64.to_le_bytes());
        let err = PointCloud::from_bytes(&Bytes::from(wire)).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                needed: 512 + 24,
                available: 512 + 12
            }
        );
    }
}
