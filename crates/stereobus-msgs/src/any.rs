//! Decode a message without knowing its kind in advance.

use bytes::Bytes;
use tracing::debug;

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::header::{peek_header, MessageKind};
use crate::image::Image;
use crate::message::Message;
use crate::obstacle::ObstacleData;
use crate::point_cloud::{PointCloud, PointCloudRgb};
use crate::qa::QaFindings;
use crate::soup::PointCloudSoup;
use crate::telemetry::{
    CameraParameterRequest, CameraParameterResponse, Navigation, SetBoolRequest, SetBoolResponse,
    Velocity,
};

/// Any message kind on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyMessage {
    Image(Image),
    PointCloudSoup(Box<PointCloudSoup>),
    CameraParameterRequest(CameraParameterRequest),
    CameraParameterResponse(CameraParameterResponse),
    PointCloud(PointCloud),
    PointCloudRgb(PointCloudRgb),
    SetBoolRequest(SetBoolRequest),
    SetBoolResponse(SetBoolResponse),
    ObstacleData(ObstacleData),
    QaFindings(QaFindings),
    Navigation(Box<Navigation>),
    Velocity(Velocity),
}

macro_rules! dispatch {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            AnyMessage::Image($m) => $body,
            AnyMessage::PointCloudSoup($m) => $body,
            AnyMessage::CameraParameterRequest($m) => $body,
            AnyMessage::CameraParameterResponse($m) => $body,
            AnyMessage::PointCloud($m) => $body,
            AnyMessage::PointCloudRgb($m) => $body,
            AnyMessage::SetBoolRequest($m) => $body,
            AnyMessage::SetBoolResponse($m) => $body,
            AnyMessage::ObstacleData($m) => $body,
            AnyMessage::QaFindings($m) => $body,
            AnyMessage::Navigation($m) => $body,
            AnyMessage::Velocity($m) => $body,
        }
    };
}

impl AnyMessage {
    /// Peek the header at `offset` and decode the matching kind.
    ///
    /// A type id with no registered kind is reported as `UnknownType`, which
    /// callers treat like any other incompatible header.
    pub fn decode(src: &Bytes, offset: usize, config: &CodecConfig) -> Result<(Self, usize)> {
        let header = peek_header(src, offset)?;
        let Some(kind) = header.kind() else {
            debug!(%header, "no message kind registered for type id");
            return Err(CodecError::UnknownType(header.type_id));
        };
        fn wrap<M: Message>(
            src: &Bytes,
            offset: usize,
            config: &CodecConfig,
            f: impl FnOnce(M) -> AnyMessage,
        ) -> Result<(AnyMessage, usize)> {
            M::decode_with(src, offset, config).map(|(m, end)| (f(m), end))
        }
        match kind {
            MessageKind::Image => wrap(src, offset, config, AnyMessage::Image),
            MessageKind::PointCloudSoup => {
                wrap(src, offset, config, |m| AnyMessage::PointCloudSoup(Box::new(m)))
            }
            MessageKind::CameraParameterRequest => {
                wrap(src, offset, config, AnyMessage::CameraParameterRequest)
            }
            MessageKind::CameraParameterResponse => {
                wrap(src, offset, config, AnyMessage::CameraParameterResponse)
            }
            MessageKind::PointCloud => wrap(src, offset, config, AnyMessage::PointCloud),
            MessageKind::PointCloudRgb => wrap(src, offset, config, AnyMessage::PointCloudRgb),
            MessageKind::SetBoolRequest => wrap(src, offset, config, AnyMessage::SetBoolRequest),
            MessageKind::SetBoolResponse => wrap(src, offset, config, AnyMessage::SetBoolResponse),
            MessageKind::ObstacleData => wrap(src, offset, config, AnyMessage::ObstacleData),
            MessageKind::QaFindings => wrap(src, offset, config, AnyMessage::QaFindings),
            MessageKind::Navigation => {
                wrap(src, offset, config, |m| AnyMessage::Navigation(Box::new(m)))
            }
            MessageKind::Velocity => wrap(src, offset, config, AnyMessage::Velocity),
        }
    }

    /// Decode a buffer holding exactly one message at offset 0.
    pub fn from_bytes(src: &Bytes, config: &CodecConfig) -> Result<Self> {
        Self::decode(src, 0, config).map(|(message, _)| message)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            AnyMessage::Image(_) => MessageKind::Image,
            AnyMessage::PointCloudSoup(_) => MessageKind::PointCloudSoup,
            AnyMessage::CameraParameterRequest(_) => MessageKind::CameraParameterRequest,
            AnyMessage::CameraParameterResponse(_) => MessageKind::CameraParameterResponse,
            AnyMessage::PointCloud(_) => MessageKind::PointCloud,
            AnyMessage::PointCloudRgb(_) => MessageKind::PointCloudRgb,
            AnyMessage::SetBoolRequest(_) => MessageKind::SetBoolRequest,
            AnyMessage::SetBoolResponse(_) => MessageKind::SetBoolResponse,
            AnyMessage::ObstacleData(_) => MessageKind::ObstacleData,
            AnyMessage::QaFindings(_) => MessageKind::QaFindings,
            AnyMessage::Navigation(_) => MessageKind::Navigation,
            AnyMessage::Velocity(_) => MessageKind::Velocity,
        }
    }

    pub fn required_size(&self) -> usize {
        dispatch!(self, m => m.required_size())
    }

    pub fn encode(&self, dst: &mut [u8], offset: usize) -> Result<usize> {
        dispatch!(self, m => m.encode(dst, offset))
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        dispatch!(self, m => m.to_bytes())
    }

    /// Acquisition time, for kinds that carry one.
    pub fn time(&self) -> Option<u64> {
        match self {
            AnyMessage::Image(m) => Some(m.time),
            AnyMessage::PointCloudSoup(m) => Some(m.time),
            AnyMessage::PointCloud(m) => Some(m.time),
            AnyMessage::PointCloudRgb(m) => Some(m.time),
            AnyMessage::ObstacleData(m) => Some(m.time),
            AnyMessage::QaFindings(m) => Some(m.time),
            AnyMessage::Navigation(m) => Some(m.timestamp_ns),
            AnyMessage::Velocity(m) => Some(m.time),
            AnyMessage::CameraParameterRequest(_)
            | AnyMessage::CameraParameterResponse(_)
            | AnyMessage::SetBoolRequest(_)
            | AnyMessage::SetBoolResponse(_) => None,
        }
    }

    /// Frame sequence number, for kinds that carry one.
    pub fn frame_id(&self) -> Option<u64> {
        match self {
            AnyMessage::Image(m) => Some(m.frame_id),
            AnyMessage::PointCloudSoup(m) => Some(m.frame_id),
            AnyMessage::PointCloud(m) => Some(m.frame_id),
            AnyMessage::PointCloudRgb(m) => Some(m.frame_id),
            AnyMessage::ObstacleData(m) => Some(m.frame_id),
            AnyMessage::QaFindings(m) => Some(m.frame_id),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for AnyMessage {
            fn from(message: $ty) -> Self {
                AnyMessage::$variant(message)
            }
        })*
    };
}

impl_from! {
    Image(Image),
    CameraParameterRequest(CameraParameterRequest),
    CameraParameterResponse(CameraParameterResponse),
    PointCloud(PointCloud),
    PointCloudRgb(PointCloudRgb),
    SetBoolRequest(SetBoolRequest),
    SetBoolResponse(SetBoolResponse),
    ObstacleData(ObstacleData),
    QaFindings(QaFindings),
    Velocity(Velocity),
}

impl From<PointCloudSoup> for AnyMessage {
    fn from(message: PointCloudSoup) -> Self {
        AnyMessage::PointCloudSoup(Box::new(message))
    }
}

impl From<Navigation> for AnyMessage {
    fn from(message: Navigation) -> Self {
        AnyMessage::Navigation(Box::new(message))
    }
}
