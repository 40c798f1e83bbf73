use bytes::Bytes;
use stereobus_msgs::{
    AnyMessage, CodecConfig, CodecError, ElementKind, ErrorKind, Finding, Header, Image, Message,
    MessageKind, Navigation, PixelType, PointCloud, PointCloudRgb, QaFindings, Severity,
    VersionPolicy, IMAGE_HEADER_SIZE, POINT_CLOUD_HEADER_SIZE,
};

#[test]
fn vga_color_image_is_bit_exact() {
    let (rows, cols) = (480u32, 640u32);
    let pixels: Vec<u8> = (0..rows * cols * 3)
        .map(|i| (i.wrapping_mul(2654435761) >> 24) as u8)
        .collect();
    let image = Image::from_shape(
        1_234,
        77,
        &[rows as usize, cols as usize, 3],
        ElementKind::U8,
        pixels.clone(),
    )
    .unwrap();

    let mut buf = vec![0u8; image.required_size()];
    let end = image.encode(&mut buf, 0).unwrap();
    assert_eq!(end, IMAGE_HEADER_SIZE + 480 * 640 * 3);

    let buf = Bytes::from(buf);
    let (decoded, offset) = Image::decode(&buf, 0).unwrap();
    assert_eq!(offset, end);
    assert_eq!(decoded.shape(), [480, 640, 3]);
    assert_eq!(decoded.pixel_type, PixelType::BGR8);
    assert_eq!(&decoded.pixels[..], &pixels[..]);
}

#[test]
fn empty_point_cloud_is_exactly_the_header_region() {
    let cloud = PointCloud::new(1, 1, Vec::<[f32; 3]>::new());
    assert_eq!(cloud.required_size(), POINT_CLOUD_HEADER_SIZE);
    let decoded = PointCloud::from_bytes(&cloud.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.len(), 0);
}

#[test]
fn qa_findings_keep_producer_order() {
    let qa = QaFindings::new(
        10,
        11,
        vec![
            Finding::new("exposure", "saturation", Severity::Error, "left image saturated")
                .with_value(0.93, "ratio"),
            Finding::new("exposure", "mean", Severity::Info, "ok").with_value(117.0, "dn"),
        ],
    );
    let decoded = QaFindings::from_bytes(&qa.to_bytes().unwrap()).unwrap();
    let severities: Vec<Severity> = decoded.findings.iter().map(|f| f.severity).collect();
    assert_eq!(severities, vec![Severity::Error, Severity::Info]);
    assert_eq!(decoded.findings[0].unit, "ratio");
}

#[test]
fn default_navigation_roundtrips() {
    let nav = Navigation::default();
    let decoded = Navigation::from_bytes(&nav.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, nav);
}

#[test]
fn header_gate_rejects_other_kinds_and_versions() {
    let wire = PointCloud::default().to_bytes().unwrap();
    let err = Image::from_bytes(&wire).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleHeader);

    let mut bumped = wire.to_vec();
    bumped[3] += 1;
    let bumped = Bytes::from(bumped);
    let err = PointCloud::from_bytes(&bumped).unwrap_err();
    assert_eq!(
        err,
        CodecError::IncompatibleHeader {
            expected: Header::current(MessageKind::PointCloud),
            found: Header::new(MessageKind::PointCloud.type_id(), 0, 2),
        }
    );

    let relaxed = CodecConfig {
        version_policy: VersionPolicy::SameMajor,
        ..CodecConfig::default()
    };
    assert!(PointCloud::decode_with(&bumped, 0, &relaxed).is_ok());
}

#[test]
fn oversized_image_header_is_rejected_before_reading_pixels() {
    let mut raw = Image::default().to_bytes().unwrap().to_vec();
    raw[20..24].copy_from_slice(&20_000u32.to_le_bytes());
    raw[24..28].copy_from_slice(&20_000u32.to_le_bytes());
    // the buffer holds no pixels at all, so anything but a sanity error means
    // the decoder looked past the header
    let err = Image::from_bytes(&Bytes::from(raw)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeSanityViolation);
    assert!(err.is_recoverable());
}

#[test]
fn image_sanity_bound_is_configurable() {
    let image = Image::new(0, 0, 10, 10, PixelType::MONO8, vec![0u8; 100]).unwrap();
    let wire = image.to_bytes().unwrap();
    let strict = CodecConfig {
        max_image_pixels: 99,
        ..CodecConfig::default()
    };
    assert!(matches!(
        Image::decode_with(&wire, 0, &strict),
        Err(CodecError::SizeSanity { declared: 100, max: 99, .. })
    ));
}

#[test]
fn every_truncation_of_every_kind_is_detected() {
    let config = CodecConfig::default();
    let samples: Vec<AnyMessage> = vec![
        Image::new(1, 2, 3, 3, PixelType::MONO16, vec![9u8; 18])
            .unwrap()
            .with_extension(vec![1u8, 2, 3])
            .into(),
        PointCloudRgb::new(0, 0, vec![[1.0f32; 3]; 2], vec![[0.5f32; 3]; 2])
            .unwrap()
            .into(),
        QaFindings::new(0, 0, vec![Finding::default()]).into(),
        Navigation::default().into(),
    ];
    for message in samples {
        let wire = message.to_bytes().unwrap();
        for len in 0..wire.len() {
            let err = AnyMessage::decode(&wire.slice(..len), 0, &config).unwrap_err();
            assert_eq!(
                err.kind(),
                ErrorKind::TruncatedBuffer,
                "{} truncated to {len} bytes",
                message.kind()
            );
        }
    }
}

#[test]
fn pixel_table_covers_the_whole_domain() {
    for element in ElementKind::ALL {
        for channels in 0..=4u32 {
            match PixelType::new(channels, element) {
                Ok(pixel) => {
                    assert!(channels == 1 || channels == 3);
                    assert_eq!(PixelType::from_tag(pixel.tag()).unwrap(), pixel);
                }
                Err(err) => {
                    assert!(channels != 1 && channels != 3);
                    assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
                }
            }
        }
    }
}

#[test]
fn mismatched_parallel_arrays_leave_the_buffer_untouched() {
    let cloud = PointCloudRgb {
        points: vec![[0.0f32; 3]; 5].into(),
        colors: vec![[1.0f32; 3]; 4].into(),
        ..PointCloudRgb::default()
    };
    let mut buf = vec![0xA5u8; 2048];
    let err = cloud.encode(&mut buf, 16).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
    assert!(!err.is_recoverable());
    assert!(buf.iter().all(|b| *b == 0xA5));
}

#[test]
fn encode_into_a_short_buffer_fails_cleanly() {
    let nav = Navigation::default();
    let mut buf = vec![0u8; nav.required_size() - 1];
    assert_eq!(
        nav.encode(&mut buf, 0).unwrap_err(),
        CodecError::BufferTooSmall {
            needed: 212,
            available: 211
        }
    );
    assert!(buf.iter().all(|b| *b == 0));
}

#[test]
fn decoded_arrays_outlive_the_caller_handle() {
    let cloud = PointCloud::new(0, 0, vec![[3.0f32, 2.0, 1.0]; 8]);
    let decoded = {
        let wire = cloud.to_bytes().unwrap();
        PointCloud::from_bytes(&wire).unwrap()
    };
    // the shared buffer is kept alive by the decoded view
    assert_eq!(decoded.points.to_vec(), vec![[3.0, 2.0, 1.0]; 8]);
    let owned = decoded.points.into_owned();
    assert_eq!(owned.len(), 8);
}
