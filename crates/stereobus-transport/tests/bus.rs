use std::path::PathBuf;
use std::time::{Duration, Instant};

use stereobus_msgs::{
    AnyMessage, CodecConfig, Image, MessageKind, PixelType, PointCloudSoup, QaFindings, Finding,
    Severity,
};
use stereobus_transport::{topic, Publisher, Subscriber, IMAGE_TOPICS};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sb-bus-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn wait_for_subscriber(publisher: &Publisher) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while publisher.subscriber_count() == 0 {
        assert!(Instant::now() < deadline, "subscriber never connected");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn soup(frame_id: u64) -> PointCloudSoup {
    let rectified = Image::new(1, frame_id, 4, 4, PixelType::BGR8, vec![90u8; 48]).unwrap();
    let disparity = Image::new(1, frame_id, 4, 4, PixelType::DISPARITY16, vec![3u8; 32]).unwrap();
    PointCloudSoup {
        time: 1,
        frame_id,
        baseline: 0.3,
        focal_length: 1400.0,
        rectified,
        disparity,
        ..PointCloudSoup::default()
    }
}

#[test]
fn topics_share_one_directory_without_crosstalk() {
    let dir = scratch_dir("crosstalk");
    let soups = Publisher::bind(topic::SOUP, &dir).unwrap();
    let qa = Publisher::bind(topic::QA_FINDINGS, &dir).unwrap();
    let soup_sub = Subscriber::connect(topic::SOUP, &dir).unwrap();
    let qa_sub = Subscriber::connect(topic::QA_FINDINGS, &dir).unwrap();
    wait_for_subscriber(&soups);
    wait_for_subscriber(&qa);

    soups.publish(&soup(7)).unwrap();
    qa.publish(&QaFindings::new(
        1,
        7,
        vec![Finding::new("sync", "skew", Severity::Warning, "late right frame")],
    ))
    .unwrap();

    let config = CodecConfig::default();
    let payload = soup_sub.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
    let message = AnyMessage::from_bytes(&payload, &config).unwrap();
    assert_eq!(message.kind(), MessageKind::PointCloudSoup);
    assert_eq!(Some(message.kind()), topic::SOUP.kind);
    assert_eq!(message.frame_id(), Some(7));

    let findings: QaFindings = qa_sub.recv_message().unwrap();
    assert_eq!(findings.worst(), Some(Severity::Warning));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn slow_consumer_only_sees_the_newest_soup() {
    let dir = scratch_dir("slow");
    let publisher = Publisher::bind(topic::SOUP, &dir).unwrap();
    let subscriber = Subscriber::connect(topic::SOUP, &dir).unwrap();
    wait_for_subscriber(&publisher);

    for frame_id in 0..20 {
        publisher.publish(&soup(frame_id)).unwrap();
    }
    assert!(publisher.flush(Duration::from_secs(5)));

    // whatever got through, the last one published always arrives last
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut newest = None;
    while newest != Some(19) {
        assert!(Instant::now() < deadline, "newest soup never arrived");
        if let Some(payload) = subscriber.recv_timeout(Duration::from_millis(100)).unwrap() {
            let (decoded, _) = AnyMessage::decode(&payload, 0, &CodecConfig::default()).unwrap();
            newest = decoded.frame_id();
        }
    }
    assert_eq!(
        publisher.sent() + publisher.replaced(),
        20,
        "every publish is either sent or replaced"
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn every_image_topic_can_be_bound_at_once() {
    let dir = scratch_dir("images");
    let publishers: Vec<_> = IMAGE_TOPICS
        .iter()
        .map(|topic| Publisher::bind(*topic, &dir).unwrap())
        .collect();
    for publisher in &publishers {
        assert!(publisher.path().exists());
    }
    drop(publishers);
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    let _ = std::fs::remove_dir_all(&dir);
}
