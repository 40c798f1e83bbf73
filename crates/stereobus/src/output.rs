use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use stereobus_msgs::{AnyMessage, Header};
use stereobus_transport::Topic;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// What a decoded message looks like at a glance.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub kind: &'static str,
    pub type_id: u16,
    pub version: String,
    pub size: usize,
    pub time: Option<u64>,
    pub frame_id: Option<u64>,
    pub detail: String,
}

impl MessageSummary {
    pub fn new(header: Header, message: &AnyMessage, size: usize) -> Self {
        Self {
            kind: message.kind().name(),
            type_id: header.type_id,
            version: format!("{}.{}", header.major, header.minor),
            size,
            time: message.time(),
            frame_id: message.frame_id(),
            detail: detail(message),
        }
    }
}

fn detail(message: &AnyMessage) -> String {
    match message {
        AnyMessage::Image(m) => format!(
            "{}x{} {} conv={} ext={}B",
            m.rows,
            m.cols,
            m.pixel_type,
            m.color_conversion,
            m.extension.len()
        ),
        AnyMessage::PointCloudSoup(m) => format!(
            "baseline={:.3}m focal={:.1}px rectified={}x{} {} disparity={}",
            m.baseline,
            m.focal_length,
            m.rectified.rows,
            m.rectified.cols,
            m.rectified.pixel_type,
            m.disparity.pixel_type
        ),
        AnyMessage::CameraParameterRequest(m) => format!("value={}", m.value),
        AnyMessage::CameraParameterResponse(m) => format!("success={}", m.success),
        AnyMessage::PointCloud(m) => format!("{} points", m.len()),
        AnyMessage::PointCloudRgb(m) => format!("{} colored points", m.len()),
        AnyMessage::SetBoolRequest(m) => format!("value={}", m.value),
        AnyMessage::SetBoolResponse(m) => format!("success={}", m.success),
        AnyMessage::ObstacleData(m) => format!("{} obstacles", m.obstacles.len()),
        AnyMessage::QaFindings(m) => match m.worst() {
            Some(worst) => format!("{} findings, worst={worst}", m.findings.len()),
            None => "no findings".to_string(),
        },
        AnyMessage::Navigation(m) => format!(
            "gps fix={} sats={} lat={:.6} lon={:.6}",
            m.gps.fix_type, m.gps.num_satellites, m.gps.latitude_deg, m.gps.longitude_deg
        ),
        AnyMessage::Velocity(m) => format!(
            "velocity=({:.3}, {:.3}, {:.3}) m/s",
            m.velocity[0], m.velocity[1], m.velocity[2]
        ),
    }
}

/// A summary plus where it came from.
#[derive(Debug, Serialize)]
pub struct Record<'a> {
    pub source: &'a str,
    pub offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
    #[serde(flatten)]
    pub summary: MessageSummary,
}

impl<'a> Record<'a> {
    pub fn from_file(source: &'a str, offset: usize, summary: MessageSummary) -> Self {
        Self {
            source,
            offset,
            received_at: None,
            summary,
        }
    }

    pub fn received(source: &'a str, summary: MessageSummary) -> Self {
        Self {
            source,
            offset: 0,
            received_at: Some(now_unix_millis()),
            summary,
        }
    }
}

/// Print summaries; raw output writes `payload` instead.
pub fn print_records(records: &[Record<'_>], payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "SOURCE", "OFFSET", "KIND", "VER", "SIZE", "TIME", "FRAME", "DETAIL",
                ]);
            for record in records {
                let s = &record.summary;
                table.add_row(vec![
                    record.source.to_string(),
                    record.offset.to_string(),
                    s.kind.to_string(),
                    s.version.clone(),
                    s.size.to_string(),
                    optional(s.time),
                    optional(s.frame_id),
                    s.detail.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                let s = &record.summary;
                println!(
                    "{}@{} {} v{} size={} time={} frame={} {}",
                    record.source,
                    record.offset,
                    s.kind,
                    s.version,
                    s.size,
                    optional(s.time),
                    optional(s.frame_id),
                    s.detail
                );
            }
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

#[derive(Serialize)]
struct TopicOutput<'a> {
    name: &'a str,
    port: u16,
    kind: Option<&'static str>,
    pattern: &'static str,
    socket: String,
}

pub fn print_topics(topics: &[Topic], dir: &std::path::Path, format: OutputFormat) {
    let rows: Vec<TopicOutput<'_>> = topics
        .iter()
        .map(|topic| TopicOutput {
            name: topic.name,
            port: topic.port,
            kind: topic.kind.map(|kind| kind.name()),
            pattern: topic.pattern.as_str(),
            socket: topic.socket_path(dir).display().to_string(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TOPIC", "PORT", "KIND", "PATTERN", "SOCKET"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.port.to_string(),
                    row.kind.unwrap_or("-").to_string(),
                    row.pattern.to_string(),
                    row.socket.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "{:<40} {:>5} {:<24} {}",
                    row.name,
                    row.port,
                    row.kind.unwrap_or("-"),
                    row.pattern
                );
            }
        }
        OutputFormat::Raw => {
            for row in &rows {
                println!("{}", row.name);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn optional(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use stereobus_msgs::{Image, Message, MessageKind, PixelType, QaFindings};

    use super::*;

    #[test]
    fn image_summary() {
        let image = Image::new(10, 11, 2, 3, PixelType::BGR8, vec![0u8; 18]).unwrap();
        let size = image.required_size();
        let summary = MessageSummary::new(Header::current(MessageKind::Image), &image.into(), size);
        assert_eq!(summary.kind, MessageKind::Image.name());
        assert_eq!(summary.version, "0.1");
        assert_eq!(summary.time, Some(10));
        assert_eq!(summary.frame_id, Some(11));
        assert_eq!(summary.detail, "2x3 u8C3 conv=unspecified ext=0B");
    }

    #[test]
    fn json_record_is_flat() {
        let qa: AnyMessage = QaFindings::new(1, 2, Vec::new()).into();
        let summary = MessageSummary::new(Header::current(MessageKind::QaFindings), &qa, 64);
        let record = Record::from_file("qa.bin", 0, summary);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["source"], "qa.bin");
        assert_eq!(value["type_id"], MessageKind::QaFindings.type_id());
        assert_eq!(value["detail"], "no findings");
        assert!(value.get("received_at").is_none());
    }
}
